//! Beam search explorer
//!
//! Each iteration expands the best `beam_width` active nodes of the current
//! depth, asking for up to `beam_width` alternatives per node. Proposal
//! requests and the simulations that follow them run concurrently (bounded
//! by `max_concurrency`); their results are committed to the tree afterwards
//! in one pass, in frontier order, so node ids and tree state never depend
//! on completion order.
//!
//! Cancellation and the wall-clock budget abandon the in-flight iteration
//! before its commit pass. The tree then holds only fully committed
//! iterations.

use crate::config::{ExplorationConfig, ExplorerSettings, Goal};
use crate::error::{ConfigError, ExplorerError, ProposalError};
use crate::events::{EventSink, ExplorationEvent, NullSink};
use crate::proposal::{PathEntry, ProposalRequest, ProposalService};
use crate::types::{
    BaselineAnalysis, ExperimentContext, Exploration, ExplorationOutcome, ExplorationStatus,
    IterationResult, WinningPath,
};
use adopt_catalog::ActionCatalog;
use adopt_sim::{
    LatentTraits, MonteCarloEngine, ScenarioModifiers, ScorecardParams, SimulationAdapter,
    SimulationError, SimulationRun,
};
use adopt_tree::{
    prune, ActionMetadata, DominancePolicy, NodeId, NodeStatus, PruningOutcome, ScenarioTree,
    TreeError,
};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

/// Shared stop switch for a running exploration
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    /// Create an untriggered handle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Check if a stop was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolve once a stop is requested
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Input of one exploration run
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationRequest {
    /// Experiment passed through to the proposer
    pub experiment: ExperimentContext,
    /// Root design and optional known results
    pub baseline: BaselineAnalysis,
    /// Target
    pub goal: Goal,
    /// Budgets and simulation settings
    pub config: ExplorationConfig,
}

/// Budgeted beam search over scorecards
pub struct BeamSearchExplorer {
    proposer: Arc<dyn ProposalService>,
    catalog: Arc<ActionCatalog>,
    population: Arc<[LatentTraits]>,
    modifiers: ScenarioModifiers,
    engine: MonteCarloEngine,
    settings: ExplorerSettings,
    sink: Arc<dyn EventSink>,
    cancel: CancelHandle,
}

impl std::fmt::Debug for BeamSearchExplorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeamSearchExplorer")
            .field("catalog_version", &self.catalog.version())
            .field("population", &self.population.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Proposal accepted and simulated for one frontier node
struct Candidate {
    params: ScorecardParams,
    action: ActionMetadata,
    evaluation: Result<SimulationRun, EvaluationFailure>,
}

/// Result of expanding one frontier node
///
/// `outcome` is `Err` when the request itself failed; otherwise it holds one
/// entry per returned proposal, each accepted or rejected on its own.
struct Expansion {
    parent: NodeId,
    outcome: Result<Vec<Result<Candidate, ProposalError>>, ProposalError>,
}

#[derive(Debug)]
enum EvaluationFailure {
    Simulation(SimulationError),
    Aborted,
}

impl std::fmt::Display for EvaluationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulation(e) => write!(f, "{e}"),
            Self::Aborted => f.write_str("simulation task aborted"),
        }
    }
}

/// Bookkeeping for one iteration's commit pass
#[derive(Default)]
struct CommitTally {
    evaluated: Vec<NodeId>,
    expanded: usize,
    created: usize,
    rejected: usize,
    failed: usize,
}

impl BeamSearchExplorer {
    /// Create explorer with default settings and exploration modifiers
    #[must_use]
    pub fn new(
        proposer: Arc<dyn ProposalService>,
        catalog: Arc<ActionCatalog>,
        population: impl Into<Arc<[LatentTraits]>>,
    ) -> Self {
        Self {
            proposer,
            catalog,
            population: population.into(),
            modifiers: ScenarioModifiers::exploration_baseline(),
            engine: MonteCarloEngine::new(),
            settings: ExplorerSettings::default(),
            sink: Arc::new(NullSink),
            cancel: CancelHandle::new(),
        }
    }

    /// With runtime settings
    #[must_use]
    pub fn with_settings(mut self, settings: ExplorerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// With scenario modifiers replacing the exploration baseline
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: ScenarioModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// With Monte Carlo engine
    #[must_use]
    pub fn with_engine(mut self, engine: MonteCarloEngine) -> Self {
        self.engine = engine;
        self
    }

    /// With event sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// With an externally owned cancel handle
    #[must_use]
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops this explorer
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runtime settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ExplorerSettings {
        &self.settings
    }

    /// Run an exploration to a terminal status
    ///
    /// # Errors
    /// - `ExplorerError::Config` for invalid settings or an empty population
    /// - `ExplorerError::RootEvaluation` if the baseline cannot be simulated
    /// - `ExplorerError::Tree` if a tree invariant is violated
    ///
    /// Proposal and simulation failures of individual nodes are not errors.
    #[tracing::instrument(
        skip_all,
        fields(
            experiment = %request.experiment.experiment_id,
            beam_width = request.config.beam_width(),
            max_depth = request.config.max_depth(),
            max_llm_calls = request.config.max_llm_calls(),
        )
    )]
    pub async fn run(&self, request: ExplorationRequest) -> Result<ExplorationOutcome, ExplorerError> {
        self.settings.validate()?;
        if self.population.is_empty() {
            return Err(ConfigError::EmptyPopulation.into());
        }

        let started = Instant::now();
        let deadline = self.settings.wall_clock_budget().map(|b| started + b);
        let ExplorationRequest {
            experiment,
            baseline,
            goal,
            config,
        } = request;

        let adapter = SimulationAdapter::new(Arc::clone(&self.population), config.simulation_defaults())
            .with_modifiers(self.modifiers)
            .with_engine(self.engine);

        let mut exploration = Exploration::new(
            Uuid::new_v4(),
            experiment.experiment_id.clone(),
            baseline.id.clone(),
            goal,
            config,
        );
        let mut tree = ScenarioTree::new(exploration.id, baseline.scorecard);
        self.emit_status(&exploration);
        self.emit_created(&tree, NodeId::ROOT)?;

        let (root_results, root_secs) = match baseline.results {
            Some(results) => (results, 0.0),
            None => match evaluate(adapter.clone(), baseline.scorecard).await {
                Ok(run) => (run.results, run.execution_time_seconds),
                Err(EvaluationFailure::Simulation(e)) => return Err(ExplorerError::RootEvaluation(e)),
                Err(EvaluationFailure::Aborted) => return Err(ExplorerError::TaskAborted),
            },
        };
        tree.set_results(NodeId::ROOT, root_results, root_secs)?;
        self.sink.emit(ExplorationEvent::NodeEvaluated {
            exploration_id: exploration.id,
            node_id: NodeId::ROOT,
            results: root_results,
            execution_time_seconds: root_secs,
        });
        exploration.best_success_rate = root_results.success_rate();

        let mut iterations = Vec::new();
        let mut winner = None;

        if goal.is_satisfied_by(&root_results) {
            tracing::info!(success_rate = root_results.success_rate(), "baseline already meets goal");
            self.mark(&mut tree, exploration.id, NodeId::ROOT, NodeStatus::Winner)?;
            winner = Some(NodeId::ROOT);
            self.finish(&mut exploration, ExplorationStatus::GoalAchieved);
        }

        while !exploration.status.is_terminal() {
            if let Some(status) = self.stop_reason(&exploration, deadline) {
                self.finish(&mut exploration, status);
                break;
            }

            let depth = exploration.current_depth;
            let budget = exploration.remaining_llm_calls() as usize;
            let limit = (config.beam_width() as usize).min(budget);
            let frontier = tree.ranked_frontier(depth, limit);
            if frontier.is_empty() {
                self.finish(&mut exploration, ExplorationStatus::NoViablePaths);
                break;
            }

            let calls = u32::try_from(frontier.len()).unwrap_or(u32::MAX);
            exploration.total_llm_calls = exploration.total_llm_calls.saturating_add(calls);
            let requests = self.build_requests(&tree, &exploration, &experiment, &frontier)?;

            let gather = stream::iter(requests)
                .map(|req| self.expand(req, &adapter))
                .buffered(self.settings.max_concurrency)
                .collect::<Vec<_>>();

            let expansions = tokio::select! {
                expansions = gather => Some(expansions),
                () = self.cancel.cancelled() => None,
                () = wait_until(deadline) => None,
            };
            let expansions = match (expansions, self.stop_reason_mid_iteration(deadline)) {
                (Some(expansions), None) => expansions,
                (_, reason) => {
                    let status = reason.unwrap_or(ExplorationStatus::Cancelled);
                    tracing::warn!(iteration = iterations.len() + 1, %status, "iteration abandoned");
                    self.finish(&mut exploration, status);
                    break;
                }
            };

            // Commit: single writer, frontier order
            let tally = self.commit(&mut tree, exploration.id, expansions)?;
            let (reached, pruned) =
                settle(&mut tree, &tally.evaluated, &goal, &self.settings.dominance)?;
            if let Some(best) = reached {
                self.sink.emit(ExplorationEvent::NodeStatusChanged {
                    exploration_id: exploration.id,
                    node_id: best,
                    status: NodeStatus::Winner,
                });
                winner = Some(best);
            }
            for &id in &pruned.dominated_ids {
                self.sink.emit(ExplorationEvent::NodeStatusChanged {
                    exploration_id: exploration.id,
                    node_id: id,
                    status: NodeStatus::Dominated,
                });
            }

            for &id in &tally.evaluated {
                if let Some(rate) = tree.node(id)?.success_rate() {
                    exploration.best_success_rate = exploration.best_success_rate.max(rate);
                }
            }
            exploration.total_nodes = tree.len();
            if reached.is_none() {
                exploration.current_depth = depth + 1;
            }

            let result = IterationResult {
                exploration_id: exploration.id,
                iteration_number: u32::try_from(iterations.len() + 1).unwrap_or(u32::MAX),
                status: if reached.is_some() {
                    ExplorationStatus::GoalAchieved
                } else {
                    exploration.status
                },
                nodes_expanded: tally.expanded,
                nodes_created: tally.created,
                nodes_dominated: pruned.pruned_count(),
                nodes_failed: tally.failed,
                proposals_rejected: tally.rejected,
                llm_calls_made: calls,
                best_success_rate: exploration.best_success_rate,
                frontier_size: frontier.len(),
            };
            tracing::info!(
                iteration = result.iteration_number,
                depth = depth + 1,
                expanded = result.nodes_expanded,
                created = result.nodes_created,
                dominated = result.nodes_dominated,
                failed = result.nodes_failed,
                rejected = result.proposals_rejected,
                best_success_rate = result.best_success_rate,
                "iteration complete"
            );
            self.sink.emit(ExplorationEvent::IterationCompleted(result.clone()));
            if reached.is_some() {
                self.finish(&mut exploration, ExplorationStatus::GoalAchieved);
            }
            iterations.push(result);
        }

        exploration.total_nodes = tree.len();
        let winning_path = winner
            .map(|id| WinningPath::from_tree(&tree, id))
            .transpose()?;

        tracing::info!(
            status = %exploration.status,
            nodes = exploration.total_nodes,
            llm_calls = exploration.total_llm_calls,
            best_success_rate = exploration.best_success_rate,
            elapsed_s = started.elapsed().as_secs_f64(),
            "exploration finished"
        );

        Ok(ExplorationOutcome {
            exploration,
            tree,
            iterations,
            winning_path,
        })
    }

    /// Terminal status due before starting an iteration
    fn stop_reason(&self, exploration: &Exploration, deadline: Option<Instant>) -> Option<ExplorationStatus> {
        if let Some(status) = self.stop_reason_mid_iteration(deadline) {
            return Some(status);
        }
        if exploration.current_depth >= exploration.config.max_depth() {
            return Some(ExplorationStatus::DepthLimitReached);
        }
        if exploration.total_llm_calls >= exploration.config.max_llm_calls() {
            return Some(ExplorationStatus::CostLimitReached);
        }
        None
    }

    /// Cancellation or wall-clock exhaustion
    fn stop_reason_mid_iteration(&self, deadline: Option<Instant>) -> Option<ExplorationStatus> {
        if self.cancel.is_cancelled() {
            Some(ExplorationStatus::Cancelled)
        } else if deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ExplorationStatus::CostLimitReached)
        } else {
            None
        }
    }

    fn build_requests(
        &self,
        tree: &ScenarioTree,
        exploration: &Exploration,
        experiment: &ExperimentContext,
        frontier: &[NodeId],
    ) -> Result<Vec<ProposalRequest>, ExplorerError> {
        let catalog_context = self.catalog.prompt_context();
        let mut requests = Vec::with_capacity(frontier.len());
        for &id in frontier {
            let node = tree.node(id)?;
            let Some(results) = node.simulation_results else {
                continue;
            };
            let path = tree
                .get_path_to_root(id)?
                .into_iter()
                .map(PathEntry::from)
                .collect();
            requests.push(ProposalRequest {
                exploration_id: exploration.id,
                node_id: id,
                path,
                scorecard: node.scorecard_params,
                results,
                catalog_context: catalog_context.clone(),
                experiment: experiment.clone(),
                goal: exploration.goal,
                max_proposals: exploration.config.beam_width() as usize,
                remaining_llm_calls: exploration.remaining_llm_calls(),
                remaining_depth: exploration
                    .config
                    .max_depth()
                    .saturating_sub(node.depth + 1),
            });
        }
        Ok(requests)
    }

    /// Request, validate and simulate children of one node; never touches the tree
    async fn expand(&self, request: ProposalRequest, adapter: &SimulationAdapter) -> Expansion {
        let parent = request.node_id;
        let timeout = self.settings.proposal_timeout();

        let mut proposals = match tokio::time::timeout(timeout, self.proposer.propose(&request)).await {
            Ok(Ok(proposals)) => proposals,
            Ok(Err(e)) => return Expansion { parent, outcome: Err(e) },
            Err(_) => {
                return Expansion {
                    parent,
                    outcome: Err(ProposalError::Timeout {
                        secs: self.settings.proposal_timeout_secs,
                    }),
                }
            }
        };
        proposals.truncate(request.max_proposals);

        let mut candidates = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let params = match proposal.resolve(&self.catalog, &request.scorecard) {
                Ok(params) => params,
                Err(e) => {
                    candidates.push(Err(e));
                    continue;
                }
            };
            let evaluation = evaluate(adapter.clone(), params).await;
            candidates.push(Ok(Candidate {
                params,
                action: proposal.metadata(),
                evaluation,
            }));
        }

        Expansion {
            parent,
            outcome: Ok(candidates),
        }
    }

    fn commit(
        &self,
        tree: &mut ScenarioTree,
        exploration_id: Uuid,
        expansions: Vec<Expansion>,
    ) -> Result<CommitTally, ExplorerError> {
        let mut tally = CommitTally::default();
        for Expansion { parent, outcome } in expansions {
            let candidates = match outcome {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(node = %parent, error = %e, "proposal request failed");
                    self.mark(tree, exploration_id, parent, NodeStatus::ExpansionFailed)?;
                    tally.failed += 1;
                    continue;
                }
            };

            let mut accepted = 0usize;
            for candidate in candidates {
                let candidate = match candidate {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        tracing::warn!(node = %parent, error = %e, "proposal rejected");
                        tally.rejected += 1;
                        continue;
                    }
                };
                accepted += 1;

                let id = tree.add_child(parent, candidate.params, candidate.action)?;
                tally.created += 1;
                self.emit_created(tree, id)?;

                match candidate.evaluation {
                    Ok(run) => {
                        tree.set_results(id, run.results, run.execution_time_seconds)?;
                        tracing::debug!(
                            node = %id,
                            parent = %parent,
                            success_rate = run.results.success_rate(),
                            elapsed_s = run.execution_time_seconds,
                            "node evaluated"
                        );
                        self.sink.emit(ExplorationEvent::NodeEvaluated {
                            exploration_id,
                            node_id: id,
                            results: run.results,
                            execution_time_seconds: run.execution_time_seconds,
                        });
                        tally.evaluated.push(id);
                    }
                    Err(e) => {
                        tracing::warn!(node = %id, error = %e, "simulation failed");
                        self.mark(tree, exploration_id, id, NodeStatus::ExpansionFailed)?;
                        tally.failed += 1;
                    }
                }
            }

            if accepted == 0 {
                tracing::warn!(node = %parent, "no usable proposal");
                self.mark(tree, exploration_id, parent, NodeStatus::ExpansionFailed)?;
                tally.failed += 1;
            } else {
                tally.expanded += 1;
            }
        }
        Ok(tally)
    }

    fn mark(
        &self,
        tree: &mut ScenarioTree,
        exploration_id: Uuid,
        id: NodeId,
        status: NodeStatus,
    ) -> Result<(), ExplorerError> {
        tree.mark_status(id, status)?;
        self.sink.emit(ExplorationEvent::NodeStatusChanged {
            exploration_id,
            node_id: id,
            status,
        });
        Ok(())
    }

    fn emit_created(&self, tree: &ScenarioTree, id: NodeId) -> Result<(), ExplorerError> {
        self.sink.emit(ExplorationEvent::NodeCreated {
            exploration_id: tree.exploration_id(),
            node: tree.node(id)?.clone(),
        });
        Ok(())
    }

    fn emit_status(&self, exploration: &Exploration) {
        self.sink.emit(ExplorationEvent::StatusChanged {
            exploration_id: exploration.id,
            status: exploration.status,
        });
    }

    fn finish(&self, exploration: &mut Exploration, status: ExplorationStatus) {
        exploration.finish(status);
        self.emit_status(exploration);
    }
}

/// Run a simulation off the async worker threads
async fn evaluate(adapter: SimulationAdapter, params: ScorecardParams) -> Result<SimulationRun, EvaluationFailure> {
    match tokio::task::spawn_blocking(move || adapter.evaluate(&params)).await {
        Ok(result) => result.map_err(EvaluationFailure::Simulation),
        Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
        Err(_) => Err(EvaluationFailure::Aborted),
    }
}

/// Pending forever when there is no deadline
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Pick the iteration's winner, then prune the rest
///
/// The goal is checked before pruning: dominance compares success rate and
/// cost only, so a node meeting a fail or did-not-try goal can be dominated.
/// The winner is never pruned.
fn settle(
    tree: &mut ScenarioTree,
    evaluated: &[NodeId],
    goal: &Goal,
    policy: &DominancePolicy,
) -> Result<(Option<NodeId>, PruningOutcome), TreeError> {
    let reached = goal_winner(tree, evaluated, goal);
    if let Some(best) = reached {
        tree.mark_status(best, NodeStatus::Winner)?;
    }
    let pruned = prune(tree, evaluated, policy)?;
    Ok((reached, pruned))
}

/// Best active node among `candidates` that meets the goal
///
/// Highest success rate wins; ties go to the lower id.
fn goal_winner(tree: &ScenarioTree, candidates: &[NodeId], goal: &Goal) -> Option<NodeId> {
    candidates
        .iter()
        .filter_map(|&id| tree.get(id))
        .filter(|n| n.node_status == NodeStatus::Active)
        .filter_map(|n| {
            let results = n.simulation_results?;
            goal.is_satisfied_by(&results)
                .then_some((n.id, results.success_rate()))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(id, _)| id)
}
