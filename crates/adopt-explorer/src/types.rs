//! Exploration records exposed to collaborators

use crate::config::{ExplorationConfig, Goal};
use adopt_sim::{ScorecardParams, SimulationResults};
use adopt_tree::{NodeId, ScenarioTree, TreeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an exploration; every variant except `Running` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationStatus {
    /// Loop in progress
    Running,
    /// A node met the goal
    GoalAchieved,
    /// Depth budget spent
    DepthLimitReached,
    /// Proposal or wall-clock budget spent
    CostLimitReached,
    /// Frontier emptied before the goal was met
    NoViablePaths,
    /// Stopped through a cancel handle
    Cancelled,
}

impl ExplorationStatus {
    /// Check if the run has ended
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::GoalAchieved => "goal_achieved",
            Self::DepthLimitReached => "depth_limit_reached",
            Self::CostLimitReached => "cost_limit_reached",
            Self::NoViablePaths => "no_viable_paths",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExplorationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being improved, passed through to the proposal service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentContext {
    /// Experiment identifier
    pub experiment_id: String,
    /// Feature under study
    pub feature_name: String,
    /// Free-form description of the feature and audience
    #[serde(default)]
    pub description: String,
}

/// Starting point of an exploration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineAnalysis {
    /// Analysis identifier
    pub id: String,
    /// Baseline design
    pub scorecard: ScorecardParams,
    /// Previously computed results; simulated at start when absent
    #[serde(default)]
    pub results: Option<SimulationResults>,
}

/// Running record of one exploration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exploration {
    /// Exploration id
    pub id: Uuid,
    /// Experiment this run belongs to
    pub experiment_id: String,
    /// Baseline the root was built from
    pub baseline_analysis_id: String,
    /// Target
    pub goal: Goal,
    /// Budgets and simulation settings
    pub config: ExplorationConfig,
    /// Current status
    pub status: ExplorationStatus,
    /// Depth of the current frontier
    pub current_depth: u32,
    /// Nodes in the tree, root included
    pub total_nodes: usize,
    /// Proposal requests issued
    pub total_llm_calls: u32,
    /// Best success rate over every evaluated node
    pub best_success_rate: f64,
    /// Start time
    pub created_at: DateTime<Utc>,
    /// Set once a terminal status is reached
    pub completed_at: Option<DateTime<Utc>>,
}

impl Exploration {
    /// Create a running record
    #[must_use]
    pub fn new(
        id: Uuid,
        experiment_id: impl Into<String>,
        baseline_analysis_id: impl Into<String>,
        goal: Goal,
        config: ExplorationConfig,
    ) -> Self {
        Self {
            id,
            experiment_id: experiment_id.into(),
            baseline_analysis_id: baseline_analysis_id.into(),
            goal,
            config,
            status: ExplorationStatus::Running,
            current_depth: 0,
            total_nodes: 1,
            total_llm_calls: 0,
            best_success_rate: 0.0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Proposal requests still allowed
    #[inline]
    #[must_use]
    pub fn remaining_llm_calls(&self) -> u32 {
        self.config.max_llm_calls().saturating_sub(self.total_llm_calls)
    }

    /// Move to a terminal status; later calls are ignored
    pub fn finish(&mut self, status: ExplorationStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

/// Progress report emitted after every iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// Exploration id
    pub exploration_id: Uuid,
    /// 1-based iteration counter
    pub iteration_number: u32,
    /// Status after the iteration
    pub status: ExplorationStatus,
    /// Frontier nodes that gained at least one child
    pub nodes_expanded: usize,
    /// Children added to the tree
    pub nodes_created: usize,
    /// Children pruned by dominance
    pub nodes_dominated: usize,
    /// Nodes marked `expansion_failed`
    pub nodes_failed: usize,
    /// Proposals rejected by validation
    pub proposals_rejected: usize,
    /// Proposal requests issued this iteration
    pub llm_calls_made: u32,
    /// Best success rate so far
    pub best_success_rate: f64,
    /// Size of the frontier that was expanded
    pub frontier_size: usize,
}

/// One step along a winning path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    /// Node id
    pub node_id: NodeId,
    /// Depth of the node
    pub depth: u32,
    /// Short label of the action that produced it; `None` at the root
    pub short_action: Option<String>,
    /// Category of the action; `None` at the root
    pub action_category: Option<String>,
    /// Scorecard at this step
    pub scorecard_params: ScorecardParams,
    /// Success rate at this step
    pub success_rate: f64,
    /// Change relative to the previous step; 0 at the root
    pub delta_success_rate: f64,
}

/// Root-to-winner path of a successful exploration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinningPath {
    /// Exploration id
    pub exploration_id: Uuid,
    /// Node that met the goal
    pub winner_node_id: NodeId,
    /// Steps from the root to the winner
    pub steps: Vec<PathStep>,
    /// Winner success rate minus root success rate
    pub total_improvement: f64,
}

impl WinningPath {
    /// Build the path to `winner`
    ///
    /// Unevaluated steps report a success rate of 0.
    ///
    /// # Errors
    /// `TreeError::NodeNotFound` if `winner` is not in the tree.
    pub fn from_tree(tree: &ScenarioTree, winner: NodeId) -> Result<Self, TreeError> {
        let path = tree.get_path_to_root(winner)?;
        let mut steps = Vec::with_capacity(path.len());
        let mut previous: Option<f64> = None;
        for node in path {
            let success_rate = node.success_rate().unwrap_or(0.0);
            steps.push(PathStep {
                node_id: node.id,
                depth: node.depth,
                short_action: node.action.as_ref().map(|a| a.short_action.clone()),
                action_category: node.action.as_ref().map(|a| a.action_category.clone()),
                scorecard_params: node.scorecard_params,
                success_rate,
                delta_success_rate: previous.map_or(0.0, |p| success_rate - p),
            });
            previous = Some(success_rate);
        }
        let total_improvement = match (steps.first(), steps.last()) {
            (Some(first), Some(last)) => last.success_rate - first.success_rate,
            _ => 0.0,
        };
        Ok(Self {
            exploration_id: tree.exploration_id(),
            winner_node_id: winner,
            steps,
            total_improvement,
        })
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationOutcome {
    /// Final exploration record
    pub exploration: Exploration,
    /// Full tree
    pub tree: ScenarioTree,
    /// Per-iteration reports in order
    pub iterations: Vec<IterationResult>,
    /// Path to the winner when the goal was achieved
    pub winning_path: Option<WinningPath>,
}
