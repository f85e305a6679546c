//! Testing utilities for the adoption explorer workspace
//!
//! Shared populations, requests and scripted proposal services.

#![allow(missing_docs)]

use adopt_explorer::{
    ActionProposal, BaselineAnalysis, ExperimentContext, ExplorationConfig, ExplorationRequest,
    Goal, ProposalError, ProposalRequest, ProposalService, ProposedChange,
};
use adopt_sim::{LatentTraits, ScorecardDelta, ScorecardParams, SimulationResults};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// `n` identical members
pub fn uniform_population(
    n: usize,
    capability: f64,
    trust: f64,
    friction_tolerance: f64,
    exploration_prob: f64,
) -> Vec<LatentTraits> {
    let traits = LatentTraits::new(capability, trust, friction_tolerance, exploration_prob).unwrap();
    vec![traits; n]
}

/// Five average members that always try the feature
///
/// With `sigma = 0` every execution is identical: a scorecard succeeds for
/// everyone when `0.4c + 0.3e + 0.3r + 0.25t <= 0.395`, otherwise for no one.
pub fn reference_population() -> Vec<LatentTraits> {
    uniform_population(5, 0.6, 0.5, 0.5, 1.0)
}

/// Five members with noisy, mixed behavior
pub fn mixed_population() -> Vec<LatentTraits> {
    vec![
        LatentTraits::new(0.6, 0.5, 0.5, 0.5).unwrap(),
        LatentTraits::new(0.8, 0.7, 0.6, 0.3).unwrap(),
        LatentTraits::new(0.3, 0.4, 0.3, 0.2).unwrap(),
        LatentTraits::new(0.5, 0.6, 0.7, 0.6).unwrap(),
        LatentTraits::new(0.7, 0.3, 0.4, 0.4).unwrap(),
    ]
}

pub fn scorecard(complexity: f64, effort: f64, risk: f64, time_to_value: f64) -> ScorecardParams {
    ScorecardParams::new(complexity, effort, risk, time_to_value).unwrap()
}

/// All four dimensions at 0.5
pub fn midpoint_scorecard() -> ScorecardParams {
    scorecard(0.5, 0.5, 0.5, 0.5)
}

pub fn results(success: f64, fail: f64, did_not_try: f64) -> SimulationResults {
    SimulationResults::new(success, fail, did_not_try).unwrap()
}

/// Noise-free config; 10 executions per member
pub fn deterministic_config(beam_width: u32, max_depth: u32, max_llm_calls: u32) -> ExplorationConfig {
    ExplorationConfig::new(beam_width, max_depth, max_llm_calls, 10, 0.0, 42).unwrap()
}

pub fn exploration_request(
    baseline: ScorecardParams,
    goal_success_rate: f64,
    config: ExplorationConfig,
) -> ExplorationRequest {
    ExplorationRequest {
        experiment: ExperimentContext {
            experiment_id: "exp-onboarding".to_string(),
            feature_name: "workspace import".to_string(),
            description: "Import an existing workspace on first launch".to_string(),
        },
        baseline: BaselineAnalysis {
            id: "baseline-1".to_string(),
            scorecard: baseline,
            results: None,
        },
        goal: Goal::success_at_least(goal_success_rate).unwrap(),
        config,
    }
}

pub fn delta_proposal(category: &str, label: &str, delta: ScorecardDelta) -> ActionProposal {
    ActionProposal {
        action_category: category.to_string(),
        action_description: format!("{label} ({category})"),
        rationale: String::new(),
        short_label: label.to_string(),
        change: ProposedChange::Delta(delta),
    }
}

/// Same change on every dimension
pub fn uniform_delta(amount: f64) -> ScorecardDelta {
    ScorecardDelta {
        complexity: amount,
        initial_effort: amount,
        perceived_risk: amount,
        time_to_value: amount,
    }
}

type ProposeFn = dyn Fn(&ProposalRequest) -> Result<Vec<ActionProposal>, ProposalError> + Send + Sync;

/// Proposer backed by a closure; counts calls
pub struct FnProposer {
    f: Box<ProposeFn>,
    calls: AtomicUsize,
}

impl FnProposer {
    pub fn new(
        f: impl Fn(&ProposalRequest) -> Result<Vec<ActionProposal>, ProposalError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            f: Box::new(f),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProposalService for FnProposer {
    async fn propose(&self, request: &ProposalRequest) -> Result<Vec<ActionProposal>, ProposalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.f)(request)
    }
}

/// Proposer whose every request fails
#[derive(Debug, Default)]
pub struct FailingProposer;

#[async_trait]
impl ProposalService for FailingProposer {
    async fn propose(&self, _request: &ProposalRequest) -> Result<Vec<ActionProposal>, ProposalError> {
        Err(ProposalError::Request("service unavailable".to_string()))
    }
}

/// Proposer that sleeps before delegating
pub struct SlowProposer {
    delay: Duration,
    inner: Arc<dyn ProposalService>,
}

impl SlowProposer {
    pub fn new(delay: Duration, inner: Arc<dyn ProposalService>) -> Arc<Self> {
        Arc::new(Self { delay, inner })
    }
}

#[async_trait]
impl ProposalService for SlowProposer {
    async fn propose(&self, request: &ProposalRequest) -> Result<Vec<ActionProposal>, ProposalError> {
        tokio::time::sleep(self.delay).await;
        self.inner.propose(request).await
    }
}
