//! Exploration configuration and goal
//!
//! Every structure here is validated when built, including when it is
//! deserialized, so a bad run file fails before any simulation happens.

use crate::error::ConfigError;
use adopt_sim::{SimulationDefaults, SimulationResults};
use adopt_tree::DominancePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search budget and simulation settings for one exploration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExplorationConfigRepr", into = "ExplorationConfigRepr")]
pub struct ExplorationConfig {
    beam_width: u32,
    max_depth: u32,
    max_llm_calls: u32,
    n_executions: u32,
    sigma: f64,
    seed: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ExplorationConfigRepr {
    beam_width: u32,
    max_depth: u32,
    max_llm_calls: u32,
    n_executions: u32,
    sigma: f64,
    seed: u64,
}

impl Default for ExplorationConfigRepr {
    fn default() -> Self {
        Self {
            beam_width: ExplorationConfig::DEFAULT_BEAM_WIDTH,
            max_depth: ExplorationConfig::DEFAULT_MAX_DEPTH,
            max_llm_calls: ExplorationConfig::DEFAULT_MAX_LLM_CALLS,
            n_executions: ExplorationConfig::DEFAULT_N_EXECUTIONS,
            sigma: ExplorationConfig::DEFAULT_SIGMA,
            seed: ExplorationConfig::DEFAULT_SEED,
        }
    }
}

impl ExplorationConfig {
    /// Default frontier size
    pub const DEFAULT_BEAM_WIDTH: u32 = 3;
    /// Default depth limit
    pub const DEFAULT_MAX_DEPTH: u32 = 4;
    /// Default proposal budget
    pub const DEFAULT_MAX_LLM_CALLS: u32 = 20;
    /// Default executions per synth
    pub const DEFAULT_N_EXECUTIONS: u32 = 100;
    /// Default noise scale
    pub const DEFAULT_SIGMA: f64 = 0.1;
    /// Default master seed
    pub const DEFAULT_SEED: u64 = 42;

    /// Upper bound on `beam_width`
    pub const MAX_BEAM_WIDTH: u32 = 10;
    /// Upper bound on `max_depth`
    pub const MAX_DEPTH_LIMIT: u32 = 10;
    /// Upper bound on `max_llm_calls`
    pub const MAX_LLM_CALLS_LIMIT: u32 = 500;
    /// Upper bound on `n_executions`
    pub const MAX_EXECUTIONS: u32 = 10_000;

    /// Create a validated config
    ///
    /// # Errors
    /// `ConfigError::OutOfRange` naming the first setting outside its bounds.
    pub fn new(
        beam_width: u32,
        max_depth: u32,
        max_llm_calls: u32,
        n_executions: u32,
        sigma: f64,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        check_u32("beam_width", beam_width, 1, Self::MAX_BEAM_WIDTH)?;
        check_u32("max_depth", max_depth, 1, Self::MAX_DEPTH_LIMIT)?;
        check_u32("max_llm_calls", max_llm_calls, 0, Self::MAX_LLM_CALLS_LIMIT)?;
        check_u32("n_executions", n_executions, 1, Self::MAX_EXECUTIONS)?;
        if !sigma.is_finite() || !(0.0..=1.0).contains(&sigma) {
            return Err(ConfigError::OutOfRange {
                field: "sigma",
                value: sigma,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self {
            beam_width,
            max_depth,
            max_llm_calls,
            n_executions,
            sigma,
            seed,
        })
    }

    /// Frontier size per depth
    #[inline]
    #[must_use]
    pub fn beam_width(&self) -> u32 {
        self.beam_width
    }

    /// Deepest level children may be created at
    #[inline]
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Proposal request budget
    #[inline]
    #[must_use]
    pub fn max_llm_calls(&self) -> u32 {
        self.max_llm_calls
    }

    /// Executions per synth per evaluation
    #[inline]
    #[must_use]
    pub fn n_executions(&self) -> u32 {
        self.n_executions
    }

    /// Noise scale
    #[inline]
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Master seed shared by every node
    #[inline]
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulation parameters for the adapter
    #[must_use]
    pub fn simulation_defaults(&self) -> SimulationDefaults {
        SimulationDefaults {
            n_executions: self.n_executions,
            sigma: self.sigma,
            seed: self.seed,
        }
    }
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        let r = ExplorationConfigRepr::default();
        Self {
            beam_width: r.beam_width,
            max_depth: r.max_depth,
            max_llm_calls: r.max_llm_calls,
            n_executions: r.n_executions,
            sigma: r.sigma,
            seed: r.seed,
        }
    }
}

impl TryFrom<ExplorationConfigRepr> for ExplorationConfig {
    type Error = ConfigError;

    fn try_from(r: ExplorationConfigRepr) -> Result<Self, Self::Error> {
        Self::new(
            r.beam_width,
            r.max_depth,
            r.max_llm_calls,
            r.n_executions,
            r.sigma,
            r.seed,
        )
    }
}

impl From<ExplorationConfig> for ExplorationConfigRepr {
    fn from(c: ExplorationConfig) -> Self {
        Self {
            beam_width: c.beam_width,
            max_depth: c.max_depth,
            max_llm_calls: c.max_llm_calls,
            n_executions: c.n_executions,
            sigma: c.sigma,
            seed: c.seed,
        }
    }
}

fn check_u32(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: f64::from(value),
            min: f64::from(min),
            max: f64::from(max),
        })
    }
}

/// Runtime knobs of the explorer that do not affect results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    /// Proposal requests in flight at once
    pub max_concurrency: usize,
    /// Per-request proposal timeout
    pub proposal_timeout_secs: u64,
    /// Hard wall-clock limit for the whole run
    pub wall_clock_budget_secs: Option<u64>,
    /// Dimensions compared during pruning
    pub dominance: DominancePolicy,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            proposal_timeout_secs: 60,
            wall_clock_budget_secs: None,
            dominance: DominancePolicy::default(),
        }
    }
}

impl ExplorerSettings {
    /// With concurrency limit
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// With per-request timeout
    #[inline]
    #[must_use]
    pub fn with_proposal_timeout(mut self, secs: u64) -> Self {
        self.proposal_timeout_secs = secs;
        self
    }

    /// With wall-clock budget
    #[inline]
    #[must_use]
    pub fn with_wall_clock_budget(mut self, secs: u64) -> Self {
        self.wall_clock_budget_secs = Some(secs);
        self
    }

    /// With dominance policy
    #[inline]
    #[must_use]
    pub fn with_dominance(mut self, policy: DominancePolicy) -> Self {
        self.dominance = policy;
        self
    }

    /// Per-request timeout
    #[inline]
    #[must_use]
    pub fn proposal_timeout(&self) -> Duration {
        Duration::from_secs(self.proposal_timeout_secs)
    }

    /// Wall-clock budget, if any
    #[inline]
    #[must_use]
    pub fn wall_clock_budget(&self) -> Option<Duration> {
        self.wall_clock_budget_secs.map(Duration::from_secs)
    }

    /// Check settings
    ///
    /// # Errors
    /// See [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.proposal_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.dominance.dimensions.is_empty() {
            return Err(ConfigError::EmptyDominancePolicy);
        }
        Ok(())
    }
}

/// Outcome rate a goal is stated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    /// Share of successful attempts
    SuccessRate,
    /// Share of failed attempts
    FailRate,
    /// Share of users who did not try
    DidNotTryRate,
}

impl GoalMetric {
    /// Read the metric from results
    #[inline]
    #[must_use]
    pub fn value(self, results: &SimulationResults) -> f64 {
        match self {
            Self::SuccessRate => results.success_rate(),
            Self::FailRate => results.fail_rate(),
            Self::DidNotTryRate => results.did_not_try_rate(),
        }
    }
}

/// Comparison applied to the metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalOperator {
    /// `>=`
    #[serde(rename = ">=")]
    AtLeast,
    /// `>`
    #[serde(rename = ">")]
    Above,
    /// `<=`
    #[serde(rename = "<=")]
    AtMost,
    /// `<`
    #[serde(rename = "<")]
    Below,
}

impl GoalOperator {
    /// Apply the comparison
    #[inline]
    #[must_use]
    pub fn compare(self, actual: f64, target: f64) -> bool {
        match self {
            Self::AtLeast => actual >= target,
            Self::Above => actual > target,
            Self::AtMost => actual <= target,
            Self::Below => actual < target,
        }
    }

    /// Symbol
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::Above => ">",
            Self::AtMost => "<=",
            Self::Below => "<",
        }
    }
}

/// Target the exploration tries to reach
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GoalRepr", into = "GoalRepr")]
pub struct Goal {
    metric: GoalMetric,
    operator: GoalOperator,
    value: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct GoalRepr {
    metric: GoalMetric,
    operator: GoalOperator,
    value: f64,
}

impl Goal {
    /// Create a goal with a target in `[0, 1]`
    ///
    /// # Errors
    /// `ConfigError::OutOfRange` if `value` is not a finite rate.
    pub fn new(metric: GoalMetric, operator: GoalOperator, value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OutOfRange {
                field: "goal.value",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self {
            metric,
            operator,
            value,
        })
    }

    /// `success_rate >= value`
    ///
    /// # Errors
    /// See [`Goal::new`].
    pub fn success_at_least(value: f64) -> Result<Self, ConfigError> {
        Self::new(GoalMetric::SuccessRate, GoalOperator::AtLeast, value)
    }

    /// Metric
    #[inline]
    #[must_use]
    pub fn metric(&self) -> GoalMetric {
        self.metric
    }

    /// Operator
    #[inline]
    #[must_use]
    pub fn operator(&self) -> GoalOperator {
        self.operator
    }

    /// Target value
    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Check if results meet the goal
    #[inline]
    #[must_use]
    pub fn is_satisfied_by(&self, results: &SimulationResults) -> bool {
        self.operator.compare(self.metric.value(results), self.value)
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let metric = match self.metric {
            GoalMetric::SuccessRate => "success_rate",
            GoalMetric::FailRate => "fail_rate",
            GoalMetric::DidNotTryRate => "did_not_try_rate",
        };
        write!(f, "{metric} {} {}", self.operator.as_str(), self.value)
    }
}

impl TryFrom<GoalRepr> for Goal {
    type Error = ConfigError;

    fn try_from(r: GoalRepr) -> Result<Self, Self::Error> {
        Self::new(r.metric, r.operator, r.value)
    }
}

impl From<Goal> for GoalRepr {
    fn from(g: Goal) -> Self {
        Self {
            metric: g.metric,
            operator: g.operator,
            value: g.value,
        }
    }
}
