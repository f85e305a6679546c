//! Core types for the adoption simulator
//!
//! Defines the value types that flow through a simulation:
//! - Scorecard parameters (the design being evaluated)
//! - Latent traits and scenario modifiers (the population and its context)
//! - Per-execution user state and outcome
//! - Aggregated outcome counts and rates

use crate::error::{check_range, check_unit, SimulationError};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Maximum allowed deviation of the summed outcome rates from 1.0
pub const RATE_SUM_TOLERANCE: f64 = 0.01;

/// One dimension of the design scorecard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorecardDimension {
    /// How hard the feature is to understand and operate
    Complexity,
    /// Up-front work before the first result
    InitialEffort,
    /// How risky trying the feature feels
    PerceivedRisk,
    /// Delay before the feature pays off
    TimeToValue,
}

impl ScorecardDimension {
    /// All dimensions in canonical order
    pub const ALL: [Self; 4] = [
        Self::Complexity,
        Self::InitialEffort,
        Self::PerceivedRisk,
        Self::TimeToValue,
    ];

    /// Snake-case name used in config files and prompts
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::InitialEffort => "initial_effort",
            Self::PerceivedRisk => "perceived_risk",
            Self::TimeToValue => "time_to_value",
        }
    }
}

impl std::fmt::Display for ScorecardDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Design scorecard: four values in `[0, 1]`, lower is easier for users
///
/// Fields are private so every instance is range-checked. Values are
/// `Copy` and never mutated in place; derive new scorecards with
/// [`ScorecardParams::with`] or [`ScorecardParams::apply_delta`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScorecardRepr", into = "ScorecardRepr")]
pub struct ScorecardParams {
    complexity: f64,
    initial_effort: f64,
    perceived_risk: f64,
    time_to_value: f64,
}

/// Serialized form of [`ScorecardParams`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScorecardRepr {
    complexity: f64,
    initial_effort: f64,
    perceived_risk: f64,
    time_to_value: f64,
}

impl ScorecardParams {
    /// Create a scorecard, rejecting values outside `[0, 1]`
    pub fn new(
        complexity: f64,
        initial_effort: f64,
        perceived_risk: f64,
        time_to_value: f64,
    ) -> Result<Self, SimulationError> {
        Ok(Self {
            complexity: check_unit("complexity", complexity)?,
            initial_effort: check_unit("initial_effort", initial_effort)?,
            perceived_risk: check_unit("perceived_risk", perceived_risk)?,
            time_to_value: check_unit("time_to_value", time_to_value)?,
        })
    }

    /// Complexity
    #[inline]
    #[must_use]
    pub fn complexity(&self) -> f64 {
        self.complexity
    }

    /// Initial effort
    #[inline]
    #[must_use]
    pub fn initial_effort(&self) -> f64 {
        self.initial_effort
    }

    /// Perceived risk
    #[inline]
    #[must_use]
    pub fn perceived_risk(&self) -> f64 {
        self.perceived_risk
    }

    /// Time to value
    #[inline]
    #[must_use]
    pub fn time_to_value(&self) -> f64 {
        self.time_to_value
    }

    /// Value of a single dimension
    #[inline]
    #[must_use]
    pub fn get(&self, dimension: ScorecardDimension) -> f64 {
        match dimension {
            ScorecardDimension::Complexity => self.complexity,
            ScorecardDimension::InitialEffort => self.initial_effort,
            ScorecardDimension::PerceivedRisk => self.perceived_risk,
            ScorecardDimension::TimeToValue => self.time_to_value,
        }
    }

    /// Copy with one dimension replaced
    ///
    /// # Errors
    /// `SimulationError::OutOfRange` if `value` is not in `[0, 1]`.
    pub fn with(&self, dimension: ScorecardDimension, value: f64) -> Result<Self, SimulationError> {
        let mut next = *self;
        let slot = match dimension {
            ScorecardDimension::Complexity => &mut next.complexity,
            ScorecardDimension::InitialEffort => &mut next.initial_effort,
            ScorecardDimension::PerceivedRisk => &mut next.perceived_risk,
            ScorecardDimension::TimeToValue => &mut next.time_to_value,
        };
        *slot = check_unit(dimension.as_str(), value)?;
        Ok(next)
    }

    /// Apply a relative change; the result must stay in range
    ///
    /// # Errors
    /// `SimulationError::OutOfRange` if any resulting value leaves `[0, 1]`.
    pub fn apply_delta(&self, delta: &ScorecardDelta) -> Result<Self, SimulationError> {
        Self::new(
            self.complexity + delta.complexity,
            self.initial_effort + delta.initial_effort,
            self.perceived_risk + delta.perceived_risk,
            self.time_to_value + delta.time_to_value,
        )
    }

    /// Difference `other - self`
    #[must_use]
    pub fn delta_to(&self, other: &Self) -> ScorecardDelta {
        ScorecardDelta {
            complexity: other.complexity - self.complexity,
            initial_effort: other.initial_effort - self.initial_effort,
            perceived_risk: other.perceived_risk - self.perceived_risk,
            time_to_value: other.time_to_value - self.time_to_value,
        }
    }
}

impl TryFrom<ScorecardRepr> for ScorecardParams {
    type Error = SimulationError;

    fn try_from(raw: ScorecardRepr) -> Result<Self, Self::Error> {
        Self::new(
            raw.complexity,
            raw.initial_effort,
            raw.perceived_risk,
            raw.time_to_value,
        )
    }
}

impl From<ScorecardParams> for ScorecardRepr {
    fn from(p: ScorecardParams) -> Self {
        Self {
            complexity: p.complexity,
            initial_effort: p.initial_effort,
            perceived_risk: p.perceived_risk,
            time_to_value: p.time_to_value,
        }
    }
}

/// Relative change to a scorecard; unspecified dimensions default to 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorecardDelta {
    /// Change in complexity
    pub complexity: f64,
    /// Change in initial effort
    pub initial_effort: f64,
    /// Change in perceived risk
    pub perceived_risk: f64,
    /// Change in time to value
    pub time_to_value: f64,
}

impl ScorecardDelta {
    /// Change of a single dimension
    #[inline]
    #[must_use]
    pub fn get(&self, dimension: ScorecardDimension) -> f64 {
        match dimension {
            ScorecardDimension::Complexity => self.complexity,
            ScorecardDimension::InitialEffort => self.initial_effort,
            ScorecardDimension::PerceivedRisk => self.perceived_risk,
            ScorecardDimension::TimeToValue => self.time_to_value,
        }
    }

    /// Delta touching only one dimension
    #[must_use]
    pub fn single(dimension: ScorecardDimension, amount: f64) -> Self {
        let mut delta = Self::default();
        match dimension {
            ScorecardDimension::Complexity => delta.complexity = amount,
            ScorecardDimension::InitialEffort => delta.initial_effort = amount,
            ScorecardDimension::PerceivedRisk => delta.perceived_risk = amount,
            ScorecardDimension::TimeToValue => delta.time_to_value = amount,
        }
        delta
    }

    /// True if every component is finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        ScorecardDimension::ALL.iter().all(|d| self.get(*d).is_finite())
    }

    /// True if no component moves by more than `epsilon`
    #[inline]
    #[must_use]
    pub fn is_negligible(&self, epsilon: f64) -> bool {
        ScorecardDimension::ALL
            .iter()
            .all(|d| self.get(*d).abs() <= epsilon)
    }
}

/// Per-synth behavioral traits, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatentTraitsRepr", into = "LatentTraitsRepr")]
pub struct LatentTraits {
    capability_mean: f64,
    trust_mean: f64,
    friction_tolerance_mean: f64,
    exploration_prob: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct LatentTraitsRepr {
    capability_mean: f64,
    trust_mean: f64,
    friction_tolerance_mean: f64,
    exploration_prob: f64,
}

impl LatentTraits {
    /// Create traits, rejecting values outside `[0, 1]`
    pub fn new(
        capability_mean: f64,
        trust_mean: f64,
        friction_tolerance_mean: f64,
        exploration_prob: f64,
    ) -> Result<Self, SimulationError> {
        Ok(Self {
            capability_mean: check_unit("capability_mean", capability_mean)?,
            trust_mean: check_unit("trust_mean", trust_mean)?,
            friction_tolerance_mean: check_unit("friction_tolerance_mean", friction_tolerance_mean)?,
            exploration_prob: check_unit("exploration_prob", exploration_prob)?,
        })
    }

    /// Mean capability
    #[inline]
    #[must_use]
    pub fn capability_mean(&self) -> f64 {
        self.capability_mean
    }

    /// Mean trust
    #[inline]
    #[must_use]
    pub fn trust_mean(&self) -> f64 {
        self.trust_mean
    }

    /// Mean friction tolerance
    #[inline]
    #[must_use]
    pub fn friction_tolerance_mean(&self) -> f64 {
        self.friction_tolerance_mean
    }

    /// Probability of exploring regardless of motivation
    #[inline]
    #[must_use]
    pub fn exploration_prob(&self) -> f64 {
        self.exploration_prob
    }
}

impl TryFrom<LatentTraitsRepr> for LatentTraits {
    type Error = SimulationError;

    fn try_from(raw: LatentTraitsRepr) -> Result<Self, Self::Error> {
        Self::new(
            raw.capability_mean,
            raw.trust_mean,
            raw.friction_tolerance_mean,
            raw.exploration_prob,
        )
    }
}

impl From<LatentTraits> for LatentTraitsRepr {
    fn from(t: LatentTraits) -> Self {
        Self {
            capability_mean: t.capability_mean,
            trust_mean: t.trust_mean,
            friction_tolerance_mean: t.friction_tolerance_mean,
            exploration_prob: t.exploration_prob,
        }
    }
}

/// Environmental adjustments applied on top of latent traits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScenarioModifiersRepr", into = "ScenarioModifiersRepr")]
pub struct ScenarioModifiers {
    trust_modifier: f64,
    friction_modifier: f64,
    motivation_modifier: f64,
    task_criticality: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScenarioModifiersRepr {
    #[serde(default)]
    trust_modifier: f64,
    #[serde(default)]
    friction_modifier: f64,
    #[serde(default)]
    motivation_modifier: f64,
    #[serde(default = "default_task_criticality")]
    task_criticality: f64,
}

fn default_task_criticality() -> f64 {
    ScenarioModifiers::BASELINE_TASK_CRITICALITY
}

impl ScenarioModifiers {
    /// Task criticality used while exploring when the caller does not override it
    pub const BASELINE_TASK_CRITICALITY: f64 = 0.5;

    /// Create modifiers; shifts must lie in `[-1, 1]`, criticality in `[0, 1]`
    pub fn new(
        trust_modifier: f64,
        friction_modifier: f64,
        motivation_modifier: f64,
        task_criticality: f64,
    ) -> Result<Self, SimulationError> {
        Ok(Self {
            trust_modifier: check_range("trust_modifier", trust_modifier, -1.0, 1.0)?,
            friction_modifier: check_range("friction_modifier", friction_modifier, -1.0, 1.0)?,
            motivation_modifier: check_range("motivation_modifier", motivation_modifier, -1.0, 1.0)?,
            task_criticality: check_unit("task_criticality", task_criticality)?,
        })
    }

    /// Neutral modifiers used during exploration: no shifts, criticality 0.5
    #[inline]
    #[must_use]
    pub fn exploration_baseline() -> Self {
        Self {
            trust_modifier: 0.0,
            friction_modifier: 0.0,
            motivation_modifier: 0.0,
            task_criticality: Self::BASELINE_TASK_CRITICALITY,
        }
    }

    /// Trust shift
    #[inline]
    #[must_use]
    pub fn trust_modifier(&self) -> f64 {
        self.trust_modifier
    }

    /// Friction tolerance shift
    #[inline]
    #[must_use]
    pub fn friction_modifier(&self) -> f64 {
        self.friction_modifier
    }

    /// Motivation shift
    #[inline]
    #[must_use]
    pub fn motivation_modifier(&self) -> f64 {
        self.motivation_modifier
    }

    /// How critical the task is to the user
    #[inline]
    #[must_use]
    pub fn task_criticality(&self) -> f64 {
        self.task_criticality
    }
}

impl Default for ScenarioModifiers {
    fn default() -> Self {
        Self::exploration_baseline()
    }
}

impl TryFrom<ScenarioModifiersRepr> for ScenarioModifiers {
    type Error = SimulationError;

    fn try_from(raw: ScenarioModifiersRepr) -> Result<Self, Self::Error> {
        Self::new(
            raw.trust_modifier,
            raw.friction_modifier,
            raw.motivation_modifier,
            raw.task_criticality,
        )
    }
}

impl From<ScenarioModifiers> for ScenarioModifiersRepr {
    fn from(m: ScenarioModifiers) -> Self {
        Self {
            trust_modifier: m.trust_modifier,
            friction_modifier: m.friction_modifier,
            motivation_modifier: m.motivation_modifier,
            task_criticality: m.task_criticality,
        }
    }
}

/// Sampled state of one synth for one execution
///
/// Ephemeral: created by the sampler, consumed by the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserState {
    /// Capability, clamped to `[0, 1]`
    pub capability: f64,
    /// Trust, clamped to `[0, 1]`
    pub trust: f64,
    /// Friction tolerance, clamped to `[0, 1]`
    pub friction_tolerance: f64,
    /// Whether the synth explores regardless of motivation
    pub explores: bool,
    /// Motivation, clamped to `[0, 1]`
    pub motivation: f64,
}

/// Result of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Tried the feature and succeeded
    Success,
    /// Tried the feature and failed
    Failed,
    /// Never tried the feature
    DidNotTry,
}

/// Raw tallies of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    /// Successful executions
    pub success: u64,
    /// Failed executions
    pub failed: u64,
    /// Executions where the synth did not try
    pub did_not_try: u64,
}

impl OutcomeCounts {
    /// Record one outcome
    #[inline]
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::DidNotTry => self.did_not_try += 1,
        }
    }

    /// Total executions recorded
    #[inline]
    #[must_use]
    pub fn total(&self) -> u64 {
        self.success + self.failed + self.did_not_try
    }
}

impl Add for OutcomeCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            success: self.success + rhs.success,
            failed: self.failed + rhs.failed,
            did_not_try: self.did_not_try + rhs.did_not_try,
        }
    }
}

impl AddAssign for OutcomeCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Aggregated outcome rates; always sum to 1 within [`RATE_SUM_TOLERANCE`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SimulationResultsRepr", into = "SimulationResultsRepr")]
pub struct SimulationResults {
    success_rate: f64,
    fail_rate: f64,
    did_not_try_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SimulationResultsRepr {
    success_rate: f64,
    fail_rate: f64,
    did_not_try_rate: f64,
}

impl SimulationResults {
    /// Create results from externally supplied rates
    pub fn new(
        success_rate: f64,
        fail_rate: f64,
        did_not_try_rate: f64,
    ) -> Result<Self, SimulationError> {
        let results = Self {
            success_rate: check_unit("success_rate", success_rate)?,
            fail_rate: check_unit("fail_rate", fail_rate)?,
            did_not_try_rate: check_unit("did_not_try_rate", did_not_try_rate)?,
        };
        let sum = results.rate_sum();
        if (sum - 1.0).abs() > RATE_SUM_TOLERANCE {
            return Err(SimulationError::RateSumViolation { sum });
        }
        Ok(results)
    }

    /// Derive rates from tallies
    pub fn from_counts(counts: &OutcomeCounts) -> Result<Self, SimulationError> {
        let total = counts.total();
        if total == 0 {
            return Err(SimulationError::EmptyPopulation);
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = |n: u64| n as f64 / total as f64;
        Self::new(
            rate(counts.success),
            rate(counts.failed),
            rate(counts.did_not_try),
        )
    }

    /// Success rate
    #[inline]
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    /// Failure rate
    #[inline]
    #[must_use]
    pub fn fail_rate(&self) -> f64 {
        self.fail_rate
    }

    /// Did-not-try rate
    #[inline]
    #[must_use]
    pub fn did_not_try_rate(&self) -> f64 {
        self.did_not_try_rate
    }

    /// Rate for one outcome
    #[inline]
    #[must_use]
    pub fn rate(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Success => self.success_rate,
            Outcome::Failed => self.fail_rate,
            Outcome::DidNotTry => self.did_not_try_rate,
        }
    }

    /// Sum of the three rates
    #[inline]
    #[must_use]
    pub fn rate_sum(&self) -> f64 {
        self.success_rate + self.fail_rate + self.did_not_try_rate
    }
}

impl TryFrom<SimulationResultsRepr> for SimulationResults {
    type Error = SimulationError;

    fn try_from(raw: SimulationResultsRepr) -> Result<Self, Self::Error> {
        Self::new(raw.success_rate, raw.fail_rate, raw.did_not_try_rate)
    }
}

impl From<SimulationResults> for SimulationResultsRepr {
    fn from(r: SimulationResults) -> Self {
        Self {
            success_rate: r.success_rate,
            fail_rate: r.fail_rate,
            did_not_try_rate: r.did_not_try_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scorecard_rejects_out_of_range() {
        assert!(ScorecardParams::new(0.3, 0.3, 0.3, 0.3).is_ok());
        assert!(ScorecardParams::new(-0.1, 0.3, 0.3, 0.3).is_err());
        assert!(ScorecardParams::new(0.3, 1.01, 0.3, 0.3).is_err());
    }

    #[test]
    fn scorecard_apply_delta() {
        let base = ScorecardParams::new(0.5, 0.5, 0.5, 0.5).unwrap();
        let next = base
            .apply_delta(&ScorecardDelta::single(ScorecardDimension::Complexity, -0.2))
            .unwrap();
        assert!((next.complexity() - 0.3).abs() < 1e-12);
        assert_eq!(next.initial_effort(), 0.5);

        let too_far = ScorecardDelta::single(ScorecardDimension::TimeToValue, 0.6);
        assert!(base.apply_delta(&too_far).is_err());
    }

    #[test]
    fn scorecard_deserialize_validates() {
        let ok: ScorecardParams = serde_json::from_str(
            r#"{"complexity":0.1,"initial_effort":0.2,"perceived_risk":0.3,"time_to_value":0.4}"#,
        )
        .unwrap();
        assert_eq!(ok.get(ScorecardDimension::PerceivedRisk), 0.3);

        let bad = serde_json::from_str::<ScorecardParams>(
            r#"{"complexity":1.5,"initial_effort":0.2,"perceived_risk":0.3,"time_to_value":0.4}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn delta_to_round_trips() {
        let a = ScorecardParams::new(0.6, 0.5, 0.4, 0.3).unwrap();
        let b = ScorecardParams::new(0.4, 0.5, 0.4, 0.2).unwrap();
        let d = a.delta_to(&b);
        assert!((d.complexity + 0.2).abs() < 1e-12);
        assert!(d.initial_effort.abs() < 1e-12);
        assert!(!d.is_negligible(1e-9));
        assert!(ScorecardDelta::default().is_negligible(1e-9));
    }

    #[test]
    fn modifiers_default_is_exploration_baseline() {
        let m = ScenarioModifiers::default();
        assert_eq!(m.trust_modifier(), 0.0);
        assert_eq!(m.friction_modifier(), 0.0);
        assert_eq!(m.motivation_modifier(), 0.0);
        assert_eq!(m.task_criticality(), 0.5);

        let partial: ScenarioModifiers = serde_json::from_str(r#"{"trust_modifier":-0.2}"#).unwrap();
        assert_eq!(partial.trust_modifier(), -0.2);
        assert_eq!(partial.task_criticality(), 0.5);
    }

    #[test]
    fn counts_accumulate() {
        let mut counts = OutcomeCounts::default();
        counts.record(Outcome::Success);
        counts.record(Outcome::DidNotTry);
        counts += OutcomeCounts {
            success: 1,
            failed: 2,
            did_not_try: 0,
        };
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.success, 2);
    }

    #[test]
    fn results_from_counts_sum_to_one() {
        let counts = OutcomeCounts {
            success: 3,
            failed: 3,
            did_not_try: 1,
        };
        let results = SimulationResults::from_counts(&counts).unwrap();
        assert!((results.rate_sum() - 1.0).abs() < 1e-12);
        assert!((results.rate(Outcome::DidNotTry) - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn results_reject_bad_sum() {
        let err = SimulationResults::new(0.5, 0.2, 0.1).unwrap_err();
        assert!(matches!(err, SimulationError::RateSumViolation { .. }));
        assert!(SimulationResults::from_counts(&OutcomeCounts::default()).is_err());
    }
}
