//! Outcome classification
//!
//! Maps a sampled [`UserState`] and a [`ScorecardParams`] to an [`Outcome`].
//! The mapping is a pure function; all randomness lives in the state.
//!
//! # Outcome model
//!
//! A synth that does not explore tries the feature only when its motivation
//! reaches the try threshold:
//!
//! ```text
//! try_threshold = clamp(0.30 + 0.80 * complexity - 0.40 * capability, 0, 1)
//! ```
//!
//! Motivation exactly at the threshold counts as trying. A synth that tries
//! succeeds when its margin reaches [`SUCCESS_MARGIN`]:
//!
//! ```text
//! ability        = 0.45 * capability + 0.35 * trust + 0.20 * motivation
//! difficulty     = 0.40 * complexity + 0.30 * initial_effort + 0.30 * perceived_risk
//! value_friction = 0.50 * time_to_value * (1 - friction_tolerance)
//! margin         = ability - difficulty - value_friction
//! ```
//!
//! Success is monotone: non-decreasing in capability, trust, motivation and
//! friction tolerance, non-increasing in every scorecard dimension.

use crate::types::{Outcome, ScorecardParams, UserState};

/// Minimum margin for a tried execution to count as a success
pub const SUCCESS_MARGIN: f64 = 0.15;

const TRY_BASE: f64 = 0.30;
const TRY_COMPLEXITY_WEIGHT: f64 = 0.80;
const TRY_CAPABILITY_WEIGHT: f64 = 0.40;

const ABILITY_CAPABILITY: f64 = 0.45;
const ABILITY_TRUST: f64 = 0.35;
const ABILITY_MOTIVATION: f64 = 0.20;

const DIFFICULTY_COMPLEXITY: f64 = 0.40;
const DIFFICULTY_EFFORT: f64 = 0.30;
const DIFFICULTY_RISK: f64 = 0.30;

const VALUE_FRICTION_WEIGHT: f64 = 0.50;

/// Classify one execution
#[must_use]
pub fn classify(state: &UserState, scorecard: &ScorecardParams) -> Outcome {
    if !state.explores && state.motivation < try_threshold(state, scorecard) {
        return Outcome::DidNotTry;
    }

    if success_margin(state, scorecard) >= SUCCESS_MARGIN {
        Outcome::Success
    } else {
        Outcome::Failed
    }
}

/// Motivation a non-exploring synth needs before it tries the feature
#[inline]
#[must_use]
pub fn try_threshold(state: &UserState, scorecard: &ScorecardParams) -> f64 {
    (TRY_BASE + TRY_COMPLEXITY_WEIGHT * scorecard.complexity()
        - TRY_CAPABILITY_WEIGHT * state.capability)
        .clamp(0.0, 1.0)
}

/// Ability minus difficulty minus value friction
#[inline]
#[must_use]
pub fn success_margin(state: &UserState, scorecard: &ScorecardParams) -> f64 {
    let ability = ABILITY_CAPABILITY * state.capability
        + ABILITY_TRUST * state.trust
        + ABILITY_MOTIVATION * state.motivation;
    let difficulty = DIFFICULTY_COMPLEXITY * scorecard.complexity()
        + DIFFICULTY_EFFORT * scorecard.initial_effort()
        + DIFFICULTY_RISK * scorecard.perceived_risk();
    let value_friction =
        VALUE_FRICTION_WEIGHT * scorecard.time_to_value() * (1.0 - state.friction_tolerance);
    ability - difficulty - value_friction
}
