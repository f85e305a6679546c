//! Stochastic user-state sampling
//!
//! Draws one [`UserState`] from a synth's latent traits, the scenario
//! modifiers and Gaussian noise. All draws come from the generator passed
//! in by the caller, in a fixed order:
//!
//! 1. capability noise
//! 2. trust noise
//! 3. friction tolerance noise
//! 4. exploration coin
//!
//! Motivation is not noised. Reusing a generator seeded the same way with the
//! same inputs reproduces the same sequence of states.

use crate::types::{LatentTraits, ScenarioModifiers, UserState};
use rand::Rng;
use rand_distr::StandardNormal;

/// Sample a user state
///
/// `sigma` is the standard deviation of the Gaussian noise applied to the
/// three noised traits. The Monte Carlo engine validates it before calling.
pub fn sample<R: Rng + ?Sized>(
    traits: &LatentTraits,
    modifiers: &ScenarioModifiers,
    sigma: f64,
    rng: &mut R,
) -> UserState {
    let capability = noisy(traits.capability_mean(), sigma, rng);
    let trust = noisy(traits.trust_mean(), sigma, rng) + modifiers.trust_modifier();
    let friction_tolerance =
        noisy(traits.friction_tolerance_mean(), sigma, rng) + modifiers.friction_modifier();
    let explores = rng.gen_bool(traits.exploration_prob());
    let motivation = modifiers.task_criticality() + modifiers.motivation_modifier();

    UserState {
        capability: capability.clamp(0.0, 1.0),
        trust: trust.clamp(0.0, 1.0),
        friction_tolerance: friction_tolerance.clamp(0.0, 1.0),
        explores,
        motivation: motivation.clamp(0.0, 1.0),
    }
}

#[inline]
fn noisy<R: Rng + ?Sized>(mean: f64, sigma: f64, rng: &mut R) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + sigma * z
}
