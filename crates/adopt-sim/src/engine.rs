//! Monte Carlo simulation engine
//!
//! Runs `n_executions` sampler → classifier trials for every population
//! member and aggregates the outcomes into rates.
//!
//! Each member draws from its own generator, seeded from the master seed and
//! the member's index. Members share no mutable state, so the sequential and
//! the rayon-parallel paths produce identical tallies for the same seed.

use crate::classifier::classify;
use crate::error::SimulationError;
use crate::sampler::sample;
use crate::types::{LatentTraits, OutcomeCounts, ScenarioModifiers, ScorecardParams, SimulationResults};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How population members are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One member after another on the calling thread
    Sequential,
    /// Members spread over the rayon pool
    #[default]
    Parallel,
}

/// Output of one engine run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    /// Aggregated rates
    pub results: SimulationResults,
    /// Raw tallies behind the rates
    pub counts: OutcomeCounts,
    /// Wall-clock time spent in the trial loop; informational only
    pub execution_time_seconds: f64,
}

/// Monte Carlo engine
#[derive(Debug, Clone, Copy, Default)]
pub struct MonteCarloEngine {
    mode: ExecutionMode,
}

impl MonteCarloEngine {
    /// Create engine with the default (parallel) mode
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With execution mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Execution mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Evaluate a scorecard against a population
    ///
    /// # Errors
    /// - `SimulationError::EmptyPopulation` if `population` is empty
    /// - `SimulationError::InvalidExecutionCount` if `n_executions` is 0
    /// - `SimulationError::InvalidSigma` if `sigma` is not a finite value in `[0, 1]`
    /// - `SimulationError::RateSumViolation` if aggregation breaks the rate invariant
    #[tracing::instrument(
        level = "debug",
        skip(self, population, scorecard, modifiers),
        fields(population = population.len(), mode = ?self.mode)
    )]
    pub fn run(
        &self,
        population: &[LatentTraits],
        scorecard: &ScorecardParams,
        modifiers: &ScenarioModifiers,
        n_executions: u32,
        sigma: f64,
        seed: u64,
    ) -> Result<SimulationRun, SimulationError> {
        if population.is_empty() {
            return Err(SimulationError::EmptyPopulation);
        }
        if n_executions == 0 {
            return Err(SimulationError::InvalidExecutionCount(n_executions));
        }
        if !sigma.is_finite() || !(0.0..=1.0).contains(&sigma) {
            return Err(SimulationError::InvalidSigma(sigma));
        }

        let start = Instant::now();

        let trial = |(index, traits): (usize, &LatentTraits)| {
            run_member(traits, scorecard, modifiers, n_executions, sigma, member_seed(seed, index))
        };

        let counts = match self.mode {
            ExecutionMode::Sequential => population
                .iter()
                .enumerate()
                .map(trial)
                .fold(OutcomeCounts::default(), |acc, c| acc + c),
            ExecutionMode::Parallel => population
                .par_iter()
                .enumerate()
                .map(trial)
                .reduce(OutcomeCounts::default, |a, b| a + b),
        };

        let execution_time_seconds = start.elapsed().as_secs_f64();
        let results = SimulationResults::from_counts(&counts)?;

        tracing::debug!(
            success_rate = results.success_rate(),
            fail_rate = results.fail_rate(),
            did_not_try_rate = results.did_not_try_rate(),
            elapsed_s = execution_time_seconds,
            "Monte Carlo run complete"
        );

        Ok(SimulationRun {
            results,
            counts,
            execution_time_seconds,
        })
    }
}

/// Run all executions for one population member
fn run_member(
    traits: &LatentTraits,
    scorecard: &ScorecardParams,
    modifiers: &ScenarioModifiers,
    n_executions: u32,
    sigma: f64,
    seed: u64,
) -> OutcomeCounts {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts = OutcomeCounts::default();
    for _ in 0..n_executions {
        let state = sample(traits, modifiers, sigma, &mut rng);
        counts.record(classify(&state, scorecard));
    }
    counts
}

/// Seed for a member's sub-stream
///
/// Hashing (rather than `seed + index`) keeps neighbouring master seeds from
/// sharing member streams.
#[must_use]
pub fn member_seed(master_seed: u64, member_index: usize) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(&(member_index as u64).to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
