//! Simulation adapter
//!
//! Binds a population, scenario modifiers and run defaults so that callers
//! evaluate a scorecard with a single call.

use crate::engine::{MonteCarloEngine, SimulationRun};
use crate::error::SimulationError;
use crate::types::{LatentTraits, ScenarioModifiers, ScorecardParams};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Run parameters applied to every evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationDefaults {
    /// Executions per population member
    pub n_executions: u32,
    /// Noise standard deviation
    pub sigma: f64,
    /// Master seed
    pub seed: u64,
}

impl Default for SimulationDefaults {
    fn default() -> Self {
        Self {
            n_executions: 100,
            sigma: 0.1,
            seed: 42,
        }
    }
}

/// Evaluates scorecards against a fixed population
///
/// Cheap to clone: the population is shared.
#[derive(Debug, Clone)]
pub struct SimulationAdapter {
    population: Arc<[LatentTraits]>,
    modifiers: ScenarioModifiers,
    defaults: SimulationDefaults,
    engine: MonteCarloEngine,
}

impl SimulationAdapter {
    /// Create adapter with exploration baseline modifiers
    #[must_use]
    pub fn new(population: impl Into<Arc<[LatentTraits]>>, defaults: SimulationDefaults) -> Self {
        Self {
            population: population.into(),
            modifiers: ScenarioModifiers::exploration_baseline(),
            defaults,
            engine: MonteCarloEngine::new(),
        }
    }

    /// Override the scenario modifiers
    #[inline]
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: ScenarioModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Override the engine
    #[inline]
    #[must_use]
    pub fn with_engine(mut self, engine: MonteCarloEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Evaluate a scorecard
    ///
    /// # Errors
    /// Propagates any [`SimulationError`] from the engine.
    pub fn evaluate(&self, scorecard: &ScorecardParams) -> Result<SimulationRun, SimulationError> {
        self.engine.run(
            &self.population,
            scorecard,
            &self.modifiers,
            self.defaults.n_executions,
            self.defaults.sigma,
            self.defaults.seed,
        )
    }

    /// Number of synths
    #[inline]
    #[must_use]
    pub fn population_size(&self) -> usize {
        self.population.len()
    }

    /// Scenario modifiers in use
    #[inline]
    #[must_use]
    pub fn modifiers(&self) -> &ScenarioModifiers {
        &self.modifiers
    }

    /// Run defaults in use
    #[inline]
    #[must_use]
    pub fn defaults(&self) -> &SimulationDefaults {
        &self.defaults
    }
}
