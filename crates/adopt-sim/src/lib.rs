//! Adoption Simulator
//!
//! Monte Carlo estimate of how a feature's design scorecard affects the
//! adoption behavior of a synthetic population:
//! - [`sampler`] draws a noisy user state per (synth, execution)
//! - [`classifier`] maps a state and scorecard to success / failed / did-not-try
//! - [`engine`] runs the trials across the population and aggregates rates
//! - [`adapter`] binds a population and run defaults for repeated evaluation
//!
//! # Example
//!
//! ```rust,ignore
//! use adopt_sim::{LatentTraits, MonteCarloEngine, ScenarioModifiers, ScorecardParams};
//!
//! let population = vec![LatentTraits::new(0.6, 0.5, 0.5, 0.5)?; 5];
//! let scorecard = ScorecardParams::new(0.3, 0.3, 0.3, 0.3)?;
//! let run = MonteCarloEngine::new().run(
//!     &population,
//!     &scorecard,
//!     &ScenarioModifiers::exploration_baseline(),
//!     50,
//!     0.1,
//!     42,
//! )?;
//! println!("success rate: {:.3}", run.results.success_rate());
//! ```

#![warn(unreachable_pub)]

pub mod adapter;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod population;
pub mod sampler;
pub mod types;

pub use adapter::{SimulationAdapter, SimulationDefaults};
pub use classifier::classify;
pub use engine::{member_seed, ExecutionMode, MonteCarloEngine, SimulationRun};
pub use error::SimulationError;
pub use population::{latent_traits, load_population, population_from_json, Synth};
pub use sampler::sample;
pub use types::{
    LatentTraits, Outcome, OutcomeCounts, ScenarioModifiers, ScorecardDelta, ScorecardDimension,
    ScorecardParams, SimulationResults, UserState, RATE_SUM_TOLERANCE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
