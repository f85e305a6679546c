//! Adoption Explorer
//!
//! Budgeted beam search over feature scorecards. Starting from a baseline,
//! each iteration asks a [`ProposalService`] for alternative improvements per
//! frontier node, validates each against the [`adopt_catalog::ActionCatalog`],
//! simulates the resulting scorecards, prunes dominated siblings and stops on
//! the goal or on a depth, call, or time budget.
//!
//! # Example
//!
//! ```rust,ignore
//! use adopt_explorer::{BeamSearchExplorer, CatalogProposer, ExplorationRequest};
//!
//! let catalog = Arc::new(ActionCatalog::builtin()?);
//! let proposer = Arc::new(CatalogProposer::new(Arc::clone(&catalog)));
//! let explorer = BeamSearchExplorer::new(proposer, catalog, population);
//! let outcome = explorer.run(request).await?;
//! println!("{}", outcome.exploration.status);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod events;
pub mod explorer;
pub mod heuristic;
pub mod proposal;
pub mod types;

pub use config::{ExplorationConfig, ExplorerSettings, Goal, GoalMetric, GoalOperator};
pub use error::{ConfigError, ExplorerError, ProposalError};
pub use events::{ChannelSink, EventSink, ExplorationEvent, MemorySink, NullSink};
pub use explorer::{BeamSearchExplorer, CancelHandle, ExplorationRequest};
pub use heuristic::CatalogProposer;
pub use proposal::{
    ActionProposal, PathEntry, ProposalRequest, ProposalService, ProposedChange,
    MIN_EFFECTIVE_CHANGE,
};
pub use types::{
    BaselineAnalysis, ExperimentContext, Exploration, ExplorationOutcome, ExplorationStatus,
    IterationResult, PathStep, WinningPath,
};
