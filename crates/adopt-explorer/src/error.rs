//! Error types for the explorer
//!
//! Only [`ExplorerError`] reaches callers of the search loop. Proposal and
//! simulation failures during a run are absorbed into node status.

use adopt_sim::SimulationError;
use adopt_tree::TreeError;

/// Invalid exploration setup, detected before the loop starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Numeric setting outside its documented bounds
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Setting name
        field: &'static str,
        /// Offending value
        value: f64,
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },

    /// Concurrency limit must be positive
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    /// Proposal timeout must be positive
    #[error("proposal_timeout_secs must be at least 1")]
    ZeroTimeout,

    /// No synths to simulate
    #[error("population is empty")]
    EmptyPopulation,

    /// Dominance policy names no dimension
    #[error("dominance policy must compare at least one dimension")]
    EmptyDominancePolicy,
}

/// Failure of a single proposal request
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    /// Service could not be reached or returned an error
    #[error("proposal request failed: {0}")]
    Request(String),

    /// Service did not answer in time
    #[error("proposal timed out after {secs}s")]
    Timeout {
        /// Configured limit
        secs: u64,
    },

    /// Response could not be parsed
    #[error("malformed proposal: {0}")]
    Malformed(String),

    /// Category id not present in the catalog
    #[error("unknown action category: {0}")]
    UnknownCategory(String),

    /// Delta contains NaN or infinity
    #[error("proposed change is not finite")]
    NonFinite,

    /// Resulting scorecard leaves the valid range
    #[error("proposed scorecard is invalid: {0}")]
    InvalidParameters(#[source] SimulationError),

    /// Proposal leaves the scorecard unchanged
    #[error("proposal does not change the scorecard")]
    NoChange,
}

impl ProposalError {
    /// Check if a response arrived but was unusable
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::UnknownCategory(_)
                | Self::NonFinite
                | Self::InvalidParameters(_)
                | Self::NoChange
        )
    }
}

/// Errors returned from the search loop
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Baseline could not be evaluated
    #[error("baseline evaluation failed: {0}")]
    RootEvaluation(#[source] SimulationError),

    /// Simulation task was dropped by the runtime
    #[error("simulation task aborted")]
    TaskAborted,

    /// Tree invariant violated during commit
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

impl ExplorerError {
    /// Check if error was raised before the loop started
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::RootEvaluation(_))
    }
}
