//! Error types for the adoption simulator

/// Simulation errors
///
/// Raised at value boundaries (out-of-range traits, scorecards, modifiers)
/// and by the Monte Carlo engine when a run cannot produce valid rates.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Population has no members
    #[error("population is empty")]
    EmptyPopulation,

    /// Execution count must be positive
    #[error("invalid execution count: {0} (must be at least 1)")]
    InvalidExecutionCount(u32),

    /// Noise scale outside [0, 1] or not finite
    #[error("invalid sigma: {0} (expected finite value in [0, 1])")]
    InvalidSigma(f64),

    /// A bounded value fell outside its range
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },

    /// Aggregated rates do not sum to one
    #[error("outcome rates sum to {sum}, expected 1.0")]
    RateSumViolation {
        /// Observed sum of the three rates
        sum: f64,
    },

    /// Population file could not be read
    #[error("failed to read population: {0}")]
    Io(#[from] std::io::Error),

    /// Population document is not valid JSON for the synth schema
    #[error("invalid population document: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    /// Check if error was caused by input data rather than by the engine
    #[inline]
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyPopulation
                | Self::InvalidExecutionCount(_)
                | Self::InvalidSigma(_)
                | Self::OutOfRange { .. }
                | Self::Io(_)
                | Self::Json(_)
        )
    }
}

/// Check that `value` is finite and within `[min, max]`
pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, SimulationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(SimulationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Check that `value` is a finite probability-like quantity in `[0, 1]`
#[inline]
pub(crate) fn check_unit(field: &'static str, value: f64) -> Result<f64, SimulationError> {
    check_range(field, value, 0.0, 1.0)
}
