//! Population input
//!
//! Synths are produced by an external generator; this module only reads them.

use crate::error::SimulationError;
use crate::types::LatentTraits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A simulated individual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synth {
    /// Identifier assigned by the population source
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Behavioral traits
    pub latent_traits: LatentTraits,
}

/// Parse a JSON array of synths
///
/// # Errors
/// - `SimulationError::Json` if the document is malformed or a trait is out of range
/// - `SimulationError::EmptyPopulation` if the array is empty
pub fn population_from_json(json: &str) -> Result<Vec<Synth>, SimulationError> {
    let synths: Vec<Synth> = serde_json::from_str(json)?;
    if synths.is_empty() {
        return Err(SimulationError::EmptyPopulation);
    }
    Ok(synths)
}

/// Read a JSON population file
///
/// # Errors
/// - `SimulationError::Io` if the file cannot be read
/// - see [`population_from_json`]
pub fn load_population(path: impl AsRef<Path>) -> Result<Vec<Synth>, SimulationError> {
    let raw = std::fs::read_to_string(path)?;
    population_from_json(&raw)
}

/// Extract the latent traits of each synth, preserving order
#[must_use]
pub fn latent_traits(synths: &[Synth]) -> Vec<LatentTraits> {
    synths.iter().map(|s| s.latent_traits).collect()
}
