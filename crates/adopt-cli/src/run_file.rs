//! TOML run file for `adopt explore`

use adopt_catalog::ActionCatalog;
use adopt_explorer::{
    BaselineAnalysis, ExperimentContext, ExplorationConfig, ExplorationRequest, ExplorerSettings,
    Goal,
};
use adopt_sim::{latent_traits, load_population, LatentTraits, ScenarioModifiers};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Everything needed to start one exploration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    /// JSON population file, relative to the run file
    pub population: PathBuf,
    /// Catalog file; the builtin catalog when absent
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Experiment passed to the proposer
    pub experiment: ExperimentContext,
    /// Root design
    pub baseline: BaselineAnalysis,
    /// Target
    pub goal: Goal,
    /// Budgets and simulation settings
    #[serde(default)]
    pub exploration: ExplorationConfig,
    /// Explorer runtime settings
    #[serde(default)]
    pub settings: ExplorerSettings,
    /// Overrides the exploration modifiers
    #[serde(default)]
    pub modifiers: Option<ScenarioModifiers>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl RunFile {
    /// Parse a run file; relative paths resolve against `base_dir`
    ///
    /// # Errors
    /// Fails if the TOML is malformed or any value is out of range.
    pub fn from_toml_str(raw: &str, base_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let mut file: Self = toml::from_str(raw).context("invalid run file")?;
        file.base_dir = base_dir.into();
        Ok(file)
    }

    /// Read and parse a run file
    ///
    /// # Errors
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read run file {}", path.display()))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(&raw, base_dir).with_context(|| format!("in {}", path.display()))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load the population's latent traits
    ///
    /// # Errors
    /// Fails if the population file is missing, malformed or empty.
    pub fn load_population(&self) -> anyhow::Result<Vec<LatentTraits>> {
        let path = self.resolve(&self.population);
        let synths = load_population(&path)
            .with_context(|| format!("cannot load population {}", path.display()))?;
        tracing::debug!(path = %path.display(), synths = synths.len(), "population loaded");
        Ok(latent_traits(&synths))
    }

    /// Load the configured catalog or the builtin one
    ///
    /// # Errors
    /// Fails if the catalog file is missing or invalid.
    pub fn load_catalog(&self) -> anyhow::Result<ActionCatalog> {
        match &self.catalog {
            Some(path) => {
                let path = self.resolve(path);
                ActionCatalog::from_path(&path)
                    .with_context(|| format!("cannot load catalog {}", path.display()))
            }
            None => ActionCatalog::builtin().context("builtin catalog is invalid"),
        }
    }

    /// Explorer input described by this file
    #[must_use]
    pub fn request(&self) -> ExplorationRequest {
        ExplorationRequest {
            experiment: self.experiment.clone(),
            baseline: self.baseline.clone(),
            goal: self.goal,
            config: self.exploration,
        }
    }
}
