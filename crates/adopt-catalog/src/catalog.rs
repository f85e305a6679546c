//! Action catalog
//!
//! The catalog is constructed explicitly and handed to whoever needs it
//! (usually behind an `Arc`); it is read-only after load.

use crate::error::CatalogError;
use adopt_sim::{ScorecardDelta, ScorecardDimension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

/// Catalog format version understood by this build
pub const SUPPORTED_VERSION: u32 = 1;

const BUILTIN_CATALOG: &str = include_str!("../catalog/improvement_actions.toml");

/// Typical change to one scorecard dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl ImpactRange {
    /// Midpoint of the range
    #[inline]
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min <= self.max
            && (-1.0..=1.0).contains(&self.min)
            && (-1.0..=1.0).contains(&self.max)
    }
}

/// Impact ranges per dimension; absent dimensions are unaffected
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImpactRanges {
    /// Complexity change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ImpactRange>,
    /// Initial effort change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_effort: Option<ImpactRange>,
    /// Perceived risk change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceived_risk: Option<ImpactRange>,
    /// Time to value change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_value: Option<ImpactRange>,
}

impl ImpactRanges {
    /// Range for one dimension
    #[must_use]
    pub fn get(&self, dimension: ScorecardDimension) -> Option<ImpactRange> {
        match dimension {
            ScorecardDimension::Complexity => self.complexity,
            ScorecardDimension::InitialEffort => self.initial_effort,
            ScorecardDimension::PerceivedRisk => self.perceived_risk,
            ScorecardDimension::TimeToValue => self.time_to_value,
        }
    }

    /// Declared ranges in canonical dimension order
    pub fn iter(&self) -> impl Iterator<Item = (ScorecardDimension, ImpactRange)> + '_ {
        ScorecardDimension::ALL
            .into_iter()
            .filter_map(|d| self.get(d).map(|r| (d, r)))
    }

    /// Delta applying every range's midpoint
    #[must_use]
    pub fn midpoint_delta(&self) -> ScorecardDelta {
        let mid = |r: Option<ImpactRange>| r.map_or(0.0, |r| r.midpoint());
        ScorecardDelta {
            complexity: mid(self.complexity),
            initial_effort: mid(self.initial_effort),
            perceived_risk: mid(self.perceived_risk),
            time_to_value: mid(self.time_to_value),
        }
    }
}

/// Example action with its typical effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExample {
    /// What the action does
    pub action: String,
    /// Typical impact on the scorecard
    pub impacts: ImpactRanges,
}

/// A permitted kind of improvement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCategory {
    /// Stable identifier returned by proposers
    pub id: String,
    /// Display name
    pub name: String,
    /// What actions in this category change
    pub description: String,
    /// Example actions
    #[serde(default)]
    pub examples: Vec<ActionExample>,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: u32,
    #[serde(default)]
    categories: Vec<ActionCategory>,
}

/// Versioned, read-only set of action categories
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    version: u32,
    categories: Vec<ActionCategory>,
    index: HashMap<String, usize>,
}

impl ActionCatalog {
    /// Catalog shipped with this crate
    ///
    /// # Errors
    /// Same as [`ActionCatalog::from_toml_str`]; the embedded document is
    /// covered by tests.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a TOML catalog
    ///
    /// # Errors
    /// - `CatalogError::Parse` for malformed documents
    /// - `CatalogError::UnsupportedVersion` for unknown format versions
    /// - the validation errors listed on [`CatalogError`]
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = toml::from_str(source)?;
        Self::from_categories(document.version, document.categories)
    }

    /// Read a TOML catalog from disk
    ///
    /// # Errors
    /// `CatalogError::Io` if the file cannot be read, otherwise as
    /// [`ActionCatalog::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Build a catalog from categories
    ///
    /// # Errors
    /// See [`CatalogError`].
    pub fn from_categories(version: u32, categories: Vec<ActionCategory>) -> Result<Self, CatalogError> {
        if version != SUPPORTED_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSION,
            });
        }
        if categories.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(categories.len());
        for (position, category) in categories.iter().enumerate() {
            validate_category(category)?;
            if index.insert(category.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateCategory(category.id.clone()));
            }
        }

        tracing::debug!(version, categories = categories.len(), "action catalog loaded");

        Ok(Self {
            version,
            categories,
            index,
        })
    }

    /// Format version
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// All categories in document order
    #[inline]
    #[must_use]
    pub fn categories(&self) -> &[ActionCategory] {
        &self.categories
    }

    /// Look up a category
    #[must_use]
    pub fn category(&self, id: &str) -> Option<&ActionCategory> {
        self.index.get(id).map(|&i| &self.categories[i])
    }

    /// Check if a category id exists
    #[inline]
    #[must_use]
    pub fn is_valid_category(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of categories
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Always false for a validated catalog
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Every (category, example) pair in document order
    pub fn examples(&self) -> impl Iterator<Item = (&ActionCategory, &ActionExample)> {
        self.categories
            .iter()
            .flat_map(|c| c.examples.iter().map(move |e| (c, e)))
    }

    /// Text block describing the catalog for a proposal generator
    #[must_use]
    pub fn prompt_context(&self) -> String {
        let mut out = format!(
            "Improvement action catalog (v{}). Use one of these category ids.\n",
            self.version
        );
        for category in &self.categories {
            let _ = writeln!(
                out,
                "\n- {} ({}): {}",
                category.id, category.name, category.description
            );
            for example in &category.examples {
                let impacts: Vec<String> = example
                    .impacts
                    .iter()
                    .map(|(dim, r)| format!("{dim} {:+.2}..{:+.2}", r.min, r.max))
                    .collect();
                let _ = writeln!(out, "    * {} [{}]", example.action, impacts.join(", "));
            }
        }
        out
    }
}

fn validate_category(category: &ActionCategory) -> Result<(), CatalogError> {
    if category.id.is_empty() || category.id.chars().any(char::is_whitespace) {
        return Err(CatalogError::InvalidCategoryId(category.id.clone()));
    }
    for example in &category.examples {
        let mut declared = 0;
        for (dimension, range) in example.impacts.iter() {
            declared += 1;
            if !range.is_valid() {
                return Err(CatalogError::InvalidRange {
                    category: category.id.clone(),
                    dimension,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        if declared == 0 {
            return Err(CatalogError::NoImpacts {
                category: category.id.clone(),
                action: example.action.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        version = 1

        [[categories]]
        id = "shorten"
        name = "Shorten"
        description = "Fewer steps"

        [[categories.examples]]
        action = "Drop a screen"
        impacts = { complexity = { min = -0.2, max = -0.1 } }
    "#;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = ActionCatalog::builtin().unwrap();
        assert_eq!(catalog.version(), SUPPORTED_VERSION);
        assert!(catalog.len() >= 5);
        assert!(catalog.is_valid_category("simplify_flow"));
        assert!(!catalog.is_valid_category("teleport_users"));
        for (_, example) in catalog.examples() {
            assert!(example.impacts.iter().count() > 0);
        }
    }

    #[test]
    fn lookup_by_id() {
        let catalog = ActionCatalog::from_toml_str(FIXTURE).unwrap();
        let category = catalog.category("shorten").unwrap();
        assert_eq!(category.name, "Shorten");
        assert!(catalog.category("missing").is_none());
    }

    #[test]
    fn midpoint_delta_covers_declared_dimensions() {
        let catalog = ActionCatalog::from_toml_str(FIXTURE).unwrap();
        let (_, example) = catalog.examples().next().unwrap();
        let delta = example.impacts.midpoint_delta();
        assert!((delta.complexity + 0.15).abs() < 1e-12);
        assert_eq!(delta.initial_effort, 0.0);
    }

    #[test]
    fn prompt_context_lists_every_category() {
        let catalog = ActionCatalog::builtin().unwrap();
        let context = catalog.prompt_context();
        for category in catalog.categories() {
            assert!(context.contains(&category.id));
        }
        assert!(context.contains("complexity"));
    }

    #[test]
    fn rejects_unknown_version() {
        let doc = FIXTURE.replace("version = 1", "version = 2");
        assert!(matches!(
            ActionCatalog::from_toml_str(&doc),
            Err(CatalogError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            ActionCatalog::from_toml_str("version = 1"),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let doc = format!("{FIXTURE}\n{}", &FIXTURE[FIXTURE.find("[[categories]]").unwrap()..]);
        assert!(matches!(
            ActionCatalog::from_toml_str(&doc),
            Err(CatalogError::DuplicateCategory(id)) if id == "shorten"
        ));
    }

    #[test]
    fn rejects_reversed_range() {
        let doc = FIXTURE.replace("min = -0.2, max = -0.1", "min = -0.1, max = -0.2");
        assert!(matches!(
            ActionCatalog::from_toml_str(&doc),
            Err(CatalogError::InvalidRange { .. })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_range() {
        let doc = FIXTURE.replace("min = -0.2", "min = -1.5");
        assert!(matches!(
            ActionCatalog::from_toml_str(&doc),
            Err(CatalogError::InvalidRange { .. })
        ));
    }

    #[test]
    fn rejects_example_without_impacts() {
        let doc = FIXTURE.replace(
            "impacts = { complexity = { min = -0.2, max = -0.1 } }",
            "impacts = {}",
        );
        assert!(matches!(
            ActionCatalog::from_toml_str(&doc),
            Err(CatalogError::NoImpacts { .. })
        ));
    }

    #[test]
    fn rejects_blank_id() {
        let doc = FIXTURE.replace("id = \"shorten\"", "id = \"two words\"");
        assert!(matches!(
            ActionCatalog::from_toml_str(&doc),
            Err(CatalogError::InvalidCategoryId(_))
        ));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        assert!(matches!(
            ActionCatalog::from_toml_str("version = "),
            Err(CatalogError::Parse(_))
        ));
    }
}
