//! Error types for the action catalog

use adopt_sim::ScorecardDimension;

/// Catalog loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog document is not valid TOML for the catalog schema
    #[error("invalid catalog document: {0}")]
    Parse(#[from] toml::de::Error),

    /// Format version this build does not understand
    #[error("unsupported catalog version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version in the document
        found: u32,
        /// Version this build reads
        supported: u32,
    },

    /// Catalog defines no categories
    #[error("catalog has no categories")]
    Empty,

    /// Category id is blank or contains whitespace
    #[error("invalid category id: {0:?}")]
    InvalidCategoryId(String),

    /// Two categories share an id
    #[error("duplicate category id: {0}")]
    DuplicateCategory(String),

    /// Example lists no impact ranges
    #[error("example {action:?} in {category} declares no impacts")]
    NoImpacts {
        /// Owning category
        category: String,
        /// Example action text
        action: String,
    },

    /// Impact range is reversed, not finite, or outside [-1, 1]
    #[error("invalid {dimension} impact range [{min}, {max}] in {category}")]
    InvalidRange {
        /// Owning category
        category: String,
        /// Affected dimension
        dimension: ScorecardDimension,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
}
