//! Action Catalog
//!
//! Reference list of improvement action categories a proposer may use, with
//! example actions and their typical scorecard impact. Proposals naming a
//! category outside the catalog are rejected.

#![warn(unreachable_pub)]

pub mod catalog;
pub mod error;

pub use catalog::{
    ActionCatalog, ActionCategory, ActionExample, ImpactRange, ImpactRanges, SUPPORTED_VERSION,
};
pub use error::CatalogError;
