//! Deterministic catalog-driven proposer
//!
//! Used when no language model is configured. For each node it targets the
//! highest (worst) scorecard dimensions, picks the catalog examples with the
//! strongest typical reduction on them that the path has not applied yet,
//! and applies the midpoints of their impact ranges, clamped to the valid
//! range.

use crate::error::ProposalError;
use crate::proposal::{ActionProposal, ProposalRequest, ProposalService, ProposedChange, MIN_EFFECTIVE_CHANGE};
use adopt_catalog::{ActionCatalog, ActionCategory, ActionExample};
use adopt_sim::{ScorecardDelta, ScorecardDimension, ScorecardParams};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Proposer that reads its actions straight from the catalog
#[derive(Debug, Clone)]
pub struct CatalogProposer {
    catalog: Arc<ActionCatalog>,
}

impl CatalogProposer {
    /// Create proposer over a catalog
    #[must_use]
    pub fn new(catalog: Arc<ActionCatalog>) -> Self {
        Self { catalog }
    }

    /// Pick up to `limit` distinct actions, skipping already applied ones
    ///
    /// Dimensions are visited worst first; within a dimension, examples with
    /// the strongest typical reduction come first.
    ///
    /// # Errors
    /// `ProposalError::NoChange` if no unused catalog example lowers any
    /// dimension.
    pub fn suggest(
        &self,
        scorecard: &ScorecardParams,
        applied: &HashSet<&str>,
        limit: usize,
    ) -> Result<Vec<ActionProposal>, ProposalError> {
        let mut dimensions = ScorecardDimension::ALL;
        // Stable sort keeps canonical order among equal values
        dimensions.sort_by(|a, b| scorecard.get(*b).total_cmp(&scorecard.get(*a)));

        let mut chosen: Vec<ActionProposal> = Vec::new();
        for target in dimensions {
            let mut candidates: Vec<(&ActionCategory, &ActionExample, f64)> = self
                .catalog
                .examples()
                .filter(|(_, e)| !applied.contains(e.action.as_str()))
                .filter_map(|(c, e)| {
                    let mid = e.impacts.get(target)?.midpoint();
                    (mid < 0.0).then_some((c, e, mid))
                })
                .collect();
            candidates.sort_by(|a, b| a.2.total_cmp(&b.2));

            for (category, example, _) in candidates {
                if chosen.len() >= limit {
                    return Ok(chosen);
                }
                if chosen.iter().any(|p| p.short_label == example.action) {
                    continue;
                }
                let child = clipped_apply(scorecard, &example.impacts.midpoint_delta())?;
                if scorecard.get(target) - child.get(target) <= MIN_EFFECTIVE_CHANGE {
                    continue;
                }
                chosen.push(ActionProposal {
                    action_category: category.id.clone(),
                    action_description: example.action.clone(),
                    rationale: format!(
                        "{target} is at {:.2}; {} typically lowers it",
                        scorecard.get(target),
                        category.name.to_lowercase()
                    ),
                    short_label: example.action.clone(),
                    change: ProposedChange::Absolute(child),
                });
            }
        }

        if chosen.is_empty() {
            Err(ProposalError::NoChange)
        } else {
            Ok(chosen)
        }
    }
}

#[async_trait]
impl ProposalService for CatalogProposer {
    async fn propose(&self, request: &ProposalRequest) -> Result<Vec<ActionProposal>, ProposalError> {
        let applied: HashSet<&str> = request
            .path
            .iter()
            .filter_map(|entry| entry.short_action.as_deref())
            .collect();
        self.suggest(&request.scorecard, &applied, request.max_proposals)
    }
}

/// Apply `delta` to `base`, clamping every dimension to `[0, 1]`
fn clipped_apply(base: &ScorecardParams, delta: &ScorecardDelta) -> Result<ScorecardParams, ProposalError> {
    let clip = |dim: ScorecardDimension| (base.get(dim) + delta.get(dim)).clamp(0.0, 1.0);
    ScorecardParams::new(
        clip(ScorecardDimension::Complexity),
        clip(ScorecardDimension::InitialEffort),
        clip(ScorecardDimension::PerceivedRisk),
        clip(ScorecardDimension::TimeToValue),
    )
    .map_err(ProposalError::InvalidParameters)
}
