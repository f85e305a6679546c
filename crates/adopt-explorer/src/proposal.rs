//! Proposal service contract
//!
//! The explorer sends one request per frontier node and receives up to
//! `max_proposals` alternative actions. Responses are untrusted: a malformed
//! response fails the whole request, while a proposal outside the catalog or
//! producing an invalid scorecard is rejected on its own and its siblings
//! still proceed.

use crate::config::Goal;
use crate::error::ProposalError;
use crate::types::ExperimentContext;
use adopt_catalog::ActionCatalog;
use adopt_sim::{ScorecardDelta, ScorecardDimension, ScorecardParams, SimulationResults};
use adopt_tree::{ActionMetadata, NodeId, ScenarioNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Changes smaller than this on every dimension count as no change
pub const MIN_EFFECTIVE_CHANGE: f64 = 1e-6;

/// Source of improvement proposals
#[async_trait]
pub trait ProposalService: Send + Sync {
    /// Propose up to `request.max_proposals` actions for one node
    async fn propose(&self, request: &ProposalRequest) -> Result<Vec<ActionProposal>, ProposalError>;
}

/// One node on the path from the root to the node being expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Node id
    pub node_id: NodeId,
    /// Depth
    pub depth: u32,
    /// Short label of the action that produced the node
    pub short_action: Option<String>,
    /// Category of that action
    pub action_category: Option<String>,
    /// Scorecard at the node
    pub scorecard_params: ScorecardParams,
    /// Success rate at the node, if evaluated
    pub success_rate: Option<f64>,
}

impl From<&ScenarioNode> for PathEntry {
    fn from(node: &ScenarioNode) -> Self {
        Self {
            node_id: node.id,
            depth: node.depth,
            short_action: node.action.as_ref().map(|a| a.short_action.clone()),
            action_category: node.action.as_ref().map(|a| a.action_category.clone()),
            scorecard_params: node.scorecard_params,
            success_rate: node.success_rate(),
        }
    }
}

/// Everything a proposer gets to see about one frontier node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalRequest {
    /// Exploration id
    pub exploration_id: Uuid,
    /// Node being expanded
    pub node_id: NodeId,
    /// Root-to-node path, node last
    pub path: Vec<PathEntry>,
    /// Scorecard of the node
    pub scorecard: ScorecardParams,
    /// Results of the node
    pub results: SimulationResults,
    /// Catalog description for grounding
    pub catalog_context: String,
    /// Experiment description
    pub experiment: ExperimentContext,
    /// Goal of the exploration
    pub goal: Goal,
    /// Alternatives wanted; extra proposals are ignored
    pub max_proposals: usize,
    /// Proposal requests left after this one
    pub remaining_llm_calls: u32,
    /// Levels left below this node
    pub remaining_depth: u32,
}

impl ProposalRequest {
    /// Path as numbered text lines
    #[must_use]
    pub fn path_summary(&self) -> String {
        let mut out = String::new();
        for entry in &self.path {
            let label = entry.short_action.as_deref().unwrap_or("baseline");
            let rate = entry
                .success_rate
                .map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}"));
            let s = &entry.scorecard_params;
            let _ = writeln!(
                out,
                "{}. {label}: complexity={:.2} initial_effort={:.2} perceived_risk={:.2} time_to_value={:.2} success_rate={rate}",
                entry.depth,
                s.complexity(),
                s.initial_effort(),
                s.perceived_risk(),
                s.time_to_value(),
            );
        }
        out
    }
}

/// How a proposal changes the scorecard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposedChange {
    /// Add to the current scorecard
    Delta(ScorecardDelta),
    /// Replace the scorecard
    Absolute(ScorecardParams),
}

/// Action suggested by a proposal service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProposal {
    /// Catalog category id
    pub action_category: String,
    /// Full description of the action
    pub action_description: String,
    /// Why it should help
    #[serde(default)]
    pub rationale: String,
    /// Short label for tree views
    #[serde(default)]
    pub short_label: String,
    /// Scorecard change
    pub change: ProposedChange,
}

impl ActionProposal {
    /// Parse a proposal from raw service output
    ///
    /// Accepts the JSON object alone or embedded in prose or a fenced code
    /// block; the outermost `{ ... }` span is parsed.
    ///
    /// # Errors
    /// `ProposalError::Malformed` if no object is found or it does not match
    /// the proposal schema.
    pub fn from_json(raw: &str) -> Result<Self, ProposalError> {
        let body = outer_span(raw, '{', '}')?;
        serde_json::from_str(body).map_err(|e| ProposalError::Malformed(e.to_string()))
    }

    /// Parse several proposals from raw service output
    ///
    /// Accepts a JSON array of proposals, an object with a `proposals`
    /// array, or a single proposal object, optionally wrapped in prose or a
    /// fenced code block.
    ///
    /// # Errors
    /// `ProposalError::Malformed` if no such JSON value is found.
    pub fn batch_from_json(raw: &str) -> Result<Vec<Self>, ProposalError> {
        #[derive(Deserialize)]
        struct Batch {
            proposals: Vec<ActionProposal>,
        }

        let array_start = raw.find('[');
        let object_start = raw.find('{');
        let is_array = match (array_start, object_start) {
            (Some(a), Some(o)) => a < o,
            (Some(_), None) => true,
            _ => false,
        };
        if !is_array {
            let body = outer_span(raw, '{', '}')?;
            if let Ok(batch) = serde_json::from_str::<Batch>(body) {
                return Ok(batch.proposals);
            }
            return Self::from_json(body).map(|p| vec![p]);
        }
        let body = outer_span(raw, '[', ']')?;
        serde_json::from_str(body).map_err(|e| ProposalError::Malformed(e.to_string()))
    }

    /// Check the proposal and compute the child scorecard
    ///
    /// # Errors
    /// - `ProposalError::UnknownCategory` if the category is not in `catalog`
    /// - `ProposalError::NonFinite` if a delta component is NaN or infinite
    /// - `ProposalError::InvalidParameters` if the result leaves `[0, 1]`
    /// - `ProposalError::NoChange` if the result equals `parent`
    pub fn resolve(
        &self,
        catalog: &ActionCatalog,
        parent: &ScorecardParams,
    ) -> Result<ScorecardParams, ProposalError> {
        if !catalog.is_valid_category(&self.action_category) {
            return Err(ProposalError::UnknownCategory(self.action_category.clone()));
        }
        let child = match &self.change {
            ProposedChange::Delta(delta) => {
                if !delta.is_finite() {
                    return Err(ProposalError::NonFinite);
                }
                parent
                    .apply_delta(delta)
                    .map_err(ProposalError::InvalidParameters)?
            }
            ProposedChange::Absolute(params) => *params,
        };
        let moved = ScorecardDimension::ALL
            .iter()
            .any(|&d| (child.get(d) - parent.get(d)).abs() > MIN_EFFECTIVE_CHANGE);
        if !moved {
            return Err(ProposalError::NoChange);
        }
        Ok(child)
    }

    /// Metadata stored on the child node
    #[must_use]
    pub fn metadata(&self) -> ActionMetadata {
        let short_action = if self.short_label.trim().is_empty() {
            self.action_category.clone()
        } else {
            self.short_label.clone()
        };
        ActionMetadata {
            action_applied: self.action_description.clone(),
            action_category: self.action_category.clone(),
            rationale: self.rationale.clone(),
            short_action,
        }
    }
}

/// Slice from the first `open` to the last `close`, inclusive
fn outer_span(raw: &str, open: char, close: char) -> Result<&str, ProposalError> {
    let start = raw
        .find(open)
        .ok_or_else(|| ProposalError::Malformed("no JSON value in response".to_string()))?;
    let end = raw
        .rfind(close)
        .filter(|&end| end > start)
        .ok_or_else(|| ProposalError::Malformed("unterminated JSON value".to_string()))?;
    Ok(&raw[start..=end])
}
