//! Scenario nodes and their lifecycle
//!
//! A node is created `Active` and may move exactly once to a terminal
//! status. Terminal nodes are never mutated again.

use crate::error::TreeError;
use adopt_sim::{ScorecardParams, SimulationResults};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Arena index of a node
///
/// Ids are assigned in creation order, so a parent id is always lower than
/// its children's ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id of the root node of every tree
    pub const ROOT: Self = Self(0);

    /// Arena slot
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Node lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Eligible for the frontier
    Active,
    /// Pruned by a sibling that is at least as good on every axis
    Dominated,
    /// Reached the exploration goal
    Winner,
    /// Proposal or simulation failed
    ExpansionFailed,
}

impl NodeStatus {
    /// Check if no further transitions are possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Snake-case name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Dominated => "dominated",
            Self::Winner => "winner",
            Self::ExpansionFailed => "expansion_failed",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses reachable from `from`
#[must_use]
pub fn allowed_transitions(from: NodeStatus) -> &'static [NodeStatus] {
    match from {
        NodeStatus::Active => &[
            NodeStatus::Dominated,
            NodeStatus::Winner,
            NodeStatus::ExpansionFailed,
        ],
        NodeStatus::Dominated | NodeStatus::Winner | NodeStatus::ExpansionFailed => &[],
    }
}

/// Validate a status change for `node`
///
/// # Errors
/// `TreeError::IllegalTransition` when `to` is not reachable from `from`.
pub fn validate_transition(node: NodeId, from: NodeStatus, to: NodeStatus) -> Result<(), TreeError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TreeError::IllegalTransition { node, from, to })
    }
}

/// What the proposal step did to produce a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// Full description of the applied action
    pub action_applied: String,
    /// Catalog category id
    pub action_category: String,
    /// Why the action should help
    pub rationale: String,
    /// Short label for tree views
    pub short_action: String,
}

/// One scorecard variant in an exploration tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioNode {
    /// Arena id
    pub id: NodeId,
    /// Owning exploration
    pub exploration_id: Uuid,
    /// Parent; `None` only for the root
    pub parent_id: Option<NodeId>,
    /// 0 at the root, parent depth + 1 otherwise
    pub depth: u32,
    /// Design evaluated at this node
    pub scorecard_params: ScorecardParams,
    /// Set once the node has been simulated
    pub simulation_results: Option<SimulationResults>,
    /// Set for every non-root node
    pub action: Option<ActionMetadata>,
    /// Wall-clock seconds of the node's simulation
    pub execution_time_seconds: Option<f64>,
    /// Lifecycle status
    pub node_status: NodeStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Children in creation order
    pub children: Vec<NodeId>,
}

impl ScenarioNode {
    /// Check if this is the root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Success rate, if evaluated
    #[inline]
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        self.simulation_results.map(|r| r.success_rate())
    }

    /// Check if the node is active and has results
    #[inline]
    #[must_use]
    pub fn is_evaluated_active(&self) -> bool {
        self.node_status == NodeStatus::Active && self.simulation_results.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_reaches_every_terminal_status() {
        for to in [
            NodeStatus::Dominated,
            NodeStatus::Winner,
            NodeStatus::ExpansionFailed,
        ] {
            assert!(validate_transition(NodeId(1), NodeStatus::Active, to).is_ok());
        }
    }

    #[test]
    fn terminal_statuses_are_final() {
        for from in [
            NodeStatus::Dominated,
            NodeStatus::Winner,
            NodeStatus::ExpansionFailed,
        ] {
            assert!(from.is_terminal());
            assert!(validate_transition(NodeId(1), from, NodeStatus::Active).is_err());
        }
        assert!(validate_transition(NodeId(1), NodeStatus::Active, NodeStatus::Active).is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&NodeStatus::ExpansionFailed).unwrap();
        assert_eq!(json, "\"expansion_failed\"");
    }
}
