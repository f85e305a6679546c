//! Error types for the scenario tree

use crate::node::{NodeId, NodeStatus};

/// Scenario tree errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// No node with this id in the arena
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Status change not permitted by the node lifecycle
    #[error("illegal status transition for {node}: {from} -> {to}")]
    IllegalTransition {
        /// Node being updated
        node: NodeId,
        /// Current status
        from: NodeStatus,
        /// Requested status
        to: NodeStatus,
    },

    /// Children may only be added under an active node
    #[error("node {0} is not expandable")]
    ParentNotExpandable(NodeId),

    /// Results may be attached once, and only to an active node
    #[error("node {0} cannot accept simulation results")]
    ResultsRejected(NodeId),

    /// Arena is full
    #[error("tree capacity exceeded")]
    CapacityExceeded,
}
