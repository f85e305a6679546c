//! Scenario Tree
//!
//! Arena of scorecard variants explored from a baseline. Every node except
//! the root records the action that produced it; nodes move once from
//! `Active` to a terminal status and are frozen afterwards.
//!
//! ```rust,ignore
//! use adopt_tree::{ActionMetadata, NodeId, ScenarioTree};
//!
//! let mut tree = ScenarioTree::new(exploration_id, baseline);
//! let child = tree.add_child(NodeId::ROOT, improved, action)?;
//! let path = tree.get_path_to_root(child)?;
//! assert_eq!(path.len(), 2);
//! ```

#![warn(unreachable_pub)]

pub mod dominance;
pub mod error;
pub mod node;
pub mod tree;

pub use dominance::{prune, DominancePolicy, PruningOutcome};
pub use error::TreeError;
pub use node::{
    allowed_transitions, validate_transition, ActionMetadata, NodeId, NodeStatus, ScenarioNode,
};
pub use tree::{ScenarioTree, StatusCounts};
