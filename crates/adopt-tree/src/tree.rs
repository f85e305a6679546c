//! Arena-backed scenario tree
//!
//! Nodes live in a contiguous `Vec` indexed by [`NodeId`]. A node's parent is
//! stored as the index of a node created strictly earlier, so the tree is
//! acyclic by construction: no API rewrites `parent_id` after creation.

use crate::error::TreeError;
use crate::node::{validate_transition, ActionMetadata, NodeId, NodeStatus, ScenarioNode};
use adopt_sim::{ScorecardParams, SimulationResults};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Tree of scorecard variants owned by one exploration
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioTree {
    exploration_id: Uuid,
    nodes: Vec<ScenarioNode>,
}

impl ScenarioTree {
    /// Create a tree holding only the root
    #[must_use]
    pub fn new(exploration_id: Uuid, root_params: ScorecardParams) -> Self {
        let root = ScenarioNode {
            id: NodeId::ROOT,
            exploration_id,
            parent_id: None,
            depth: 0,
            scorecard_params: root_params,
            simulation_results: None,
            action: None,
            execution_time_seconds: None,
            node_status: NodeStatus::Active,
            created_at: Utc::now(),
            children: Vec::new(),
        };
        Self {
            exploration_id,
            nodes: vec![root],
        }
    }

    /// Owning exploration
    #[inline]
    #[must_use]
    pub fn exploration_id(&self) -> Uuid {
        self.exploration_id
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &ScenarioNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    /// Look up a node
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ScenarioNode> {
        self.nodes.get(id.index())
    }

    /// Look up a node or fail
    ///
    /// # Errors
    /// `TreeError::NodeNotFound` if `id` is not in the arena.
    pub fn node(&self, id: NodeId) -> Result<&ScenarioNode, TreeError> {
        self.get(id).ok_or(TreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ScenarioNode, TreeError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(TreeError::NodeNotFound(id))
    }

    /// Number of nodes, root included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioNode> {
        self.nodes.iter()
    }

    /// Nodes at a given depth, in id order
    pub fn nodes_at_depth(&self, depth: u32) -> impl Iterator<Item = &ScenarioNode> {
        self.nodes.iter().filter(move |n| n.depth == depth)
    }

    /// Deepest level present
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Add a child under an active parent
    ///
    /// # Errors
    /// - `TreeError::NodeNotFound` if the parent does not exist
    /// - `TreeError::ParentNotExpandable` if the parent is in a terminal status
    /// - `TreeError::CapacityExceeded` if ids are exhausted
    pub fn add_child(
        &mut self,
        parent_id: NodeId,
        scorecard_params: ScorecardParams,
        action: ActionMetadata,
    ) -> Result<NodeId, TreeError> {
        let parent = self.node(parent_id)?;
        if parent.node_status.is_terminal() {
            return Err(TreeError::ParentNotExpandable(parent_id));
        }
        let depth = parent
            .depth
            .checked_add(1)
            .ok_or(TreeError::CapacityExceeded)?;
        let id = NodeId(u32::try_from(self.nodes.len()).map_err(|_| TreeError::CapacityExceeded)?);

        self.nodes.push(ScenarioNode {
            id,
            exploration_id: self.exploration_id,
            parent_id: Some(parent_id),
            depth,
            scorecard_params,
            simulation_results: None,
            action: Some(action),
            execution_time_seconds: None,
            node_status: NodeStatus::Active,
            created_at: Utc::now(),
            children: Vec::new(),
        });
        self.node_mut(parent_id)?.children.push(id);

        Ok(id)
    }

    /// Attach simulation results to an active, not yet evaluated node
    ///
    /// # Errors
    /// - `TreeError::NodeNotFound` if `id` is not in the arena
    /// - `TreeError::ResultsRejected` if the node is terminal or already evaluated
    pub fn set_results(
        &mut self,
        id: NodeId,
        results: SimulationResults,
        execution_time_seconds: f64,
    ) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if node.node_status.is_terminal() || node.simulation_results.is_some() {
            return Err(TreeError::ResultsRejected(id));
        }
        node.simulation_results = Some(results);
        node.execution_time_seconds = Some(execution_time_seconds);
        Ok(())
    }

    /// Move a node to a new status
    ///
    /// # Errors
    /// - `TreeError::NodeNotFound` if `id` is not in the arena
    /// - `TreeError::IllegalTransition` if the lifecycle forbids the change
    pub fn mark_status(&mut self, id: NodeId, status: NodeStatus) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        validate_transition(id, node.node_status, status)?;
        node.node_status = status;
        Ok(())
    }

    /// Nodes from the root down to `id`, inclusive
    ///
    /// # Errors
    /// `TreeError::NodeNotFound` if `id` is not in the arena.
    pub fn get_path_to_root(&self, id: NodeId) -> Result<Vec<&ScenarioNode>, TreeError> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            path.push(node);
            current = node.parent_id;
        }
        path.reverse();
        Ok(path)
    }

    /// Active, evaluated nodes at `depth` ranked for expansion
    ///
    /// Ordered by success rate descending, ties broken by lower id, and
    /// truncated to `limit`.
    #[must_use]
    pub fn ranked_frontier(&self, depth: u32, limit: usize) -> Vec<NodeId> {
        let mut candidates: Vec<(NodeId, f64)> = self
            .nodes_at_depth(depth)
            .filter(|n| n.node_status == NodeStatus::Active)
            .filter_map(|n| n.success_rate().map(|rate| (n.id, rate)))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        candidates.truncate(limit);
        candidates.into_iter().map(|(id, _)| id).collect()
    }

    /// Count nodes in each status
    #[must_use]
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for node in &self.nodes {
            match node.node_status {
                NodeStatus::Active => counts.active += 1,
                NodeStatus::Dominated => counts.dominated += 1,
                NodeStatus::Winner => counts.winner += 1,
                NodeStatus::ExpansionFailed => counts.expansion_failed += 1,
            }
        }
        counts
    }
}

/// Node totals per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Active nodes
    pub active: usize,
    /// Dominated nodes
    pub dominated: usize,
    /// Winner nodes
    pub winner: usize,
    /// Failed nodes
    pub expansion_failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(c: f64) -> ScorecardParams {
        ScorecardParams::new(c, 0.3, 0.3, 0.3).unwrap()
    }

    fn action(label: &str) -> ActionMetadata {
        ActionMetadata {
            action_applied: format!("apply {label}"),
            action_category: "simplify_flow".to_string(),
            rationale: "fewer steps".to_string(),
            short_action: label.to_string(),
        }
    }

    fn results(success: f64) -> SimulationResults {
        SimulationResults::new(success, 1.0 - success, 0.0).unwrap()
    }

    #[test]
    fn root_is_depth_zero_without_parent() {
        let tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_root());
        assert_eq!(tree.root().depth, 0);
        assert!(tree.root().action.is_none());
    }

    #[test]
    fn add_child_links_both_directions() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        let a = tree.add_child(NodeId::ROOT, card(0.4), action("a")).unwrap();
        let b = tree.add_child(a, card(0.3), action("b")).unwrap();

        assert_eq!(tree.node(a).unwrap().depth, 1);
        assert_eq!(tree.node(b).unwrap().depth, 2);
        assert_eq!(tree.node(b).unwrap().parent_id, Some(a));
        assert_eq!(tree.root().children, vec![a]);
        assert_eq!(tree.node(b).unwrap().exploration_id, tree.exploration_id());
    }

    #[test]
    fn add_child_to_missing_parent_fails() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        let err = tree.add_child(NodeId(9), card(0.4), action("x")).unwrap_err();
        assert_eq!(err, TreeError::NodeNotFound(NodeId(9)));
    }

    #[test]
    fn terminal_parent_cannot_expand() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        let a = tree.add_child(NodeId::ROOT, card(0.4), action("a")).unwrap();
        tree.mark_status(a, NodeStatus::Dominated).unwrap();
        assert_eq!(
            tree.add_child(a, card(0.3), action("b")).unwrap_err(),
            TreeError::ParentNotExpandable(a)
        );
    }

    #[test]
    fn path_to_root_is_ordered_and_stable() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        let a = tree.add_child(NodeId::ROOT, card(0.4), action("a")).unwrap();
        let b = tree.add_child(a, card(0.3), action("b")).unwrap();

        let ids = |t: &ScenarioTree| -> Vec<NodeId> {
            t.get_path_to_root(b).unwrap().iter().map(|n| n.id).collect()
        };
        assert_eq!(ids(&tree), vec![NodeId::ROOT, a, b]);
        assert_eq!(ids(&tree), ids(&tree));
    }

    #[test]
    fn results_attach_once() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        tree.set_results(NodeId::ROOT, results(0.4), 0.01).unwrap();
        assert_eq!(tree.root().success_rate(), Some(0.4));
        assert_eq!(
            tree.set_results(NodeId::ROOT, results(0.5), 0.01),
            Err(TreeError::ResultsRejected(NodeId::ROOT))
        );
    }

    #[test]
    fn terminal_node_rejects_results_and_status_changes() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        let a = tree.add_child(NodeId::ROOT, card(0.4), action("a")).unwrap();
        tree.mark_status(a, NodeStatus::ExpansionFailed).unwrap();
        assert!(tree.set_results(a, results(0.4), 0.0).is_err());
        assert!(tree.mark_status(a, NodeStatus::Active).is_err());
        assert!(tree.mark_status(a, NodeStatus::Winner).is_err());
    }

    #[test]
    fn ranked_frontier_orders_by_success_then_id() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        let a = tree.add_child(NodeId::ROOT, card(0.4), action("a")).unwrap();
        let b = tree.add_child(NodeId::ROOT, card(0.3), action("b")).unwrap();
        let c = tree.add_child(NodeId::ROOT, card(0.2), action("c")).unwrap();
        let d = tree.add_child(NodeId::ROOT, card(0.1), action("d")).unwrap();
        tree.set_results(a, results(0.5), 0.0).unwrap();
        tree.set_results(b, results(0.7), 0.0).unwrap();
        tree.set_results(c, results(0.5), 0.0).unwrap();
        tree.set_results(d, results(0.9), 0.0).unwrap();
        tree.mark_status(d, NodeStatus::Dominated).unwrap();

        assert_eq!(tree.ranked_frontier(1, 10), vec![b, a, c]);
        assert_eq!(tree.ranked_frontier(1, 2), vec![b, a]);
        assert!(tree.ranked_frontier(2, 10).is_empty());
    }

    #[test]
    fn status_counts_tally() {
        let mut tree = ScenarioTree::new(Uuid::new_v4(), card(0.5));
        let a = tree.add_child(NodeId::ROOT, card(0.4), action("a")).unwrap();
        tree.add_child(NodeId::ROOT, card(0.3), action("b")).unwrap();
        tree.mark_status(a, NodeStatus::Winner).unwrap();
        let counts = tree.status_counts();
        assert_eq!(counts.active, 2);
        assert_eq!(counts.winner, 1);
    }
}
