//! Dominance pruning
//!
//! Node A dominates node B when A's success rate is at least B's, A is no
//! worse than B on every scorecard dimension the policy tracks (lower is
//! better), and A is strictly better on at least one of those axes. Two
//! identical nodes never dominate each other.

use crate::error::TreeError;
use crate::node::{NodeId, NodeStatus, ScenarioNode};
use crate::tree::ScenarioTree;
use adopt_sim::ScorecardDimension;
use serde::{Deserialize, Serialize};

/// Dimensions compared when pruning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominancePolicy {
    /// Scorecard dimensions where lower is better
    pub dimensions: Vec<ScorecardDimension>,
}

impl Default for DominancePolicy {
    fn default() -> Self {
        Self {
            dimensions: vec![ScorecardDimension::Complexity, ScorecardDimension::InitialEffort],
        }
    }
}

impl DominancePolicy {
    /// Policy over every scorecard dimension
    #[must_use]
    pub fn all_dimensions() -> Self {
        Self {
            dimensions: ScorecardDimension::ALL.to_vec(),
        }
    }

    /// Check if `a` dominates `b`
    ///
    /// Unevaluated nodes neither dominate nor are dominated.
    #[must_use]
    pub fn dominates(&self, a: &ScenarioNode, b: &ScenarioNode) -> bool {
        let (Some(rate_a), Some(rate_b)) = (a.success_rate(), b.success_rate()) else {
            return false;
        };
        if rate_a < rate_b {
            return false;
        }
        let mut strictly_better = rate_a > rate_b;
        for &dim in &self.dimensions {
            let va = a.scorecard_params.get(dim);
            let vb = b.scorecard_params.get(dim);
            if va > vb {
                return false;
            }
            if va < vb {
                strictly_better = true;
            }
        }
        strictly_better
    }
}

/// Result of a pruning pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruningOutcome {
    /// Nodes moved to `Dominated`, in id order
    pub dominated_ids: Vec<NodeId>,
}

impl PruningOutcome {
    /// Number of nodes pruned
    #[inline]
    #[must_use]
    pub fn pruned_count(&self) -> usize {
        self.dominated_ids.len()
    }
}

/// Mark every candidate dominated by another candidate
///
/// Dominance is decided on a snapshot before any status changes, so the
/// result does not depend on candidate order. Only active, evaluated nodes
/// are ever marked; failed nodes take no part.
///
/// # Errors
/// `TreeError::NodeNotFound` if a candidate id is not in the tree.
pub fn prune(
    tree: &mut ScenarioTree,
    candidates: &[NodeId],
    policy: &DominancePolicy,
) -> Result<PruningOutcome, TreeError> {
    let mut pool: Vec<&ScenarioNode> = Vec::with_capacity(candidates.len());
    for &id in candidates {
        let node = tree.node(id)?;
        if node.simulation_results.is_some() && node.node_status != NodeStatus::ExpansionFailed {
            pool.push(node);
        }
    }

    let mut dominated_ids: Vec<NodeId> = pool
        .iter()
        .filter(|b| b.node_status == NodeStatus::Active)
        .filter(|b| pool.iter().any(|a| a.id != b.id && policy.dominates(a, b)))
        .map(|b| b.id)
        .collect();
    dominated_ids.sort_unstable();
    dominated_ids.dedup();

    for &id in &dominated_ids {
        tree.mark_status(id, NodeStatus::Dominated)?;
    }

    if !dominated_ids.is_empty() {
        tracing::debug!(count = dominated_ids.len(), "pruned dominated nodes");
    }

    Ok(PruningOutcome { dominated_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ActionMetadata;
    use adopt_sim::{ScorecardParams, SimulationResults};
    use uuid::Uuid;

    fn action() -> ActionMetadata {
        ActionMetadata {
            action_applied: "reduce steps".to_string(),
            action_category: "simplify_flow".to_string(),
            rationale: "less work".to_string(),
            short_action: "fewer steps".to_string(),
        }
    }

    fn child(tree: &mut ScenarioTree, c: f64, e: f64, success: f64) -> NodeId {
        let params = ScorecardParams::new(c, e, 0.5, 0.5).unwrap();
        let id = tree.add_child(NodeId::ROOT, params, action()).unwrap();
        let results = SimulationResults::new(success, 1.0 - success, 0.0).unwrap();
        tree.set_results(id, results, 0.0).unwrap();
        id
    }

    fn tree() -> ScenarioTree {
        ScenarioTree::new(Uuid::new_v4(), ScorecardParams::new(0.5, 0.5, 0.5, 0.5).unwrap())
    }

    #[test]
    fn better_on_every_axis_dominates() {
        let mut t = tree();
        let a = child(&mut t, 0.3, 0.3, 0.6);
        let b = child(&mut t, 0.4, 0.4, 0.5);
        let policy = DominancePolicy::default();
        assert!(policy.dominates(t.node(a).unwrap(), t.node(b).unwrap()));
        assert!(!policy.dominates(t.node(b).unwrap(), t.node(a).unwrap()));
    }

    #[test]
    fn identical_nodes_do_not_dominate() {
        let mut t = tree();
        let a = child(&mut t, 0.3, 0.3, 0.6);
        let b = child(&mut t, 0.3, 0.3, 0.6);
        let outcome = prune(&mut t, &[a, b], &DominancePolicy::default()).unwrap();
        assert!(outcome.dominated_ids.is_empty());
    }

    #[test]
    fn trade_off_keeps_both() {
        let mut t = tree();
        let a = child(&mut t, 0.2, 0.6, 0.6);
        let b = child(&mut t, 0.6, 0.2, 0.6);
        let outcome = prune(&mut t, &[a, b], &DominancePolicy::default()).unwrap();
        assert_eq!(outcome.pruned_count(), 0);
    }

    #[test]
    fn higher_success_with_equal_params_dominates() {
        let mut t = tree();
        let a = child(&mut t, 0.3, 0.3, 0.7);
        let b = child(&mut t, 0.3, 0.3, 0.5);
        let outcome = prune(&mut t, &[a, b], &DominancePolicy::default()).unwrap();
        assert_eq!(outcome.dominated_ids, vec![b]);
        assert_eq!(t.node(b).unwrap().node_status, NodeStatus::Dominated);
        assert_eq!(t.node(a).unwrap().node_status, NodeStatus::Active);
    }

    #[test]
    fn untracked_dimensions_are_ignored() {
        let mut t = tree();
        let params_a = ScorecardParams::new(0.3, 0.3, 0.9, 0.9).unwrap();
        let params_b = ScorecardParams::new(0.4, 0.4, 0.1, 0.1).unwrap();
        let a = t.add_child(NodeId::ROOT, params_a, action()).unwrap();
        let b = t.add_child(NodeId::ROOT, params_b, action()).unwrap();
        let results = SimulationResults::new(0.5, 0.5, 0.0).unwrap();
        t.set_results(a, results, 0.0).unwrap();
        t.set_results(b, results, 0.0).unwrap();

        assert!(DominancePolicy::default().dominates(t.node(a).unwrap(), t.node(b).unwrap()));
        assert!(!DominancePolicy::all_dimensions().dominates(t.node(a).unwrap(), t.node(b).unwrap()));
    }

    #[test]
    fn failed_nodes_neither_dominate_nor_get_marked() {
        let mut t = tree();
        let strong = t
            .add_child(NodeId::ROOT, ScorecardParams::new(0.1, 0.1, 0.5, 0.5).unwrap(), action())
            .unwrap();
        t.mark_status(strong, NodeStatus::ExpansionFailed).unwrap();
        let weak = child(&mut t, 0.6, 0.6, 0.2);

        let outcome = prune(&mut t, &[strong, weak], &DominancePolicy::default()).unwrap();
        assert!(outcome.dominated_ids.is_empty());
        assert_eq!(t.node(strong).unwrap().node_status, NodeStatus::ExpansionFailed);
    }

    #[test]
    fn chain_prunes_all_but_best() {
        let mut t = tree();
        let a = child(&mut t, 0.2, 0.2, 0.8);
        let b = child(&mut t, 0.3, 0.3, 0.6);
        let c = child(&mut t, 0.4, 0.4, 0.4);
        let outcome = prune(&mut t, &[c, b, a], &DominancePolicy::default()).unwrap();
        assert_eq!(outcome.dominated_ids, vec![b, c]);
    }

    #[test]
    fn unknown_candidate_is_an_error() {
        let mut t = tree();
        assert_eq!(
            prune(&mut t, &[NodeId(7)], &DominancePolicy::default()),
            Err(TreeError::NodeNotFound(NodeId(7)))
        );
    }
}
