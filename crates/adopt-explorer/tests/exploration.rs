//! End-to-end exploration runs against scripted proposers

use adopt_catalog::ActionCatalog;
use adopt_explorer::{
    BeamSearchExplorer, CatalogProposer, ConfigError, ExplorationEvent, ExplorationStatus,
    ExplorerError, ExplorerSettings, MemorySink, ProposalError, ProposalService,
};
use adopt_sim::{ExecutionMode, LatentTraits, MonteCarloEngine, ScorecardDelta, ScorecardDimension};
use adopt_test_utils::{
    deterministic_config, delta_proposal, exploration_request, midpoint_scorecard, mixed_population,
    reference_population, results, uniform_delta, FailingProposer, FnProposer, SlowProposer,
};
use adopt_tree::{NodeId, NodeStatus};
use std::sync::Arc;
use std::time::Duration;

fn catalog() -> Arc<ActionCatalog> {
    Arc::new(ActionCatalog::builtin().unwrap())
}

fn explorer(proposer: Arc<dyn ProposalService>) -> BeamSearchExplorer {
    BeamSearchExplorer::new(proposer, catalog(), reference_population())
}

/// Lowers every dimension by 0.1 per step
fn steady_proposer() -> Arc<FnProposer> {
    FnProposer::new(|_| Ok(vec![delta_proposal("simplify_flow", "trim", uniform_delta(-0.1))]))
}

#[tokio::test]
async fn goal_reached_after_two_steps() {
    let proposer = steady_proposer();
    let request = exploration_request(midpoint_scorecard(), 0.7, deterministic_config(1, 3, 10));

    let outcome = explorer(proposer.clone()).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::GoalAchieved);
    assert_eq!(outcome.exploration.total_llm_calls, 2);
    assert_eq!(proposer.calls(), 2);
    assert_eq!(outcome.tree.len(), 3);
    assert_eq!(outcome.iterations.len(), 2);
    assert_eq!(outcome.exploration.best_success_rate, 1.0);
    assert!(outcome.exploration.completed_at.is_some());

    let path = outcome.winning_path.unwrap();
    assert_eq!(path.steps.len(), 3);
    assert_eq!(
        path.steps.iter().map(|s| s.depth).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(path.steps[1].short_action.as_deref(), Some("trim"));
    assert_eq!(path.total_improvement, 1.0);
    assert_eq!(
        outcome.tree.node(path.winner_node_id).unwrap().node_status,
        NodeStatus::Winner
    );
}

#[tokio::test]
async fn baseline_meeting_goal_needs_no_proposals() {
    let proposer = steady_proposer();
    let mut request = exploration_request(midpoint_scorecard(), 0.7, deterministic_config(3, 3, 10));
    request.baseline.results = Some(results(0.8, 0.2, 0.0));

    let outcome = explorer(proposer.clone()).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::GoalAchieved);
    assert_eq!(proposer.calls(), 0);
    assert_eq!(outcome.exploration.total_llm_calls, 0);
    assert!(outcome.iterations.is_empty());
    assert_eq!(outcome.tree.root().node_status, NodeStatus::Winner);
    assert_eq!(outcome.winning_path.unwrap().steps.len(), 1);
}

#[tokio::test]
async fn depth_limit_stops_after_one_level() {
    let proposer = FnProposer::new(|_| {
        Ok(vec![
            delta_proposal("simplify_flow", "a", ScorecardDelta::single(ScorecardDimension::Complexity, -0.01)),
            delta_proposal("reduce_setup", "b", ScorecardDelta::single(ScorecardDimension::InitialEffort, -0.01)),
            delta_proposal("build_trust", "c", ScorecardDelta::single(ScorecardDimension::PerceivedRisk, -0.01)),
        ])
    });
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(3, 1, 10));

    let outcome = explorer(proposer).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::DepthLimitReached);
    assert_eq!(outcome.exploration.total_llm_calls, 1);
    assert_eq!(outcome.tree.len(), 4);
    assert!(outcome.tree.iter().filter(|n| !n.is_root()).all(|n| n.depth == 1));
    assert!(outcome.winning_path.is_none());

    // "c" is no better than "a" on the compared dimensions
    assert_eq!(outcome.tree.node(NodeId(3)).unwrap().node_status, NodeStatus::Dominated);
    assert_eq!(outcome.tree.node(NodeId(1)).unwrap().node_status, NodeStatus::Active);
    assert_eq!(outcome.tree.node(NodeId(2)).unwrap().node_status, NodeStatus::Active);
    assert_eq!(outcome.iterations[0].nodes_dominated, 1);
    assert_eq!(outcome.iterations[0].nodes_created, 3);
}

#[tokio::test]
async fn zero_call_budget_creates_no_children() {
    let proposer = steady_proposer();
    let request = exploration_request(midpoint_scorecard(), 0.7, deterministic_config(3, 3, 0));

    let outcome = explorer(proposer.clone()).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::CostLimitReached);
    assert_eq!(outcome.tree.len(), 1);
    assert_eq!(outcome.exploration.total_llm_calls, 0);
    assert_eq!(proposer.calls(), 0);
}

#[tokio::test]
async fn call_budget_caps_the_frontier() {
    let proposer = FnProposer::new(|request| {
        let n = request.max_proposals;
        Ok((0..n)
            .map(|i| {
                let step = -0.01 * (i as f64 + 1.0);
                delta_proposal("simplify_flow", &format!("s{i}"), uniform_delta(step))
            })
            .collect())
    });
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(3, 5, 2));

    let outcome = explorer(proposer.clone()).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::CostLimitReached);
    assert_eq!(outcome.exploration.total_llm_calls, 2);
    assert_eq!(proposer.calls(), 2);
    assert_eq!(outcome.iterations[0].llm_calls_made, 1);
    assert_eq!(outcome.iterations[1].llm_calls_made, 1);
}

#[tokio::test]
async fn extra_proposals_are_ignored() {
    let proposer = FnProposer::new(|_| {
        Ok((0..5)
            .map(|i| delta_proposal("simplify_flow", &format!("p{i}"), uniform_delta(-0.01 * f64::from(i + 1))))
            .collect())
    });
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(2, 1, 10));

    let outcome = explorer(proposer).run(request).await.unwrap();

    assert_eq!(outcome.tree.len(), 3);
    assert_eq!(outcome.tree.root().children.len(), 2);
}

#[tokio::test]
async fn invalid_proposal_does_not_block_siblings() {
    let proposer = FnProposer::new(|_| {
        Ok(vec![
            delta_proposal("bribe_users", "bribe", uniform_delta(-0.1)),
            delta_proposal("simplify_flow", "trim", uniform_delta(-0.1)),
        ])
    });
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(2, 1, 10));

    let outcome = explorer(proposer).run(request).await.unwrap();

    let iteration = &outcome.iterations[0];
    assert_eq!(iteration.proposals_rejected, 1);
    assert_eq!(iteration.nodes_created, 1);
    assert_eq!(iteration.nodes_failed, 0);
    assert_eq!(outcome.tree.root().node_status, NodeStatus::Active);
    let child = outcome.tree.node(NodeId(1)).unwrap();
    assert_eq!(child.action.as_ref().unwrap().short_action, "trim");
}

#[tokio::test]
async fn node_without_usable_proposal_fails_expansion() {
    let proposer = FnProposer::new(|_| {
        Ok(vec![
            delta_proposal("simplify_flow", "noop", ScorecardDelta::default()),
            delta_proposal("bribe_users", "bribe", uniform_delta(-0.1)),
        ])
    });
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(2, 3, 10));

    let outcome = explorer(proposer).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::NoViablePaths);
    assert_eq!(outcome.tree.len(), 1);
    assert_eq!(outcome.tree.root().node_status, NodeStatus::ExpansionFailed);
    assert_eq!(outcome.iterations.len(), 1);
    assert_eq!(outcome.iterations[0].proposals_rejected, 2);
    assert_eq!(outcome.iterations[0].nodes_failed, 1);
    assert_eq!(outcome.iterations[0].nodes_expanded, 0);
    assert_eq!(outcome.iterations[0].frontier_size, 1);
}

#[tokio::test]
async fn failing_service_ends_without_viable_paths() {
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(3, 3, 10));

    let outcome = explorer(Arc::new(FailingProposer)).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::NoViablePaths);
    assert_eq!(outcome.tree.root().node_status, NodeStatus::ExpansionFailed);
    assert_eq!(outcome.exploration.total_llm_calls, 1);
    assert!(outcome.winning_path.is_none());
}

#[tokio::test]
async fn malformed_response_fails_the_request() {
    let proposer = FnProposer::new(|_| Err(ProposalError::Malformed("not json".to_string())));
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(1, 2, 10));

    let outcome = explorer(proposer).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::NoViablePaths);
    assert_eq!(outcome.iterations[0].nodes_failed, 1);
    assert_eq!(outcome.iterations[0].nodes_created, 0);
}

#[tokio::test]
async fn proposal_timeout_fails_the_node() {
    let proposer = SlowProposer::new(Duration::from_secs(30), steady_proposer());
    let settings = ExplorerSettings::default().with_proposal_timeout(1);
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(1, 2, 10));

    let outcome = explorer(proposer).with_settings(settings).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::NoViablePaths);
    assert_eq!(outcome.tree.root().node_status, NodeStatus::ExpansionFailed);
}

#[tokio::test]
async fn cancellation_abandons_the_iteration() {
    let proposer = SlowProposer::new(Duration::from_secs(30), steady_proposer());
    let explorer = explorer(proposer);
    let handle = explorer.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(1, 3, 10));

    let outcome = explorer.run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::Cancelled);
    assert_eq!(outcome.tree.len(), 1);
    assert!(outcome.iterations.is_empty());
}

#[tokio::test]
async fn wall_clock_budget_counts_as_cost_limit() {
    let proposer = SlowProposer::new(Duration::from_secs(30), steady_proposer());
    let settings = ExplorerSettings::default().with_wall_clock_budget(1);
    let request = exploration_request(midpoint_scorecard(), 0.99, deterministic_config(1, 3, 10));

    let outcome = explorer(proposer).with_settings(settings).run(request).await.unwrap();

    assert_eq!(outcome.exploration.status, ExplorationStatus::CostLimitReached);
    assert_eq!(outcome.tree.len(), 1);
}

#[tokio::test]
async fn sink_sees_the_whole_run() {
    let sink = Arc::new(MemorySink::new());
    let request = exploration_request(midpoint_scorecard(), 0.7, deterministic_config(1, 3, 10));

    let outcome = explorer(steady_proposer())
        .with_sink(sink.clone())
        .run(request)
        .await
        .unwrap();

    let events = sink.events();
    assert!(matches!(
        events.first(),
        Some(ExplorationEvent::StatusChanged { status: ExplorationStatus::Running, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(ExplorationEvent::StatusChanged { status: ExplorationStatus::GoalAchieved, .. })
    ));
    match &events[events.len() - 2] {
        ExplorationEvent::IterationCompleted(result) => {
            assert_eq!(result.status, ExplorationStatus::GoalAchieved);
            assert_eq!(result.nodes_expanded, 1);
        }
        other => panic!("expected the last iteration before the final status, got {other:?}"),
    }
    let created = events
        .iter()
        .filter(|e| matches!(e, ExplorationEvent::NodeCreated { .. }))
        .count();
    let evaluated = events
        .iter()
        .filter(|e| matches!(e, ExplorationEvent::NodeEvaluated { .. }))
        .count();
    let iterations = events
        .iter()
        .filter(|e| matches!(e, ExplorationEvent::IterationCompleted(_)))
        .count();
    assert_eq!(created, outcome.tree.len());
    assert_eq!(evaluated, outcome.tree.len());
    assert_eq!(iterations, outcome.iterations.len());
    assert!(events.iter().any(|e| matches!(
        e,
        ExplorationEvent::NodeStatusChanged { status: NodeStatus::Winner, .. }
    )));
}

#[tokio::test]
async fn execution_mode_does_not_change_the_tree() {
    let run = |mode: ExecutionMode| async move {
        let catalog = catalog();
        let proposer = Arc::new(CatalogProposer::new(Arc::clone(&catalog)));
        let config = adopt_explorer::ExplorationConfig::new(2, 2, 10, 20, 0.1, 7).unwrap();
        BeamSearchExplorer::new(proposer, catalog, mixed_population())
            .with_engine(MonteCarloEngine::new().with_mode(mode))
            .run(exploration_request(midpoint_scorecard(), 0.99, config))
            .await
            .unwrap()
    };

    let sequential = run(ExecutionMode::Sequential).await;
    let parallel = run(ExecutionMode::Parallel).await;

    assert_eq!(sequential.tree.len(), parallel.tree.len());
    for (a, b) in sequential.tree.iter().zip(parallel.tree.iter()) {
        assert_eq!(a.parent_id, b.parent_id);
        assert_eq!(a.scorecard_params, b.scorecard_params);
        assert_eq!(a.simulation_results, b.simulation_results);
        assert_eq!(a.node_status, b.node_status);
    }
    assert_eq!(sequential.exploration.status, parallel.exploration.status);
}

#[tokio::test]
async fn empty_population_is_a_configuration_error() {
    let request = exploration_request(midpoint_scorecard(), 0.7, deterministic_config(1, 3, 10));
    let explorer = BeamSearchExplorer::new(steady_proposer(), catalog(), Vec::<LatentTraits>::new());

    let err = explorer.run(request).await.unwrap_err();

    assert!(matches!(err, ExplorerError::Config(ConfigError::EmptyPopulation)));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let request = exploration_request(midpoint_scorecard(), 0.7, deterministic_config(1, 3, 10));
    let settings = ExplorerSettings::default().with_max_concurrency(0);

    let err = explorer(steady_proposer())
        .with_settings(settings)
        .run(request)
        .await
        .unwrap_err();

    assert!(matches!(err, ExplorerError::Config(ConfigError::ZeroConcurrency)));
}
