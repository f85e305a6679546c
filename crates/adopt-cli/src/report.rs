//! Plain-text rendering of exploration progress and results

use adopt_explorer::{ExplorationOutcome, IterationResult, WinningPath};
use std::fmt::Write as _;

/// One line per finished iteration
#[must_use]
pub fn iteration_line(result: &IterationResult) -> String {
    format!(
        "iteration {:>2}: frontier={} created={} dominated={} failed={} rejected={} best_success_rate={:.3}",
        result.iteration_number,
        result.frontier_size,
        result.nodes_created,
        result.nodes_dominated,
        result.nodes_failed,
        result.proposals_rejected,
        result.best_success_rate,
    )
}

/// Numbered steps from the baseline to the winner
#[must_use]
pub fn winning_path(path: &WinningPath) -> String {
    let mut out = String::new();
    for step in &path.steps {
        let label = step.short_action.as_deref().unwrap_or("baseline");
        let _ = writeln!(
            out,
            "  {}. {label:<32} success_rate={:.3} ({:+.3})",
            step.depth, step.success_rate, step.delta_success_rate
        );
    }
    let _ = writeln!(out, "  total improvement: {:+.3}", path.total_improvement);
    out
}

/// Final summary of a run
#[must_use]
pub fn summary(outcome: &ExplorationOutcome) -> String {
    let exploration = &outcome.exploration;
    let counts = outcome.tree.status_counts();
    let mut out = String::new();
    let _ = writeln!(out, "status: {}", exploration.status);
    let _ = writeln!(out, "goal: {}", exploration.goal);
    let _ = writeln!(
        out,
        "nodes: {} (active {}, dominated {}, failed {}, winner {})",
        exploration.total_nodes, counts.active, counts.dominated, counts.expansion_failed, counts.winner
    );
    let _ = writeln!(
        out,
        "proposal calls: {}/{}",
        exploration.total_llm_calls,
        exploration.config.max_llm_calls()
    );
    let _ = writeln!(out, "best success rate: {:.3}", exploration.best_success_rate);
    match &outcome.winning_path {
        Some(path) => {
            out.push_str("winning path:\n");
            out.push_str(&winning_path(path));
        }
        None => out.push_str("no winning path\n"),
    }
    out
}
