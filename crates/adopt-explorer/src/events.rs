//! Exploration events for persistence and progress streaming

use crate::types::{ExplorationStatus, IterationResult};
use adopt_sim::SimulationResults;
use adopt_tree::{NodeId, NodeStatus, ScenarioNode};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Something that happened during an exploration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExplorationEvent {
    /// Node added to the tree
    NodeCreated {
        /// Exploration id
        exploration_id: Uuid,
        /// Snapshot at creation
        node: ScenarioNode,
    },
    /// Node received simulation results
    NodeEvaluated {
        /// Exploration id
        exploration_id: Uuid,
        /// Node id
        node_id: NodeId,
        /// Results
        results: SimulationResults,
        /// Simulation wall-clock seconds
        execution_time_seconds: f64,
    },
    /// Node entered a terminal status
    NodeStatusChanged {
        /// Exploration id
        exploration_id: Uuid,
        /// Node id
        node_id: NodeId,
        /// New status
        status: NodeStatus,
    },
    /// Iteration finished
    IterationCompleted(IterationResult),
    /// Exploration status changed
    StatusChanged {
        /// Exploration id
        exploration_id: Uuid,
        /// New status
        status: ExplorationStatus,
    },
}

/// Receiver of exploration events
///
/// Called from the commit phase; implementations must not block.
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn emit(&self, event: ExplorationEvent);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    #[inline]
    fn emit(&self, _event: ExplorationEvent) {}
}

/// Sink that keeps events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ExplorationEvent>>,
}

impl MemorySink {
    /// Create empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events so far
    #[must_use]
    pub fn events(&self) -> Vec<ExplorationEvent> {
        self.events.lock().clone()
    }

    /// Number of events so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ExplorationEvent) {
        self.events.lock().push(event);
    }
}

/// Sink forwarding events to a tokio channel
///
/// Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ExplorationEvent>,
}

impl ChannelSink {
    /// Create sink and its receiving end
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExplorationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ExplorationEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_event() -> ExplorationEvent {
        ExplorationEvent::StatusChanged {
            exploration_id: Uuid::nil(),
            status: ExplorationStatus::GoalAchieved,
        }
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(status_event());
        sink.emit(ExplorationEvent::NodeStatusChanged {
            exploration_id: Uuid::nil(),
            node_id: NodeId(3),
            status: NodeStatus::Dominated,
        });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], status_event());
    }

    #[tokio::test]
    async fn channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(status_event());
        assert_eq!(rx.recv().await, Some(status_event()));
    }

    #[test]
    fn channel_sink_tolerates_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(status_event());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(status_event()).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["status"], "goal_achieved");
    }
}
