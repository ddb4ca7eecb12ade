//! C8 — Event Broadcaster.
//!
//! A typed topic bus over `tokio::sync::broadcast`, generalizing the
//! teacher's implicit advisory-consumption point (Phase 10 of
//! `PipelineCoordinator`) into the explicit pub/sub the spec's Design Notes
//! call for.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    PlanStarted,
    PlanProgress,
    PlanCompleted,
    PlanFailed,
    AlertCritical,
    AlertWarning,
    IngestionConflict,
    IngestionSourceError,
}

impl Topic {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::PlanStarted => "plan.started",
            Topic::PlanProgress => "plan.progress",
            Topic::PlanCompleted => "plan.completed",
            Topic::PlanFailed => "plan.failed",
            Topic::AlertCritical => "alert.critical",
            Topic::AlertWarning => "alert.warning",
            Topic::IngestionConflict => "ingestion.conflict",
            Topic::IngestionSourceError => "ingestion.source.error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub topic: &'static str,
    pub payload: serde_json::Value,
}

/// Default channel capacity; slow subscribers that fall behind this many
/// events observe a `Lagged` error on their next `recv`, matching
/// `tokio::sync::broadcast`'s normal backpressure behavior.
const CHANNEL_CAPACITY: usize = 1024;

/// Process-wide pub/sub bus. One `broadcast::Sender` per topic so a
/// subscriber to `alert.critical` is never woken by `plan.progress` traffic.
pub struct EventBus {
    senders: std::collections::HashMap<&'static str, broadcast::Sender<Event>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let topics = [
            Topic::PlanStarted,
            Topic::PlanProgress,
            Topic::PlanCompleted,
            Topic::PlanFailed,
            Topic::AlertCritical,
            Topic::AlertWarning,
            Topic::IngestionConflict,
            Topic::IngestionSourceError,
        ];
        let senders = topics
            .into_iter()
            .map(|t| (t.as_str(), broadcast::channel(CHANNEL_CAPACITY).0))
            .collect();
        Self { senders }
    }

    pub fn publish(&self, topic: Topic, payload: serde_json::Value) {
        if let Some(sender) = self.senders.get(topic.as_str()) {
            // No active subscribers is not an error; broadcast::send returns
            // Err only when the receiver count is zero.
            let _ = sender.send(Event {
                topic: topic.as_str(),
                payload,
            });
        }
    }

    #[must_use]
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.senders
            .get(topic.as_str())
            .expect("all topics are registered at construction")
            .subscribe()
    }
}
