//! C2 — Ingestion Fabric.
//!
//! One poller task per external source, each producing [`Delta`](crate::store::Delta)
//! records consumed by the single-writer [`FleetStore`](crate::store::FleetStore).
//! Mirrors the teacher's `acquisition::SensorSource` trait plus its
//! tokio-task-per-subsystem layout, generalized to five source kinds instead
//! of one WITS stream.

pub mod clearance_source;
pub mod manual;
pub mod maintenance;
pub mod stream_bus;
pub mod telemetry;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config;
use crate::error::IngestionError;
use crate::events::{EventBus, Topic};
use crate::store::{Delta, FleetStore};

/// A bounded drop-oldest buffer: once full, a new push silently evicts the
/// oldest entry (spec §4.2).
pub struct DropOldestQueue<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> DropOldestQueue<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Health of a single ingestion source (spec §4.2: 5 consecutive failures
/// transitions a source to ERROR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHealth {
    Ok,
    Degraded,
    Error,
}

/// Tracks consecutive poll failures for one source, mirroring the teacher's
/// `self_healer` worst-status-wins bookkeeping but scoped to a single source.
pub struct SourceHealthTracker {
    consecutive_failures: AtomicU32,
}

impl Default for SourceHealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceHealthTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Records a failure, returning the health state after this failure.
    pub fn record_failure(&self) -> SourceHealth {
        let n = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        let max = config::get().ingestion.max_consecutive_failures;
        if n >= max {
            SourceHealth::Error
        } else if n >= max / 2 {
            SourceHealth::Degraded
        } else {
            SourceHealth::Ok
        }
    }
}

/// A pollable ingestion source producing normalized deltas. Implementations
/// own whatever transport (HTTP export file, message bus, operator form)
/// feeds them; this trait only describes the polling contract.
#[async_trait]
pub trait IngestionSource: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> i32;
    async fn poll(&mut self) -> Result<Vec<Delta>, IngestionError>;
}

/// Spawn a per-source poller task that feeds deltas into the store, polling
/// at `interval` until `cancel` fires. Mirrors the teacher's
/// `acquisition::start` stub, generalized to any [`IngestionSource`].
pub fn spawn_poller(
    mut source: Box<dyn IngestionSource>,
    store: Arc<FleetStore>,
    events: Arc<EventBus>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let health = SourceHealthTracker::new();
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!(source = source.name(), "ingestion poller cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match source.poll().await {
                        Ok(deltas) => {
                            health.record_success();
                            for delta in deltas {
                                if let Err(err) = store.apply(delta) {
                                    tracing::warn!(source = source.name(), error = %err, "failed to apply ingestion delta");
                                }
                            }
                        }
                        Err(err) => {
                            let state = health.record_failure();
                            tracing::warn!(source = source.name(), error = %err, ?state, "ingestion poll failed");
                            if state == SourceHealth::Error {
                                events.publish(Topic::IngestionSourceError, serde_json::json!({
                                    "source": source.name(),
                                    "error": err.to_string(),
                                }));
                            }
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_oldest_queue_evicts_front() {
        let mut q: DropOldestQueue<i32> = DropOldestQueue::new(3);
        q.push(1);
        q.push(2);
        q.push(3);
        q.push(4);
        assert_eq!(q.len(), 3);
        assert_eq!(q.drain(), vec![2, 3, 4]);
    }

    #[test]
    fn health_tracker_errors_after_five_consecutive_failures() {
        if !config::is_initialized() {
            config::init(config::EngineConfig::default());
        }
        let tracker = SourceHealthTracker::new();
        let mut last = SourceHealth::Ok;
        for _ in 0..5 {
            last = tracker.record_failure();
        }
        assert_eq!(last, SourceHealth::Error);
    }

    #[test]
    fn health_tracker_resets_on_success() {
        if !config::is_initialized() {
            config::init(config::EngineConfig::default());
        }
        let tracker = SourceHealthTracker::new();
        tracker.record_failure();
        tracker.record_failure();
        tracker.record_success();
        assert_eq!(tracker.record_failure(), SourceHealth::Ok);
    }
}
