//! Stream-bus transformer: consumes real-time status events from an
//! operational message bus (e.g. a signalling system heartbeat) and maps
//! them onto trainset status deltas.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IngestionError;
use crate::store::{Delta, DeltaField, SourceMeta};
use crate::types::TrainsetStatus;

use super::IngestionSource;

#[derive(Debug, Clone)]
pub struct StreamBusEvent {
    pub trainset_id: String,
    pub status: TrainsetStatus,
    pub observed_at: DateTime<Utc>,
}

pub struct StreamBusSource {
    priority: i32,
    pending: Vec<StreamBusEvent>,
}

impl StreamBusSource {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            pending: Vec::new(),
        }
    }

    pub fn enqueue(&mut self, events: Vec<StreamBusEvent>) {
        self.pending.extend(events);
    }
}

#[async_trait]
impl IngestionSource for StreamBusSource {
    fn name(&self) -> &str {
        "stream-bus"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn poll(&mut self) -> Result<Vec<Delta>, IngestionError> {
        let deltas = self
            .pending
            .drain(..)
            .map(|evt| Delta {
                trainset_id: evt.trainset_id.clone(),
                field: DeltaField::Status(evt.status),
                source: SourceMeta {
                    name: "stream-bus".to_string(),
                    priority: self.priority,
                    timestamp: evt.observed_at,
                    manual_override_expiry: None,
                },
            })
            .collect();
        Ok(deltas)
    }
}
