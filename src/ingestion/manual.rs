//! Manual-override transformer: an operator-submitted correction, the only
//! source kind that requires an `authorized_by` field (spec §4.2).

use async_trait::async_trait;
use chrono::Utc;

use crate::error::IngestionError;
use crate::store::{Delta, DeltaField, SourceMeta};
use crate::types::TrainsetStatus;

use super::IngestionSource;

#[derive(Debug, Clone)]
pub struct ManualOverride {
    pub trainset_id: String,
    pub status: TrainsetStatus,
    pub authorized_by: Option<String>,
    /// How long this override outranks later automatic writes to the same
    /// field (spec §4.2).
    pub expiry: chrono::DateTime<Utc>,
}

pub struct ManualOverrideSource {
    priority: i32,
    pending: Vec<ManualOverride>,
}

impl ManualOverrideSource {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            pending: Vec::new(),
        }
    }

    pub fn submit(&mut self, override_: ManualOverride) {
        self.pending.push(override_);
    }
}

#[async_trait]
impl IngestionSource for ManualOverrideSource {
    fn name(&self) -> &str {
        "manual-override"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn poll(&mut self) -> Result<Vec<Delta>, IngestionError> {
        let mut deltas = Vec::new();
        for entry in self.pending.drain(..) {
            if entry.authorized_by.is_none() {
                return Err(IngestionError::UnauthorizedOverride);
            }
            deltas.push(Delta {
                trainset_id: entry.trainset_id.clone(),
                field: DeltaField::Status(entry.status),
                source: SourceMeta {
                    name: "manual-override".to_string(),
                    priority: self.priority,
                    timestamp: Utc::now(),
                    manual_override_expiry: Some(entry.expiry),
                },
            });
        }
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn override_without_authorization_is_rejected() {
        let mut source = ManualOverrideSource::new(10);
        source.submit(ManualOverride {
            trainset_id: "t1".into(),
            status: TrainsetStatus::OutOfOrder,
            authorized_by: None,
            expiry: Utc::now() + chrono::Duration::hours(8),
        });
        let result = source.poll().await;
        assert!(matches!(result, Err(IngestionError::UnauthorizedOverride)));
    }

    #[tokio::test]
    async fn authorized_override_produces_delta() {
        let mut source = ManualOverrideSource::new(10);
        source.submit(ManualOverride {
            trainset_id: "t1".into(),
            status: TrainsetStatus::OutOfOrder,
            authorized_by: Some("ops-lead".into()),
            expiry: Utc::now() + chrono::Duration::hours(8),
        });
        let deltas = source.poll().await.unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].source.manual_override_expiry.is_some());
    }
}
