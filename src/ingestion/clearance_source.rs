//! Department-clearance transformer: ingests sign-off records from the three
//! departments that gate IN_SERVICE eligibility.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::IngestionError;
use crate::store::{Delta, DeltaField, SourceMeta};
use crate::types::Clearance;

use super::IngestionSource;

pub struct ClearanceSource {
    priority: i32,
    pending: Vec<Clearance>,
}

impl ClearanceSource {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            pending: Vec::new(),
        }
    }

    pub fn enqueue(&mut self, clearances: Vec<Clearance>) {
        self.pending.extend(clearances);
    }
}

#[async_trait]
impl IngestionSource for ClearanceSource {
    fn name(&self) -> &str {
        "department-clearance"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn poll(&mut self) -> Result<Vec<Delta>, IngestionError> {
        let deltas = self
            .pending
            .drain(..)
            .map(|c| Delta {
                trainset_id: c.trainset_id.clone(),
                field: DeltaField::Clearance(c),
                source: SourceMeta {
                    name: "department-clearance".to_string(),
                    priority: self.priority,
                    timestamp: Utc::now(),
                    manual_override_expiry: None,
                },
            })
            .collect();
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Department;

    #[tokio::test]
    async fn poll_emits_one_delta_per_clearance() {
        let mut source = ClearanceSource::new(4);
        let now = Utc::now();
        source.enqueue(vec![Clearance {
            trainset_id: "t1".into(),
            department: Department::Signalling,
            cleared: true,
            issued_at: now,
            expires_at: now + chrono::Duration::days(1),
        }]);
        let deltas = source.poll().await.unwrap();
        assert_eq!(deltas.len(), 1);
    }
}
