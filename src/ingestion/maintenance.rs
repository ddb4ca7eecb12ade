//! Maintenance-export transformer: turns rows from the maintenance system's
//! nightly export into job-card and mileage/fitness deltas.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IngestionError;
use crate::store::{Delta, DeltaField, SourceMeta};
use crate::types::{Department, JobCard, JobPriority};

use super::IngestionSource;

/// A single row as it appears in the maintenance system's export file.
#[derive(Debug, Clone)]
pub struct MaintenanceExportRow {
    pub trainset_id: String,
    pub job_id: String,
    pub priority: JobPriority,
    pub description: String,
    pub open: bool,
    pub created_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub mileage_km: Option<f64>,
    /// Department whose certificate this row renews, alongside the new
    /// expiry (spec §3's per-department `FitnessCertificateExpiry`).
    pub fitness_expiry: Option<(Department, DateTime<Utc>)>,
}

/// Composite urgency score for a maintenance row: weighted job priority
/// plus a time-pressure term that grows as the due date approaches.
#[must_use]
pub fn maintenance_score(row: &MaintenanceExportRow, now: DateTime<Utc>) -> f64 {
    let priority_term = row.priority.weight();
    let urgency_term = row.due_at.map_or(0.0, |due| {
        let hours_remaining = (due - now).num_minutes() as f64 / 60.0;
        if hours_remaining <= 0.0 {
            1.0
        } else {
            (1.0 / (1.0 + hours_remaining / 24.0)).clamp(0.0, 1.0)
        }
    });
    (0.7 * priority_term + 0.3 * urgency_term).clamp(0.0, 1.0)
}

pub struct MaintenanceExportSource {
    priority: i32,
    rows: Vec<MaintenanceExportRow>,
}

impl MaintenanceExportSource {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            rows: Vec::new(),
        }
    }

    /// Feed the next batch of export rows to be picked up on the next poll.
    pub fn enqueue(&mut self, rows: Vec<MaintenanceExportRow>) {
        self.rows.extend(rows);
    }
}

#[async_trait]
impl IngestionSource for MaintenanceExportSource {
    fn name(&self) -> &str {
        "maintenance-export"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn poll(&mut self) -> Result<Vec<Delta>, IngestionError> {
        let now = Utc::now();
        let mut deltas = Vec::new();
        for row in self.rows.drain(..) {
            let source = SourceMeta {
                name: "maintenance-export".to_string(),
                priority: self.priority,
                timestamp: now,
                manual_override_expiry: None,
            };
            deltas.push(Delta {
                trainset_id: row.trainset_id.clone(),
                field: DeltaField::JobCard(JobCard {
                    id: row.job_id.clone(),
                    trainset_id: row.trainset_id.clone(),
                    priority: row.priority,
                    description: row.description.clone(),
                    open: row.open,
                    created_at: row.created_at,
                    due_at: row.due_at,
                }),
                source: source.clone(),
            });
            if let Some(mileage) = row.mileage_km {
                deltas.push(Delta {
                    trainset_id: row.trainset_id.clone(),
                    field: DeltaField::MileageKm(mileage),
                    source: source.clone(),
                });
            }
            if let Some((department, expires_at)) = row.fitness_expiry {
                deltas.push(Delta {
                    trainset_id: row.trainset_id.clone(),
                    field: DeltaField::FitnessExpiry { department, expires_at },
                    source,
                });
            }
        }
        Ok(deltas)
    }
}
