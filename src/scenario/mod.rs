//! C9 — Scenario & Feedback.
//!
//! Supports "what-if" replays of a snapshot with a patch applied, without
//! publishing events or mutating the live store (spec §4.9), plus an
//! append-only log of `{plan, actual, outcomeMetrics}` triples used to
//! compare predictions against what really happened — explicitly with no
//! live weight mutation, mirroring the teacher's append-only
//! `fleet::queue::UploadQueue` durability pattern but for feedback records
//! instead of outbound uploads.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::cycle::CycleController;
use crate::error::InductionError;
use crate::events::EventBus;
use crate::store::{Delta, FleetSnapshot, FleetStore};
use crate::types::{CycleKind, Decision, InductionPlan, PlanMetrics};
use std::sync::Arc;

/// A patch applied to a cloned snapshot before replaying it through the
/// pipeline; never touches the live [`FleetStore`].
#[derive(Debug, Clone, Default)]
pub struct ScenarioPatch {
    pub deltas: Vec<Delta>,
}

/// Run the full induction pipeline against a patched clone of the current
/// snapshot, discarding the scratch store afterward. No events are
/// published to the process-wide bus for a scenario replay.
pub async fn simulate(
    live_store: &FleetStore,
    patch: ScenarioPatch,
    config: &EngineConfig,
    seed: u64,
) -> Result<InductionPlan, InductionError> {
    let snapshot: FleetSnapshot = live_store.snapshot();
    let scratch_store = Arc::new(FleetStore::new());
    scratch_store.seed(snapshot.trainsets.clone(), snapshot.bays.clone());

    for delta in patch.deltas {
        let _ = scratch_store.apply(delta);
    }

    // Scenario replays get their own silent event bus so nothing leaks onto
    // the live topic bus; a real embedding application discards it.
    let scratch_events = Arc::new(EventBus::new());
    let controller = CycleController::new(scratch_store, scratch_events);
    controller.run_cycle(CycleKind::Scenario, config, seed).await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub plan_id: String,
    pub recorded_at: chrono::DateTime<Utc>,
    pub predicted_decisions: Vec<Decision>,
    pub actual_decisions: Vec<Decision>,
    pub outcome_metrics: PlanMetrics,
}

/// Append-only feedback log. Mirrors `PersistenceLayer`'s append/list shape
/// from the teacher but is intentionally write-mostly: nothing here ever
/// feeds back into solver weights at runtime (spec §4.9 Non-goal: no
/// online learning).
#[derive(Default)]
pub struct FeedbackLog {
    records: std::sync::RwLock<Vec<FeedbackRecord>>,
}

impl FeedbackLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: FeedbackRecord) {
        self.records.write().unwrap_or_else(|e| e.into_inner()).push(record);
    }

    #[must_use]
    pub fn list(&self) -> Vec<FeedbackRecord> {
        self.records.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::store::{DeltaField, SourceMeta};
    use crate::types::{FitnessCertificateExpiry, Trainset, TrainsetStatus};

    fn ensure_config() {
        if !config::is_initialized() {
            config::init(config::EngineConfig::default());
        }
    }

    #[tokio::test]
    async fn simulate_does_not_mutate_live_store() {
        ensure_config();
        let store = FleetStore::new();
        let expiry = Utc::now() + chrono::Duration::days(90);
        store.seed(
            vec![Trainset {
                id: "t1".into(),
                status: TrainsetStatus::Available,
                mileage_km: 1000.0,
                fitness_score: 8.0,
                fitness_expiry: FitnessCertificateExpiry {
                    rolling_stock: expiry,
                    signalling: expiry,
                    telecom: expiry,
                },
                last_maintenance: Utc::now() - chrono::Duration::days(30),
                next_maintenance: Utc::now() + chrono::Duration::days(30),
                energy_consumption_kwh: 100.0,
                current_bay: None,
            }],
            vec![],
        );

        let patch = ScenarioPatch {
            deltas: vec![Delta {
                trainset_id: "t1".into(),
                field: DeltaField::MileageKm(99_999.0),
                source: SourceMeta {
                    name: "scenario".into(),
                    priority: 1,
                    timestamp: Utc::now(),
                    manual_override_expiry: None,
                },
            }],
        };

        let config = config::EngineConfig::default();
        let _ = simulate(&store, patch, &config, 1).await;

        let live_snapshot = store.snapshot();
        assert_eq!(live_snapshot.trainset("t1").unwrap().mileage_km, 1000.0);
    }

    #[test]
    fn feedback_log_lists_in_insertion_order() {
        let log = FeedbackLog::new();
        for i in 0..3 {
            log.append(FeedbackRecord {
                plan_id: format!("p{i}"),
                recorded_at: Utc::now(),
                predicted_decisions: Vec::new(),
                actual_decisions: Vec::new(),
                outcome_metrics: PlanMetrics {
                    service_availability: 0.0,
                    maintenance_efficiency: 0.0,
                    energy_savings_pct: 0.0,
                    branding_compliance: 0.0,
                    predicted_punctuality: 0.0,
                    risk_score: 0.0,
                    cost_benefit: 0.0,
                    confidence: 0.0,
                },
            });
        }
        let records = log.list();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].plan_id, "p0");
    }
}
