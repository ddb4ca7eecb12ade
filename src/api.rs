//! Planning API facade (spec §6), exposed as plain Rust traits/structs since
//! the HTTP/REST surface is explicitly out of scope (see SPEC_FULL.md §1).
//! An embedding application wires this the way the teacher's `fleet-hub`
//! binary wires `sairen_os`'s pipeline types into its own axum routes.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::cycle::CycleController;
use crate::error::InductionError;
use crate::events::{Event, EventBus, Topic};
use crate::scenario::{self, FeedbackLog, FeedbackRecord, ScenarioPatch};
use crate::store::FleetStore;
use crate::types::{CycleKind, Decision, InductionPlan, Label};

/// Top-level handle an embedding application holds: the fleet store, event
/// bus, cycle controller, and feedback log bundled together.
pub struct PlanningApi {
    store: Arc<FleetStore>,
    events: Arc<EventBus>,
    controller: CycleController,
    feedback: FeedbackLog,
}

impl PlanningApi {
    #[must_use]
    pub fn new(store: Arc<FleetStore>, events: Arc<EventBus>) -> Self {
        let controller = CycleController::new(store.clone(), events.clone());
        Self {
            store,
            events,
            controller,
            feedback: FeedbackLog::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &FleetStore {
        &self.store
    }

    /// Run the scheduled nightly induction cycle.
    pub async fn run_nightly_induction(&self, config: &EngineConfig, seed: u64) -> Result<InductionPlan, InductionError> {
        self.controller.run_cycle(CycleKind::Nightly, config, seed).await
    }

    /// Trigger an out-of-band real-time cycle (e.g. after a major disruption).
    pub async fn trigger_realtime_cycle(&self, config: &EngineConfig, seed: u64) -> Result<InductionPlan, InductionError> {
        self.controller.run_cycle(CycleKind::Realtime, config, seed).await
    }

    #[must_use]
    pub fn get_current_plan(&self) -> Option<InductionPlan> {
        self.controller.current_plan()
    }

    /// Cancel whichever cycle is currently in flight, if any.
    pub fn cancel_current_cycle(&self) {
        self.controller.cancel();
    }

    /// Replay the current snapshot with a patch applied, without touching
    /// live state or publishing events.
    pub async fn simulate_scenario(
        &self,
        patch: ScenarioPatch,
        config: &EngineConfig,
        seed: u64,
    ) -> Result<InductionPlan, InductionError> {
        scenario::simulate(&self.store, patch, config, seed).await
    }

    /// Record what actually happened against a prior prediction, for later
    /// offline analysis. Never mutates solver weights.
    pub fn submit_feedback(&self, record: FeedbackRecord) {
        self.feedback.append(record);
    }

    #[must_use]
    pub fn feedback_history(&self) -> Vec<FeedbackRecord> {
        self.feedback.list()
    }

    /// Submit a manually-authored decision override against the current
    /// plan (spec §6 `SubmitManualDecision`). Requires a non-empty
    /// `authorized_by`, failing with [`InductionError::Unauthorized`]
    /// otherwise.
    pub fn submit_manual_decision(
        &self,
        plan_id: &str,
        trainset_id: &str,
        new_label: Label,
        authorized_by: Option<&str>,
    ) -> Result<Decision, InductionError> {
        let authorized_by = authorized_by.filter(|s| !s.is_empty()).ok_or_else(|| {
            InductionError::Unauthorized("manual decision override requires an authorized_by".to_string())
        })?;
        self.controller.submit_manual_decision(plan_id, trainset_id, new_label, authorized_by)
    }

    #[must_use]
    pub fn subscribe_events(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.events.subscribe(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn ensure_config() {
        if !config::is_initialized() {
            config::init(config::EngineConfig::default());
        }
    }

    #[tokio::test]
    async fn nightly_cycle_on_empty_fleet_produces_empty_plan() {
        ensure_config();
        let store = Arc::new(FleetStore::new());
        let events = Arc::new(EventBus::new());
        let api = PlanningApi::new(store, events);
        let config = config::EngineConfig::default();
        let plan = api.run_nightly_induction(&config, 1).await.unwrap();
        assert!(plan.decisions.is_empty());
    }

    #[tokio::test]
    async fn concurrent_nightly_cycles_reject_the_second() {
        ensure_config();
        let store = Arc::new(FleetStore::new());
        let events = Arc::new(EventBus::new());
        let api = Arc::new(PlanningApi::new(store, events));
        let config = Arc::new(config::EngineConfig::default());

        let api_a = api.clone();
        let config_a = config.clone();
        let handle = tokio::spawn(async move { api_a.run_nightly_induction(&config_a, 1).await });

        let second = api.run_nightly_induction(&config, 2).await;
        let first = handle.await.unwrap();

        let results = [first, second];
        let in_flight_rejections = results
            .iter()
            .filter(|r| matches!(r, Err(InductionError::CycleInFlight)))
            .count();
        assert!(in_flight_rejections <= 1);
    }

    #[tokio::test]
    async fn manual_decision_without_authorization_is_rejected() {
        ensure_config();
        let store = Arc::new(FleetStore::new());
        let events = Arc::new(EventBus::new());
        let api = PlanningApi::new(store, events);
        let config = config::EngineConfig::default();
        let plan = api.run_nightly_induction(&config, 1).await.unwrap();

        let result = api.submit_manual_decision(&plan.id, "t1", crate::types::Label::Maintenance, None);
        assert!(matches!(result, Err(InductionError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn manual_decision_against_unknown_plan_is_not_found() {
        ensure_config();
        let store = Arc::new(FleetStore::new());
        let events = Arc::new(EventBus::new());
        let api = PlanningApi::new(store, events);
        let _ = api.run_nightly_induction(&config::EngineConfig::default(), 1).await.unwrap();

        let result = api.submit_manual_decision("no-such-plan", "t1", crate::types::Label::Maintenance, Some("ops-lead"));
        assert!(matches!(result, Err(InductionError::NotFound(_))));
    }
}
