//! C7 — Real-Time Cycle Controller.
//!
//! Orchestrates a single induction cycle end to end (C3 -> C4 -> C5 -> C6,
//! with C8 publishing progress throughout), the counterpart of the
//! teacher's `pipeline::coordinator::PipelineCoordinator::process_packet`
//! phase-numbered orchestration. At most one nightly cycle may be in flight
//! at a time; a cancelled cycle leaves the previous current plan untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::InductionError;
use crate::events::{EventBus, Topic};
use tokio_util::sync::CancellationToken;
use crate::repair;
use crate::solver::{self, ensemble::TieBreakContext, SolverInput};
use crate::stabling;
use crate::store::FleetStore;
use crate::types::{CycleKind, Decision, InductionPlan, JobPriority, Label, PlanStatus};

pub struct CycleController {
    store: Arc<FleetStore>,
    events: Arc<EventBus>,
    current_plan: RwLock<Option<InductionPlan>>,
    in_flight: AtomicBool,
    active_cancel: RwLock<Option<CancellationToken>>,
}

impl CycleController {
    #[must_use]
    pub fn new(store: Arc<FleetStore>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            events,
            current_plan: RwLock::new(None),
            in_flight: AtomicBool::new(false),
            active_cancel: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn current_plan(&self) -> Option<InductionPlan> {
        self.current_plan.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Request cancellation of whatever cycle is currently running, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.active_cancel.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            token.cancel();
        }
    }

    /// Apply an operator-authored override to one decision within the named
    /// plan (spec §6 `SubmitManualDecision`). Fails with
    /// [`InductionError::NotFound`] if `plan_id` is not the current plan or
    /// `trainset_id` has no decision in it.
    pub fn submit_manual_decision(
        &self,
        plan_id: &str,
        trainset_id: &str,
        new_label: Label,
        authorized_by: &str,
    ) -> Result<Decision, InductionError> {
        let mut guard = self.current_plan.write().unwrap_or_else(|e| e.into_inner());
        let plan = guard
            .as_mut()
            .filter(|p| p.id == plan_id)
            .ok_or_else(|| InductionError::NotFound(plan_id.to_string()))?;
        let decision = plan
            .decisions
            .iter_mut()
            .find(|d| d.trainset_id == trainset_id)
            .ok_or_else(|| InductionError::NotFound(trainset_id.to_string()))?;
        tracing::info!(plan_id, trainset_id, ?new_label, authorized_by, "manual decision override applied");
        decision.label = new_label;
        decision.reasons.push(format!("manual override by {authorized_by}"));
        Ok(decision.clone())
    }

    /// Run a single cycle to completion. Fails with
    /// [`InductionError::CycleInFlight`] if another cycle is already
    /// running; cooperative cancellation via [`CycleController::cancel`]
    /// leaves the previous [`current_plan`](Self::current_plan) intact.
    pub async fn run_cycle(
        &self,
        kind: CycleKind,
        config: &EngineConfig,
        seed: u64,
    ) -> Result<InductionPlan, InductionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(InductionError::CycleInFlight);
        }

        let plan_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        *self.active_cancel.write().unwrap_or_else(|e| e.into_inner()) = Some(cancel.clone());

        let result = self.run_cycle_inner(&plan_id, kind, config, seed, &cancel).await;

        self.in_flight.store(false, Ordering::SeqCst);
        *self.active_cancel.write().unwrap_or_else(|e| e.into_inner()) = None;

        match result {
            Ok(plan) => {
                *self.current_plan.write().unwrap_or_else(|e| e.into_inner()) = Some(plan.clone());
                Ok(plan)
            }
            Err(err) => {
                self.events.publish(
                    Topic::PlanFailed,
                    serde_json::json!({"plan_id": plan_id, "error": err.to_string()}),
                );
                Err(err)
            }
        }
    }

    async fn run_cycle_inner(
        &self,
        plan_id: &str,
        kind: CycleKind,
        config: &EngineConfig,
        seed: u64,
        cancel: &CancellationToken,
    ) -> Result<InductionPlan, InductionError> {
        tracing::info!(plan_id, ?kind, "cycle started");
        self.events
            .publish(Topic::PlanStarted, serde_json::json!({"plan_id": plan_id}));
        self.publish_progress(plan_id, 10);

        let timeout = std::time::Duration::from_secs(config.cycle.timeout_secs);
        let cycle_future = self.execute_pipeline(plan_id, kind, config, seed, cancel);

        tokio::select! {
            () = cancel.cancelled() => Err(InductionError::Cancelled),
            result = tokio::time::timeout(timeout, cycle_future) => {
                match result {
                    Ok(inner) => inner,
                    Err(_elapsed) => {
                        cancel.cancel();
                        tracing::warn!(plan_id, "cycle exceeded configured timeout, cancelling");
                        Err(InductionError::Cancelled)
                    }
                }
            }
        }
    }

    async fn execute_pipeline(
        &self,
        plan_id: &str,
        kind: CycleKind,
        config: &EngineConfig,
        seed: u64,
        cancel: &CancellationToken,
    ) -> Result<InductionPlan, InductionError> {
        let snapshot = self.store.snapshot();

        let input =
            SolverInput::from_snapshot(&snapshot, config.constraints.min_service, config.constraints.max_maintenance);
        self.publish_progress(plan_id, 40);

        let mut highest_open_priority: HashMap<&str, JobPriority> = HashMap::new();
        for job in snapshot.job_cards.iter().filter(|j| j.open) {
            let entry = highest_open_priority.entry(job.trainset_id.as_str()).or_insert(job.priority);
            if job.priority > *entry {
                *entry = job.priority;
            }
        }
        let tie_break = TieBreakContext {
            highest_open_priority: highest_open_priority.clone(),
        };

        let candidate = solver::ensemble::run_ensemble(&input, config, cancel, seed, &tie_break)
            .map_err(|_| InductionError::Cancelled)?;

        let labeled: Vec<repair::LabeledDecision> = input
            .scores
            .iter()
            .map(|s| repair::LabeledDecision {
                trainset_id: s.trainset_id.clone(),
                label: candidate.get(&s.trainset_id).copied().unwrap_or(crate::types::Label::Standby),
                coefficient: s.coefficient,
                priority: highest_open_priority
                    .get(s.trainset_id.as_str())
                    .copied()
                    .map_or(0, JobPriority::as_i32),
                reasons: Vec::new(),
            })
            .collect();

        let repaired = repair::repair(labeled, &snapshot, &config.constraints)?;
        self.publish_progress(plan_id, 80);

        let conflicts = self.store.conflicts();
        let decisions: Vec<Decision> = repair::to_decisions(repaired)
            .into_iter()
            .map(|mut d| {
                d.conflict_tags = conflicts
                    .iter()
                    .filter(|c| c.trainset_id == d.trainset_id)
                    .map(|c| c.id.clone())
                    .collect();
                d
            })
            .collect();
        let decisions_with_bays = stabling::assign_bays(decisions, &snapshot.bays)?;

        let previous_bay: HashMap<String, String> = snapshot
            .trainsets
            .iter()
            .filter_map(|t| t.current_bay.clone().map(|bay| (t.id.clone(), bay)))
            .collect();
        let mut moves = stabling::build_moves(&decisions_with_bays, &previous_bay);
        let bays_by_id: HashMap<String, crate::types::Bay> =
            snapshot.bays.iter().map(|b| (b.id.clone(), b.clone())).collect();
        stabling::classify_and_cost(&mut moves, &bays_by_id);
        let moves = stabling::sequence_moves(moves, config.stabling.max_simultaneous_moves)?;

        let mut plan = InductionPlan {
            id: plan_id.to_string(),
            cycle_kind: kind,
            generated_at: Utc::now(),
            status: PlanStatus::Completed,
            decisions: decisions_with_bays,
            moves,
            conflicts,
            metrics: None,
        };
        let metrics = crate::metrics::compute(&plan, &snapshot, config.stabling.baseline_moves);
        let has_conflict_tags = plan.decisions.iter().any(|d| !d.conflict_tags.is_empty());
        if metrics.confidence < 0.5 && has_conflict_tags {
            plan.status = PlanStatus::Infeasible;
            tracing::warn!(plan_id, confidence = metrics.confidence, "plan marked INFEASIBLE: low confidence with open conflicts");
        }
        plan.metrics = Some(metrics);

        self.publish_progress(plan_id, 100);
        self.events.publish(
            Topic::PlanCompleted,
            serde_json::json!({"plan_id": plan_id, "decisions": plan.decisions.len()}),
        );
        tracing::info!(plan_id, decisions = plan.decisions.len(), moves = plan.moves.len(), "cycle completed");

        Ok(plan)
    }

    fn publish_progress(&self, plan_id: &str, pct: u8) {
        self.events.publish(
            Topic::PlanProgress,
            serde_json::json!({"plan_id": plan_id, "progress": pct}),
        );
    }
}
