//! C5 — Constraint Repairer.
//!
//! Takes the ensemble's candidate label assignment and drives it to a fixed
//! point against the hard constraints (spec §4.4): minimum IN_SERVICE count,
//! maximum MAINTENANCE count, forced maintenance for expiring fitness
//! certificates, and the EMERGENCY_REPAIR/EMERGENCY-job-card pairing
//! invariant. Mirrors the teacher's `optimization::optimizer` gate-check
//! style — each pass is a small, named, independently testable function.

use crate::config::ConstraintsConfig;
use crate::error::RepairError;
use crate::store::FleetSnapshot;
use crate::types::{Decision, DecisionState, JobPriority, Label};

use chrono::Utc;

/// One labeled decision prior to bay assignment (C6 fills in `bay_id`).
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDecision {
    pub trainset_id: String,
    pub label: Label,
    pub coefficient: f64,
    /// Integer priority carried through to [`Decision::priority`](crate::types::Decision::priority).
    pub priority: i32,
    /// Ordered textual reasons, appended to as each pass overrides the label.
    pub reasons: Vec<String>,
}

/// Drive `candidate` to a fixed point, returning the repaired decisions or
/// [`RepairError::UnresolvableConstraints`] if no fixed point is reached
/// within the configured iteration cap.
pub fn repair(
    mut decisions: Vec<LabeledDecision>,
    snapshot: &FleetSnapshot,
    config: &ConstraintsConfig,
) -> Result<Vec<LabeledDecision>, RepairError> {
    let now = Utc::now();

    for iteration in 0..config.max_repair_iterations {
        let mut changed = false;

        changed |= force_expiring_fitness_to_maintenance(&mut decisions, snapshot, config, now);
        changed |= force_emergency_repair_pairing(&mut decisions, snapshot);
        changed |= enforce_min_service(&mut decisions, config);
        changed |= enforce_max_maintenance(&mut decisions, config);

        if !changed {
            tracing::debug!(iteration, "constraint repair reached fixed point");
            return Ok(decisions);
        }
    }

    Err(RepairError::UnresolvableConstraints {
        iterations: config.max_repair_iterations,
    })
}

/// Any trainset whose fitness certificate expires within
/// `fitness_expiry_days` is forced to MAINTENANCE, logging the reason.
fn force_expiring_fitness_to_maintenance(
    decisions: &mut [LabeledDecision],
    snapshot: &FleetSnapshot,
    config: &ConstraintsConfig,
    now: chrono::DateTime<Utc>,
) -> bool {
    let mut changed = false;
    for decision in decisions.iter_mut() {
        if let Some(trainset) = snapshot.trainset(&decision.trainset_id) {
            let days_left = trainset.days_until_fitness_expiry(now);
            if days_left <= config.fitness_expiry_days && decision.label != Label::Maintenance {
                tracing::info!(
                    trainset_id = %decision.trainset_id,
                    days_left,
                    "forcing MAINTENANCE: fitness certificate expiring"
                );
                decision.label = Label::Maintenance;
                decision
                    .reasons
                    .push(format!("fitness certificate expires in {days_left} day(s)"));
                changed = true;
            }
        }
    }
    changed
}

/// A trainset with an open EMERGENCY job card must carry EMERGENCY_REPAIR,
/// never plain MAINTENANCE or IN_SERVICE.
fn force_emergency_repair_pairing(decisions: &mut [LabeledDecision], snapshot: &FleetSnapshot) -> bool {
    let mut changed = false;
    for decision in decisions.iter_mut() {
        let has_emergency_job = snapshot
            .open_job_cards(&decision.trainset_id)
            .iter()
            .any(|j| j.priority == JobPriority::Emergency);
        if has_emergency_job && decision.label != Label::EmergencyRepair {
            tracing::warn!(trainset_id = %decision.trainset_id, "forcing EMERGENCY_REPAIR: open emergency job card");
            decision.label = Label::EmergencyRepair;
            decision.reasons.push("open EMERGENCY job card".to_string());
            changed = true;
        } else if !has_emergency_job && decision.label == Label::EmergencyRepair {
            decision.label = Label::Maintenance;
            decision.reasons.push("EMERGENCY job card closed".to_string());
            changed = true;
        }
    }
    changed
}

/// Descending comparator used to rank candidates for promotion/demotion:
/// highest coefficient first, ties broken by `(priority desc, trainset-id
/// asc)` (spec §4.4 ensemble tie-break) so repair order is deterministic
/// regardless of iteration order upstream.
fn tie_break_desc(a: &LabeledDecision, b: &LabeledDecision) -> std::cmp::Ordering {
    b.coefficient
        .partial_cmp(&a.coefficient)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.trainset_id.cmp(&b.trainset_id))
}

/// Promote the highest-coefficient non-IN_SERVICE trainsets until the floor
/// is met.
fn enforce_min_service(decisions: &mut [LabeledDecision], config: &ConstraintsConfig) -> bool {
    let in_service = decisions.iter().filter(|d| d.label == Label::InService).count();
    if in_service >= config.min_service {
        return false;
    }

    let mut candidates: Vec<usize> = (0..decisions.len())
        .filter(|&i| !matches!(decisions[i].label, Label::InService | Label::EmergencyRepair))
        .collect();
    candidates.sort_by(|&a, &b| tie_break_desc(&decisions[a], &decisions[b]));

    let mut need = config.min_service - in_service;
    let mut changed = false;
    for idx in candidates {
        if need == 0 {
            break;
        }
        decisions[idx].label = Label::InService;
        decisions[idx].reasons.push("promoted to meet minimum IN_SERVICE floor".to_string());
        need -= 1;
        changed = true;
    }
    changed
}

/// Demote the lowest-coefficient excess MAINTENANCE trainsets to STANDBY.
fn enforce_max_maintenance(decisions: &mut [LabeledDecision], config: &ConstraintsConfig) -> bool {
    let mut maintenance_idx: Vec<usize> = (0..decisions.len())
        .filter(|&i| decisions[i].label == Label::Maintenance)
        .collect();
    if maintenance_idx.len() <= config.max_maintenance {
        return false;
    }

    maintenance_idx.sort_by(|&a, &b| {
        decisions[a]
            .coefficient
            .partial_cmp(&decisions[b].coefficient)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| decisions[a].priority.cmp(&decisions[b].priority))
            .then_with(|| decisions[a].trainset_id.cmp(&decisions[b].trainset_id))
    });

    let excess = maintenance_idx.len() - config.max_maintenance;
    for &idx in maintenance_idx.iter().take(excess) {
        decisions[idx].label = Label::Standby;
        decisions[idx].reasons.push("demoted to respect maximum MAINTENANCE cap".to_string());
    }
    true
}

#[must_use]
pub fn to_decisions(repaired: Vec<LabeledDecision>) -> Vec<Decision> {
    repaired
        .into_iter()
        .map(|d| {
            let mut reasons = d.reasons;
            if reasons.is_empty() {
                reasons.push("ensemble vote, repaired against constraints".to_string());
            }
            Decision {
                trainset_id: d.trainset_id,
                label: d.label,
                bay_id: None,
                state: DecisionState::Placed,
                coefficient: d.coefficient,
                reasons,
                conflict_tags: Vec::new(),
                priority: d.priority,
            }
        })
        .collect()
}
