//! Aggregate plan metrics (spec §4.8), computed as a pure function over a
//! finished plan and the snapshot it was built from so an embedding
//! application can export them however it likes — Prometheus, a log line,
//! an HTTP response — without this crate taking a metrics-exporter
//! dependency (see SPEC_FULL.md §10).

use crate::store::FleetSnapshot;
use crate::types::{InductionPlan, Label, PlanMetrics};

#[must_use]
pub fn compute(plan: &InductionPlan, snapshot: &FleetSnapshot, baseline_moves: u32) -> PlanMetrics {
    let total = snapshot.trainsets.len().max(1) as f64;

    let in_service = plan.decisions.iter().filter(|d| d.label == Label::InService).count() as f64;
    let service_availability = in_service / total;

    let maintenance = plan
        .decisions
        .iter()
        .filter(|d| matches!(d.label, Label::Maintenance | Label::EmergencyRepair))
        .count() as f64;
    let open_maintenance_jobs = snapshot.job_cards.iter().filter(|j| j.open).count() as f64;
    let maintenance_efficiency = if open_maintenance_jobs.abs() < f64::EPSILON {
        1.0
    } else {
        (maintenance / open_maintenance_jobs).min(1.0)
    };

    let actual_moves = plan.moves.len() as f64;
    let energy_savings_pct = if baseline_moves == 0 {
        0.0
    } else {
        ((f64::from(baseline_moves) - actual_moves) / f64::from(baseline_moves) * 100.0).max(0.0)
    };

    let branding_compliance = branding_compliance_ratio(plan, snapshot);

    let conflict_penalty = (plan.conflicts.len() as f64 * 0.02).min(0.3);
    let predicted_punctuality = (service_availability * 0.9 + 0.1 - conflict_penalty).clamp(0.0, 1.0);

    let emergency_count = plan
        .decisions
        .iter()
        .filter(|d| d.label == Label::EmergencyRepair)
        .count() as f64;
    let risk_score = ((emergency_count / total) * 0.6 + (plan.conflicts.len() as f64 / total) * 0.4).clamp(0.0, 1.0);

    let move_energy: f64 = plan.moves.iter().map(|m| m.estimated_energy_kwh).sum();
    let cost_benefit = service_availability * 100.0 - move_energy;

    let confidence = (service_availability * 0.5 + (1.0 - risk_score) * 0.3 + branding_compliance * 0.2).clamp(0.0, 1.0);

    PlanMetrics {
        service_availability,
        maintenance_efficiency,
        energy_savings_pct,
        branding_compliance,
        predicted_punctuality,
        risk_score,
        cost_benefit,
        confidence,
    }
}

fn branding_compliance_ratio(plan: &InductionPlan, snapshot: &FleetSnapshot) -> f64 {
    if snapshot.branding_contracts.is_empty() {
        return 1.0;
    }
    let satisfied = snapshot
        .branding_contracts
        .iter()
        .filter(|b| {
            plan.decision_for(&b.trainset_id)
                .is_some_and(|d| d.label == Label::InService)
        })
        .count() as f64;
    satisfied / snapshot.branding_contracts.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CycleKind, Decision, DecisionState, PlanStatus};
    use chrono::Utc;

    fn empty_plan() -> InductionPlan {
        InductionPlan {
            id: "p1".into(),
            cycle_kind: CycleKind::Nightly,
            generated_at: Utc::now(),
            status: PlanStatus::Completed,
            decisions: Vec::new(),
            moves: Vec::new(),
            conflicts: Vec::new(),
            metrics: None,
        }
    }

    #[test]
    fn empty_fleet_produces_finite_metrics() {
        let plan = empty_plan();
        let snapshot = FleetSnapshot::default();
        let metrics = compute(&plan, &snapshot, 100);
        assert!(metrics.service_availability.is_finite());
        assert!(metrics.confidence.is_finite());
    }

    #[test]
    fn full_in_service_fleet_has_full_availability() {
        let mut plan = empty_plan();
        plan.decisions.push(Decision {
            trainset_id: "t1".into(),
            label: Label::InService,
            bay_id: None,
            state: DecisionState::Placed,
            coefficient: 1.0,
            reasons: Vec::new(),
            conflict_tags: Vec::new(),
            priority: 0,
        });
        let snapshot = FleetSnapshot {
            trainsets: vec![crate::types::Trainset {
                id: "t1".into(),
                status: crate::types::TrainsetStatus::Available,
                mileage_km: 0.0,
                fitness_score: 8.0,
                fitness_expiry: crate::types::FitnessCertificateExpiry {
                    rolling_stock: Utc::now(),
                    signalling: Utc::now(),
                    telecom: Utc::now(),
                },
                last_maintenance: Utc::now(),
                next_maintenance: Utc::now(),
                energy_consumption_kwh: 0.0,
                current_bay: None,
            }],
            ..Default::default()
        };
        let metrics = compute(&plan, &snapshot, 100);
        assert!((metrics.service_availability - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_baseline_moves_does_not_divide_by_zero() {
        let plan = empty_plan();
        let snapshot = FleetSnapshot::default();
        let metrics = compute(&plan, &snapshot, 0);
        assert_eq!(metrics.energy_savings_pct, 0.0);
    }
}
