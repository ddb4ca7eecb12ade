//! C3 — Feature & Scoring Layer.
//!
//! Computes the deterministic ranking coefficient each solver in C4 treats
//! as ground truth (spec §4.3). Scoring itself never consults the RNG —
//! only the GA/SA search in C4 does — so results here are reproducible
//! given the same snapshot.

use chrono::Utc;

use crate::store::FleetSnapshot;
use crate::types::{fleet::priority_weight, is_fully_cleared, Trainset};

/// Hard floor applied to any trainset that is not fully departmentally
/// cleared, overriding whatever the weighted terms compute (spec §4.3).
pub const UNCLEARED_COEFFICIENT: f64 = -10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTrainset {
    pub trainset_id: String,
    pub coefficient: f64,
    pub cleared: bool,
    /// `daysToExpiry < 7` (spec §4.4 LP constraint 3).
    pub near_expiry: bool,
    /// Carries an open EMERGENCY job card (spec §4.4 LP's EMERGENCY_REPAIR branch).
    pub has_emergency_job: bool,
}

/// `c = 0.25*fitness + 0.20*(1-|mileage-mean|/mean) - 0.30*priorityWeight(openJobs)
///     + 0.15*max(0,1-exposure/target) + 0.10*(1-energy/1000)`
///
/// `fitness` is the trainset's own `[0,10]` fitness score (spec §3),
/// normalized to `[0,1]`.
#[must_use]
pub fn score_trainset(
    trainset: &Trainset,
    snapshot: &FleetSnapshot,
    mean_mileage: f64,
) -> ScoredTrainset {
    let now = Utc::now();
    let cleared = is_fully_cleared(&snapshot.clearances, &trainset.id, now);

    let open_jobs = snapshot.open_job_cards(&trainset.id);
    let has_emergency_job = open_jobs.iter().any(|j| j.priority == crate::types::JobPriority::Emergency);
    let near_expiry = trainset.days_until_fitness_expiry(now) < 7;

    if !cleared {
        return ScoredTrainset {
            trainset_id: trainset.id.clone(),
            coefficient: UNCLEARED_COEFFICIENT,
            cleared: false,
            near_expiry,
            has_emergency_job,
        };
    }

    let fitness = (trainset.fitness_score / 10.0).clamp(0.0, 1.0);

    let mileage_term = if mean_mileage.abs() < f64::EPSILON {
        // spec §8 boundary case: meanMileage == 0 guards against division by zero.
        1.0
    } else {
        (1.0 - (trainset.mileage_km - mean_mileage).abs() / mean_mileage).clamp(-1.0, 1.0)
    };

    let priority_term = priority_weight(&open_jobs);

    let branding_term = snapshot
        .branding_contracts
        .iter()
        .filter(|b| b.trainset_id == trainset.id)
        .map(|b| {
            if b.exposure_hours_target.abs() < f64::EPSILON {
                0.0
            } else {
                (1.0 - b.exposure_hours_actual / b.exposure_hours_target).max(0.0)
            }
        })
        .fold(0.0_f64, f64::max);

    let energy_term = (1.0 - trainset.energy_consumption_kwh / 1000.0).clamp(-1.0, 1.0);

    let coefficient = 0.25 * fitness + 0.20 * mileage_term - 0.30 * priority_term
        + 0.15 * branding_term
        + 0.10 * energy_term;

    ScoredTrainset {
        trainset_id: trainset.id.clone(),
        coefficient,
        cleared: true,
        near_expiry,
        has_emergency_job,
    }
}

/// Score every trainset in the snapshot, guarding the mean-mileage term
/// against an empty or all-zero fleet.
#[must_use]
pub fn score_fleet(snapshot: &FleetSnapshot) -> Vec<ScoredTrainset> {
    let mean_mileage = if snapshot.trainsets.is_empty() {
        0.0
    } else {
        snapshot.trainsets.iter().map(|t| t.mileage_km).sum::<f64>() / snapshot.trainsets.len() as f64
    };

    snapshot
        .trainsets
        .iter()
        .map(|t| score_trainset(t, snapshot, mean_mileage))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Clearance, Department, FitnessCertificateExpiry, TrainsetStatus};
    use chrono::{DateTime, Duration};

    fn expiry_in(now: DateTime<Utc>, days: i64) -> FitnessCertificateExpiry {
        let at = now + Duration::days(days);
        FitnessCertificateExpiry {
            rolling_stock: at,
            signalling: at,
            telecom: at,
        }
    }

    fn cleared_trainset(id: &str, mileage: f64) -> (Trainset, Vec<Clearance>) {
        let now = Utc::now();
        let trainset = Trainset {
            id: id.to_string(),
            status: TrainsetStatus::Available,
            mileage_km: mileage,
            fitness_score: 7.5,
            fitness_expiry: expiry_in(now, 45),
            last_maintenance: now - Duration::days(30),
            next_maintenance: now + Duration::days(60),
            energy_consumption_kwh: 400.0,
            current_bay: None,
        };
        let clearances = [Department::Rollingstock, Department::Signalling, Department::Telecom]
            .into_iter()
            .map(|dept| Clearance {
                trainset_id: id.to_string(),
                department: dept,
                cleared: true,
                issued_at: now,
                expires_at: now + Duration::days(1),
            })
            .collect();
        (trainset, clearances)
    }

    #[test]
    fn uncleared_trainset_gets_hard_floor() {
        let now = Utc::now();
        let trainset = Trainset {
            id: "t1".into(),
            status: TrainsetStatus::Available,
            mileage_km: 1000.0,
            fitness_score: 7.5,
            fitness_expiry: expiry_in(now, 10),
            last_maintenance: now - Duration::days(30),
            next_maintenance: now + Duration::days(60),
            energy_consumption_kwh: 100.0,
            current_bay: None,
        };
        let snapshot = FleetSnapshot {
            trainsets: vec![trainset.clone()],
            clearances: Vec::new(),
            ..Default::default()
        };
        let scored = score_trainset(&trainset, &snapshot, 1000.0);
        assert_eq!(scored.coefficient, UNCLEARED_COEFFICIENT);
        assert!(!scored.cleared);
    }

    #[test]
    fn zero_mean_mileage_does_not_divide_by_zero() {
        let (trainset, clearances) = cleared_trainset("t1", 0.0);
        let snapshot = FleetSnapshot {
            trainsets: vec![trainset.clone()],
            clearances,
            ..Default::default()
        };
        let scored = score_trainset(&trainset, &snapshot, 0.0);
        assert!(scored.coefficient.is_finite());
    }

    #[test]
    fn more_open_emergency_jobs_lowers_coefficient() {
        let (trainset, clearances) = cleared_trainset("t1", 1000.0);
        let mut snapshot = FleetSnapshot {
            trainsets: vec![trainset.clone()],
            clearances,
            ..Default::default()
        };
        let baseline = score_trainset(&trainset, &snapshot, 1000.0);

        snapshot.job_cards.push(crate::types::JobCard {
            id: "j1".into(),
            trainset_id: "t1".into(),
            priority: crate::types::JobPriority::Emergency,
            description: "brake".into(),
            open: true,
            created_at: Utc::now(),
            due_at: None,
        });
        let with_job = score_trainset(&trainset, &snapshot, 1000.0);
        assert!(with_job.coefficient < baseline.coefficient);
    }
}
