//! Trainset, job-card, and branding-contract entities (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational status of a physical trainset, independent of tonight's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainsetStatus {
    Available,
    InService,
    Maintenance,
    Cleaning,
    OutOfOrder,
    Decommissioned,
}

/// Per-department fitness-certificate expiry (spec §3): rolling-stock,
/// signalling, and telecom each issue and lapse their own certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessCertificateExpiry {
    pub rolling_stock: DateTime<Utc>,
    pub signalling: DateTime<Utc>,
    pub telecom: DateTime<Utc>,
}

impl FitnessCertificateExpiry {
    /// The soonest of the three certificates to lapse — the one that drives
    /// the C5 forced-maintenance rule.
    #[must_use]
    pub fn earliest(&self) -> DateTime<Utc> {
        self.rolling_stock.min(self.signalling).min(self.telecom)
    }
}

/// A physical trainset tracked by the fleet state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trainset {
    pub id: String,
    pub status: TrainsetStatus,
    pub mileage_km: f64,
    /// Composite fitness score in `[0,10]` fed directly into C3 scoring.
    pub fitness_score: f64,
    /// When each department's fitness certificate lapses; the earliest one
    /// forces maintenance inside
    /// [`REPAIR_FITNESS_EXPIRY_DAYS`](crate::config::defaults::REPAIR_FITNESS_EXPIRY_DAYS).
    pub fitness_expiry: FitnessCertificateExpiry,
    pub last_maintenance: DateTime<Utc>,
    pub next_maintenance: DateTime<Utc>,
    pub energy_consumption_kwh: f64,
    pub current_bay: Option<String>,
}

impl Trainset {
    #[must_use]
    pub fn days_until_fitness_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.fitness_expiry.earliest() - now).num_days()
    }
}

/// Maintenance job-card priority, ordered EMERGENCY > HIGH > MEDIUM > LOW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPriority {
    Low = 0,
    Medium = 1,
    High = 2,
    Emergency = 3,
}

impl JobPriority {
    /// `priorityWeight` (spec §4.3): `{EMERGENCY:4, HIGH:3, MEDIUM:2, LOW:1}`.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            JobPriority::Emergency => 4.0,
            JobPriority::High => 3.0,
            JobPriority::Medium => 2.0,
            JobPriority::Low => 1.0,
        }
    }

    /// The integer priority carried onto a [`super::decision::Decision`] and
    /// used by the ensemble tie-break (spec §4.4: `(priority desc, id asc)`).
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self.weight() as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCard {
    pub id: String,
    pub trainset_id: String,
    pub priority: JobPriority,
    pub description: String,
    pub open: bool,
    pub created_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
}

/// Sum of `priority.weight()` across a trainset's open job cards, used by the
/// C3 scoring formula's `priorityWeight(openJobs)` term.
#[must_use]
pub fn priority_weight(open_jobs: &[JobCard]) -> f64 {
    open_jobs
        .iter()
        .filter(|j| j.open)
        .map(|j| j.priority.weight())
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandingContract {
    pub id: String,
    pub trainset_id: String,
    pub advertiser: String,
    pub exposure_hours_target: f64,
    pub exposure_hours_actual: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl BrandingContract {
    /// Remaining exposure hours still owed against the target, floored at 0.
    #[must_use]
    pub fn remaining_exposure(&self) -> f64 {
        (self.exposure_hours_target - self.exposure_hours_actual).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_is_emergency_high() {
        assert!(JobPriority::Emergency > JobPriority::High);
        assert!(JobPriority::High > JobPriority::Medium);
        assert!(JobPriority::Medium > JobPriority::Low);
    }

    #[test]
    fn priority_weight_sums_only_open_cards() {
        let cards = vec![
            JobCard {
                id: "j1".into(),
                trainset_id: "t1".into(),
                priority: JobPriority::Emergency,
                description: "brake".into(),
                open: true,
                created_at: Utc::now(),
                due_at: None,
            },
            JobCard {
                id: "j2".into(),
                trainset_id: "t1".into(),
                priority: JobPriority::High,
                description: "closed already".into(),
                open: false,
                created_at: Utc::now(),
                due_at: None,
            },
        ];
        assert!((priority_weight(&cards) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn remaining_exposure_floors_at_zero() {
        let contract = BrandingContract {
            id: "b1".into(),
            trainset_id: "t1".into(),
            advertiser: "acme".into(),
            exposure_hours_target: 10.0,
            exposure_hours_actual: 15.0,
            window_start: Utc::now(),
            window_end: Utc::now(),
        };
        assert_eq!(contract.remaining_exposure(), 0.0);
    }
}
