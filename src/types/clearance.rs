//! Department clearance records (spec §3/§4.2) — a trainset is only
//! eligible for IN_SERVICE if every department that must sign off has
//! issued an unexpired clearance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Rollingstock,
    Signalling,
    Telecom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clearance {
    pub trainset_id: String,
    pub department: Department,
    pub cleared: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Clearance {
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.cleared && self.expires_at > now
    }
}

/// All three departments must have issued a currently-valid clearance for a
/// trainset before it can receive the IN_SERVICE label (spec §4.3 hard
/// demotion rule).
#[must_use]
pub fn is_fully_cleared(clearances: &[Clearance], trainset_id: &str, now: DateTime<Utc>) -> bool {
    const REQUIRED: [Department; 3] = [
        Department::Rollingstock,
        Department::Signalling,
        Department::Telecom,
    ];
    REQUIRED.iter().all(|dept| {
        clearances
            .iter()
            .any(|c| c.trainset_id == trainset_id && c.department == *dept && c.is_valid(now))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn clearance(dept: Department, cleared: bool, expires_in_hours: i64) -> Clearance {
        let now = Utc::now();
        Clearance {
            trainset_id: "t1".into(),
            department: dept,
            cleared,
            issued_at: now - Duration::hours(1),
            expires_at: now + Duration::hours(expires_in_hours),
        }
    }

    #[test]
    fn fully_cleared_requires_all_three_departments() {
        let now = Utc::now();
        let clearances = vec![
            clearance(Department::Rollingstock, true, 1),
            clearance(Department::Signalling, true, 1),
        ];
        assert!(!is_fully_cleared(&clearances, "t1", now));

        let mut full = clearances;
        full.push(clearance(Department::Telecom, true, 1));
        assert!(is_fully_cleared(&full, "t1", now));
    }

    #[test]
    fn expired_clearance_does_not_count() {
        let now = Utc::now();
        let clearances = vec![
            clearance(Department::Rollingstock, true, -1),
            clearance(Department::Signalling, true, 1),
            clearance(Department::Telecom, true, 1),
        ];
        assert!(!is_fully_cleared(&clearances, "t1", now));
    }
}
