//! The per-trainset induction decision, the stabling moves that realize it,
//! and the plan that bundles both for a single cycle (spec §3/§4.4-§4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tonight's assignment for a trainset, distinct from its physical
/// [`TrainsetStatus`](super::fleet::TrainsetStatus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    InService,
    Standby,
    Maintenance,
    EmergencyRepair,
}

/// Lifecycle state of a single decision as its shunting move executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionState {
    Placed,
    MovePending,
    MoveInProgress,
    MoveDone,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub trainset_id: String,
    pub label: Label,
    pub bay_id: Option<String>,
    pub state: DecisionState,
    /// The C3 scoring coefficient this decision was ranked by.
    pub coefficient: f64,
    /// Ordered textual reasons, earliest-applied first (e.g. ensemble vote,
    /// then each repair pass that subsequently overrode the label).
    pub reasons: Vec<String>,
    /// Ids of any [`super::conflict::Conflict`] records that touched this
    /// trainset during the cycle the decision belongs to.
    pub conflict_tags: Vec<String>,
    /// Integer priority this decision was tie-broken by (spec §4.4:
    /// `(priority desc, trainset-id asc)`), derived from the trainset's
    /// highest open job-card priority.
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveType {
    Direct,
    PullPush,
    Triangle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuntingMove {
    pub id: String,
    pub trainset_id: String,
    pub from_bay: String,
    pub to_bay: String,
    pub move_type: MoveType,
    pub estimated_time_secs: f64,
    pub estimated_energy_kwh: f64,
    /// Other move ids that must complete before this one may start.
    pub depends_on: Vec<String>,
    /// Parallel execution wave this move was scheduled into (0-indexed).
    pub wave: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Started,
    InProgress,
    Completed,
    /// Emitted (not rejected) when confidence falls below 0.5 and the plan
    /// carries explicit conflict tags (spec §7 kind 3 / §8).
    Infeasible,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleKind {
    Nightly,
    Realtime,
    Scenario,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetrics {
    pub service_availability: f64,
    pub maintenance_efficiency: f64,
    pub energy_savings_pct: f64,
    pub branding_compliance: f64,
    pub predicted_punctuality: f64,
    pub risk_score: f64,
    pub cost_benefit: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InductionPlan {
    pub id: String,
    pub cycle_kind: CycleKind,
    pub generated_at: DateTime<Utc>,
    pub status: PlanStatus,
    pub decisions: Vec<Decision>,
    pub moves: Vec<ShuntingMove>,
    pub conflicts: Vec<super::conflict::Conflict>,
    pub metrics: Option<PlanMetrics>,
}

impl InductionPlan {
    #[must_use]
    pub fn decision_for(&self, trainset_id: &str) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.trainset_id == trainset_id)
    }

    #[must_use]
    pub fn in_service_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.label == Label::InService)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(trainset_id: &str, label: Label) -> Decision {
        Decision {
            trainset_id: trainset_id.into(),
            label,
            bay_id: None,
            state: DecisionState::Placed,
            coefficient: 0.0,
            reasons: vec!["test".into()],
            conflict_tags: Vec::new(),
            priority: 0,
        }
    }

    #[test]
    fn decision_for_finds_matching_trainset() {
        let plan = InductionPlan {
            id: "p1".into(),
            cycle_kind: CycleKind::Nightly,
            generated_at: Utc::now(),
            status: PlanStatus::Completed,
            decisions: vec![decision("t1", Label::InService), decision("t2", Label::Standby)],
            moves: Vec::new(),
            conflicts: Vec::new(),
            metrics: None,
        };
        assert_eq!(plan.decision_for("t2").unwrap().label, Label::Standby);
        assert!(plan.decision_for("missing").is_none());
    }

    #[test]
    fn in_service_count_only_counts_in_service_label() {
        let plan = InductionPlan {
            id: "p1".into(),
            cycle_kind: CycleKind::Nightly,
            generated_at: Utc::now(),
            status: PlanStatus::Completed,
            decisions: vec![
                decision("t1", Label::InService),
                decision("t2", Label::InService),
                decision("t3", Label::Maintenance),
            ],
            moves: Vec::new(),
            conflicts: Vec::new(),
            metrics: None,
        };
        assert_eq!(plan.in_service_count(), 2);
    }
}
