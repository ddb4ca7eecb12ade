//! Conflicts raised when two ingestion deltas for the same trainset field
//! land within the conflict window (spec §4.1/§4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One source's contending write for the field a [`Conflict`] covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContendingValue {
    pub source_id: String,
    pub value: String,
    pub priority: i32,
    pub timestamp: DateTime<Utc>,
}

/// How a [`Conflict`] was (or has yet to be) settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionKind {
    Pending,
    AutoPriority,
    AutoTimestamp,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    pub trainset_id: String,
    /// Dotted path of the field the contending writes targeted, e.g.
    /// `"fitness_expiry:ROLLING_STOCK"` or `"job_card:J-42"`.
    pub field_path: String,
    /// Every contending write observed within the conflict window, oldest first.
    pub contending_values: Vec<ContendingValue>,
    pub resolution: ResolutionKind,
    /// The value the store actually applied, once `resolution` leaves `PENDING`.
    pub resolved_value: Option<String>,
    pub timestamp: DateTime<Utc>,
}
