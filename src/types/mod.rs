//! Core data model (spec §3), split into one module per entity family and
//! re-exported flat, mirroring the teacher's `lib.rs` re-export idiom.

pub mod bay;
pub mod clearance;
pub mod conflict;
pub mod decision;
pub mod fleet;
pub mod sensor;

pub use bay::{Bay, BayType};
pub use clearance::{is_fully_cleared, Clearance, Department};
pub use conflict::{Conflict, ContendingValue, ResolutionKind};
pub use decision::{
    CycleKind, Decision, DecisionState, InductionPlan, Label, MoveType, PlanMetrics, PlanStatus,
    ShuntingMove,
};
pub use fleet::{BrandingContract, FitnessCertificateExpiry, JobCard, JobPriority, Trainset, TrainsetStatus};
pub use sensor::{AnomalyTag, SensorFrame};
