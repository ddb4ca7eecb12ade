//! Error kinds surfaced across the induction pipeline.
//!
//! Mirrors the teacher's per-component `thiserror` enums (`AcquisitionError`,
//! `QueueError`, `PersistenceError`) plus one boundary error aggregating the
//! kinds the Planning API (spec §6/§7) is allowed to surface to callers.

use thiserror::Error;

/// Errors raised while merging an ingestion delta into the fleet store (C1/C2).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("two bays both reference trainset {trainset}")]
    DuplicateBayAssignment { trainset: String },

    #[error("unknown bay status transition: {status}")]
    InvalidStatus { status: String },

    #[error("trainset {0} not found in fleet store")]
    UnknownTrainset(String),

    #[error("bay {0} not found")]
    UnknownBay(String),
}

/// Errors raised while ingesting or normalizing a source record (C2).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestionError {
    #[error("malformed record from source {source}: {reason}")]
    Validation { source: String, reason: String },

    #[error("manual override missing authorizedBy")]
    UnauthorizedOverride,

    #[error("source {0} marked ERROR after 5 consecutive failures")]
    SourceOutage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by an individual solver within the ensemble (C4).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("solver cancelled before convergence")]
    Cancelled,

    #[error("numeric instability in {solver}: {reason}")]
    InfeasibleStep { solver: String, reason: String },
}

/// Errors raised while repairing constraints (C5).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepairError {
    #[error("constraints did not reach a fixed point within {iterations} iterations")]
    UnresolvableConstraints { iterations: u32 },
}

/// Errors raised while producing a stabling plan (C6).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StablingError {
    #[error("no bay available for trainset {0}")]
    NoBayAvailable(String),

    #[error("shunting sequence has a dependency cycle that could not be broken")]
    DeadlockUnresolved,
}

/// Top-level error surfaced by the Planning API (spec §6/§7, kinds 3-5 only).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InductionError {
    #[error("constraints unresolvable: {0}")]
    UnresolvableConstraints(#[from] RepairError),

    #[error("cycle cancelled")]
    Cancelled,

    #[error("another nightly induction cycle is already in flight")]
    CycleInFlight,

    #[error("no current plan for depot {0}")]
    NotFound(String),

    #[error("invalid scenario patch: {0}")]
    InvalidPatch(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Stabling(#[from] StablingError),
}
