//! `induction_core` — nightly train-induction decision engine for a metro
//! fleet: ensemble optimizer (GA + SA + LP), stabling-geometry optimizer,
//! and ingestion/conflict-resolution fabric.
//!
//! This crate is a library; it has no embedded HTTP surface. An embedding
//! application depends on it and exposes [`api::PlanningApi`] however it
//! likes (REST, gRPC, a CLI), the way the teacher's `fleet-hub` binary
//! depends on `sairen_os`.

pub mod api;
pub mod config;
pub mod cycle;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod metrics;
pub mod repair;
pub mod scenario;
pub mod scoring;
pub mod solver;
pub mod stabling;
pub mod store;
pub mod types;

pub use api::PlanningApi;
pub use config::EngineConfig;
pub use error::InductionError;
pub use events::{Event, EventBus, Topic};
pub use store::FleetStore;
pub use types::InductionPlan;

/// Initialize process-wide tracing, mirroring the teacher's startup
/// sequence. Safe to call once per process; an embedding application that
/// already installs its own subscriber should skip this.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
