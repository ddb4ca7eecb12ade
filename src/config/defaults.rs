//! Flat default constants for every key in the external configuration surface
//! (spec §6). Grouped by subsystem with a one-line rationale per value,
//! mirroring the teacher's `config/defaults.rs` banner style.

// ==================== Solver (Genetic Algorithm) ====================

/// GA population size per generation.
pub const SOLVER_POPULATION: usize = 100;
/// Number of GA generations to run before stopping.
pub const SOLVER_GENERATIONS: usize = 50;
/// Probability two parents exchange genes during crossover.
pub const SOLVER_CROSSOVER_RATE: f64 = 0.7;
/// Probability a single gene is randomly perturbed after crossover.
pub const SOLVER_MUTATION_RATE: f64 = 0.1;
/// Candidates sampled per tournament-selection draw.
pub const SOLVER_TOURNAMENT_SIZE: usize = 5;
/// Fraction of the fittest individuals carried unmodified into the next generation.
pub const SOLVER_ELITISM_FRACTION: f64 = 0.10;
/// Ensemble mode: "ensemble" runs GA+SA+LP and votes; "fast" runs LP alone.
pub const SOLVER_MODE: &str = "ensemble";

// ==================== Solver (Simulated Annealing) ====================

/// Starting temperature for the SA cooling schedule.
pub const SA_INITIAL_T: f64 = 100.0;
/// Multiplicative cooling factor applied after each SA step.
pub const SA_COOLING: f64 = 0.95;
/// Temperature floor at which SA stops annealing.
pub const SA_MIN_T: f64 = 0.01;

// ==================== Constraint Repairer ====================

/// Minimum number of trainsets that must carry the IN_SERVICE label.
pub const CONSTRAINTS_MIN_SERVICE: usize = 0;
/// Maximum number of trainsets that may carry the MAINTENANCE label at once.
pub const CONSTRAINTS_MAX_MAINTENANCE: usize = usize::MAX;
/// Maximum shunting moves the stabling optimizer may schedule per cycle.
pub const CONSTRAINTS_MAX_SHUNTING: usize = usize::MAX;
/// Fixed-point iteration cap before `UnresolvableConstraints` is raised.
pub const REPAIR_MAX_ITERATIONS: u32 = 10;
/// Remaining fitness-certificate validity, in days, that forces maintenance.
pub const REPAIR_FITNESS_EXPIRY_DAYS: i64 = 14;

// ==================== Real-Time Cycle Controller ====================

/// Seconds between scheduled nightly-induction cycle checks.
pub const CYCLE_INTERVAL_SECS: u64 = 3600;
/// Seconds before an in-flight cycle is treated as overrun and cancelled.
pub const CYCLE_TIMEOUT_SECS: u64 = 120;

// ==================== Ingestion Fabric ====================

/// Capacity of each source's drop-oldest ring buffer.
pub const INGESTION_BUFFER_SIZE: usize = 10_000;
/// Window, in seconds, within which two deltas for the same trainset conflict.
pub const INGESTION_CONFLICT_WINDOW_SECS: i64 = 5;
/// Consecutive poll failures before a source is marked ERROR.
pub const INGESTION_MAX_CONSECUTIVE_FAILURES: u32 = 5;
/// Ring buffer length retained per trainset for sensor frames (C1).
pub const SENSOR_RING_SIZE: usize = 1000;

// ==================== Stabling Geometry Optimizer ====================

/// Upper bound on shunting moves allowed to execute concurrently.
pub const STABLING_MAX_SIMULTANEOUS_MOVES: usize = 2;
/// Assumed moves-per-night baseline used by the energy-savings metric (open question, spec §9).
pub const STABLING_BASELINE_MOVES: u32 = 100;
