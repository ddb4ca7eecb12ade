//! Global engine configuration.
//!
//! Mirrors the teacher's `config::{init, get}` pattern: a process-wide
//! `OnceLock<EngineConfig>` populated once at startup, read everywhere else
//! through `config::get()`. Loading follows the teacher's `WellConfig::load`
//! search order (env var override -> local file -> built-in defaults).

pub mod defaults;

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Env var naming a TOML file to load config from, mirroring the teacher's
/// `SAIREN_CONFIG`.
pub const CONFIG_ENV_VAR: &str = "INDUCTION_CONFIG";

/// Install the process-wide configuration. Safe to call once; a second call
/// is logged and ignored rather than panicking, matching the teacher's
/// `config::init`.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init called more than once; keeping first value");
    }
}

/// Fetch the process-wide configuration.
///
/// # Panics
/// Panics if called before [`init`] — by design, so a misconfigured startup
/// fails loudly instead of silently falling back to defaults mid-run.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG
        .get()
        .expect("config::get called before config::init")
}

pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}

/// Load configuration following `INDUCTION_CONFIG` env var -> `./induction.toml`
/// -> built-in defaults, logging the source it resolved.
pub fn load() -> EngineConfig {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        match load_from_file(Path::new(&path)) {
            Ok(cfg) => {
                tracing::info!(path = %path, "loaded config from INDUCTION_CONFIG override");
                return cfg;
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "failed to load INDUCTION_CONFIG override, trying local file");
            }
        }
    }

    let local = Path::new("./induction.toml");
    if local.exists() {
        match load_from_file(local) {
            Ok(cfg) => {
                tracing::info!("loaded config from ./induction.toml");
                return cfg;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse ./induction.toml, falling back to defaults");
            }
        }
    }

    tracing::info!("using built-in default config");
    EngineConfig::default()
}

fn load_from_file(path: &Path) -> anyhow::Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)?;
    let cfg: EngineConfig = toml::from_str(&raw)?;
    Ok(cfg)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub solver: SolverConfig,
    pub sa: SimulatedAnnealingConfig,
    pub constraints: ConstraintsConfig,
    pub cycle: CycleConfig,
    pub ingestion: IngestionConfig,
    pub stabling: StablingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            sa: SimulatedAnnealingConfig::default(),
            constraints: ConstraintsConfig::default(),
            cycle: CycleConfig::default(),
            ingestion: IngestionConfig::default(),
            stabling: StablingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub population: usize,
    pub generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub elitism_fraction: f64,
    /// "ensemble" (GA+SA+LP voting) or "fast" (LP only). Open question, spec §9.
    pub mode: String,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            population: defaults::SOLVER_POPULATION,
            generations: defaults::SOLVER_GENERATIONS,
            crossover_rate: defaults::SOLVER_CROSSOVER_RATE,
            mutation_rate: defaults::SOLVER_MUTATION_RATE,
            tournament_size: defaults::SOLVER_TOURNAMENT_SIZE,
            elitism_fraction: defaults::SOLVER_ELITISM_FRACTION,
            mode: defaults::SOLVER_MODE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedAnnealingConfig {
    pub initial_t: f64,
    pub cooling: f64,
    pub min_t: f64,
}

impl Default for SimulatedAnnealingConfig {
    fn default() -> Self {
        Self {
            initial_t: defaults::SA_INITIAL_T,
            cooling: defaults::SA_COOLING,
            min_t: defaults::SA_MIN_T,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintsConfig {
    pub min_service: usize,
    pub max_maintenance: usize,
    pub max_shunting: usize,
    pub max_repair_iterations: u32,
    pub fitness_expiry_days: i64,
}

impl Default for ConstraintsConfig {
    fn default() -> Self {
        Self {
            min_service: defaults::CONSTRAINTS_MIN_SERVICE,
            max_maintenance: defaults::CONSTRAINTS_MAX_MAINTENANCE,
            max_shunting: defaults::CONSTRAINTS_MAX_SHUNTING,
            max_repair_iterations: defaults::REPAIR_MAX_ITERATIONS,
            fitness_expiry_days: defaults::REPAIR_FITNESS_EXPIRY_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::CYCLE_INTERVAL_SECS,
            timeout_secs: defaults::CYCLE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub buffer_size: usize,
    pub conflict_window_secs: i64,
    pub max_consecutive_failures: u32,
    pub sensor_ring_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            buffer_size: defaults::INGESTION_BUFFER_SIZE,
            conflict_window_secs: defaults::INGESTION_CONFLICT_WINDOW_SECS,
            max_consecutive_failures: defaults::INGESTION_MAX_CONSECUTIVE_FAILURES,
            sensor_ring_size: defaults::SENSOR_RING_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StablingConfig {
    pub max_simultaneous_moves: usize,
    /// Assumed baseline moves-per-night for the energy-savings metric (open question, spec §9).
    pub baseline_moves: u32,
}

impl Default for StablingConfig {
    fn default() -> Self {
        Self {
            max_simultaneous_moves: defaults::STABLING_MAX_SIMULTANEOUS_MOVES,
            baseline_moves: defaults::STABLING_BASELINE_MOVES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_numbers() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.solver.population, 100);
        assert_eq!(cfg.solver.generations, 50);
        assert!((cfg.sa.cooling - 0.95).abs() < f64::EPSILON);
        assert_eq!(cfg.stabling.max_simultaneous_moves, 2);
        assert_eq!(cfg.ingestion.buffer_size, 10_000);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults_for_missing_sections() {
        let toml_str = r#"
            [solver]
            population = 50
        "#;
        let cfg: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.solver.population, 50);
        assert_eq!(cfg.solver.generations, 50);
        assert_eq!(cfg.sa.initial_t, 100.0);
    }
}
