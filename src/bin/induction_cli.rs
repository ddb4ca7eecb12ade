//! Demonstration binary: replays a small fixture fleet through a nightly
//! induction cycle and prints the resulting plan. The counterpart of the
//! teacher's `src/bin/simulation.rs` — illustrative, not a deployment target.

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use induction_core::config::{self, EngineConfig};
use induction_core::store::FleetStore;
use induction_core::types::{Bay, BayType, FitnessCertificateExpiry, Trainset, TrainsetStatus};
use induction_core::{EventBus, PlanningApi};

#[derive(Parser, Debug)]
#[command(name = "induction-cli", about = "Replay a fixture fleet through one nightly induction cycle")]
struct Args {
    /// Number of trainsets to synthesize in the fixture fleet.
    #[arg(long, default_value_t = 10)]
    fleet_size: usize,

    /// RNG seed fed to the GA/SA solvers for reproducible output.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Path to an INDUCTION_CONFIG-style TOML file; falls back to defaults.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    induction_core::init_tracing();
    let args = Args::parse();

    if let Some(path) = &args.config {
        std::env::set_var(config::CONFIG_ENV_VAR, path);
    }
    config::init(config::load());

    let store = Arc::new(FleetStore::new());
    seed_fixture_fleet(&store, args.fleet_size);

    let events = Arc::new(EventBus::new());
    let api = PlanningApi::new(store, events);

    let engine_config: &EngineConfig = config::get();
    let plan = api.run_nightly_induction(engine_config, args.seed).await?;

    println!("plan {} ({} decisions, {} moves)", plan.id, plan.decisions.len(), plan.moves.len());
    for decision in &plan.decisions {
        println!("  {:<12} {:?}  bay={:?}", decision.trainset_id, decision.label, decision.bay_id);
    }
    if let Some(metrics) = &plan.metrics {
        println!(
            "service_availability={:.2} risk_score={:.2} confidence={:.2}",
            metrics.service_availability, metrics.risk_score, metrics.confidence
        );
    }

    Ok(())
}

fn seed_fixture_fleet(store: &FleetStore, fleet_size: usize) {
    let trainsets: Vec<Trainset> = (0..fleet_size)
        .map(|i| {
            let expiry = Utc::now() + chrono::Duration::days(30 + i as i64);
            Trainset {
                id: format!("TS-{i:03}"),
                status: TrainsetStatus::Available,
                mileage_km: 50_000.0 + (i as f64) * 1_234.0,
                fitness_score: 7.0 + (i as f64 % 3.0),
                fitness_expiry: FitnessCertificateExpiry {
                    rolling_stock: expiry,
                    signalling: expiry,
                    telecom: expiry,
                },
                last_maintenance: Utc::now() - chrono::Duration::days(20 + i as i64),
                next_maintenance: Utc::now() + chrono::Duration::days(40 - (i as i64 % 10)),
                energy_consumption_kwh: 300.0 + (i as f64) * 10.0,
                current_bay: None,
            }
        })
        .collect();

    let bays: Vec<Bay> = (0..fleet_size)
        .map(|i| Bay {
            id: format!("BAY-{i:03}"),
            track: (i / 4) as u32,
            position: (i % 4) as u32,
            bay_type: if i % 5 == 0 { BayType::Maintenance } else { BayType::Stabling },
            occupied_by: None,
        })
        .collect();

    store.seed(trainsets, bays);
}
