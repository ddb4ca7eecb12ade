//! C4 — Ensemble Solver.
//!
//! Three independent solvers (GA, SA, LP) propose a label assignment over
//! the same scored snapshot; [`ensemble::vote`] combines them by weighted
//! vote. Mirrors the teacher's `optimization::optimizer::ParameterOptimizer`
//! gate-check style for the per-solver feasibility checks, and its use of
//! `rayon` for running independent units of work concurrently.

pub mod ensemble;
pub mod ga;
pub mod lp;
pub mod sa;

use std::collections::HashMap;

use crate::scoring::ScoredTrainset;
use crate::store::FleetSnapshot;
use crate::types::Label;

/// A full label assignment, one entry per cleared trainset under
/// consideration. Uncleared trainsets are never included — the repair layer
/// (C5) is responsible for forcing them to MAINTENANCE.
pub type Candidate = HashMap<String, Label>;

fn in_service_count(candidate: &Candidate) -> usize {
    candidate.values().filter(|l| **l == Label::InService).count()
}

fn maintenance_count(candidate: &Candidate) -> usize {
    candidate.values().filter(|l| **l == Label::Maintenance).count()
}

/// GA fitness (spec §4.4, maximized): `coefficient sum + 100 *
/// [count(IN_SERVICE) >= minService] - 10 * count(MAINTENANCE beyond cap)`.
#[must_use]
pub fn ga_fitness(candidate: &Candidate, input: &SolverInput) -> f64 {
    let coefficient_sum: f64 = input
        .scores
        .iter()
        .map(|s| match candidate.get(&s.trainset_id).copied().unwrap_or(Label::Standby) {
            Label::InService => s.coefficient,
            Label::Standby => 0.4 * s.coefficient,
            Label::Maintenance => -0.2 * s.coefficient,
            Label::EmergencyRepair => -s.coefficient,
        })
        .sum();

    let meets_floor = if in_service_count(candidate) >= input.min_service { 100.0 } else { 0.0 };
    let excess_maintenance = maintenance_count(candidate).saturating_sub(input.max_maintenance);

    coefficient_sum + meets_floor - 10.0 * excess_maintenance as f64
}

/// SA energy (spec §4.4, minimized): `100 * shortfall + 50 * overflow - 10 *
/// sum(score)` over trainsets assigned a non-penalized label.
#[must_use]
pub fn sa_energy(candidate: &Candidate, input: &SolverInput) -> f64 {
    let shortfall = input.min_service.saturating_sub(in_service_count(candidate)) as f64;
    let overflow = maintenance_count(candidate).saturating_sub(input.max_maintenance) as f64;

    let score_sum: f64 = input
        .scores
        .iter()
        .filter(|s| matches!(candidate.get(&s.trainset_id), Some(Label::InService) | Some(Label::Standby)))
        .map(|s| s.coefficient)
        .sum();

    100.0 * shortfall + 50.0 * overflow - 10.0 * score_sum
}

/// Inputs shared by all three solvers: the eligible (cleared) trainsets'
/// scores and the two hard constraints the constraint repairer (and the
/// objective functions above) enforce.
#[derive(Debug, Clone)]
pub struct SolverInput {
    pub scores: Vec<ScoredTrainset>,
    pub min_service: usize,
    pub max_maintenance: usize,
}

impl SolverInput {
    #[must_use]
    pub fn from_snapshot(snapshot: &FleetSnapshot, min_service: usize, max_maintenance: usize) -> Self {
        let scores = crate::scoring::score_fleet(snapshot)
            .into_iter()
            .filter(|s| s.cleared)
            .collect();
        Self {
            scores,
            min_service,
            max_maintenance,
        }
    }
}
