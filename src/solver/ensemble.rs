//! Combines the GA, SA, and LP candidates into one assignment by weighted
//! vote (0.40 / 0.35 / 0.25), running all three concurrently via `rayon` on
//! the same snapshot and falling back to the LP-only ("fast") path when
//! configured (spec §9 open question).

use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::SolverError;
use tokio_util::sync::CancellationToken;
use crate::types::{JobPriority, Label};

use super::{ga, lp, sa, Candidate, SolverInput};

pub const GA_WEIGHT: f64 = 0.40;
pub const SA_WEIGHT: f64 = 0.35;
pub const LP_WEIGHT: f64 = 0.25;

/// Per-trainset tie-break key when two labels tie on weighted vote: highest
/// open job-card priority wins, then ascending trainset id.
#[derive(Debug, Clone)]
pub struct TieBreakContext<'a> {
    pub highest_open_priority: HashMap<&'a str, JobPriority>,
}

/// Run all three solvers (in parallel) and combine by weighted vote.
/// `seed` feeds both GA and SA; LP is deterministic and ignores it.
pub fn run_ensemble(
    input: &SolverInput,
    config: &EngineConfig,
    cancel: &CancellationToken,
    seed: u64,
    tie_break: &TieBreakContext<'_>,
) -> Result<Candidate, SolverError> {
    if config.solver.mode == "fast" {
        return lp::run(input, cancel);
    }

    let (ga_result, (sa_result, lp_result)) = rayon::join(
        || ga::run(input, &config.solver, cancel, seed),
        || {
            rayon::join(
                || sa::run(input, &config.sa, cancel, seed.wrapping_add(1)),
                || lp::run(input, cancel),
            )
        },
    );

    let ga_candidate = ga_result?;
    let sa_candidate = sa_result?;
    let lp_candidate = lp_result?;

    Ok(vote(input, &ga_candidate, &sa_candidate, &lp_candidate, tie_break))
}

fn vote(
    input: &SolverInput,
    ga: &Candidate,
    sa: &Candidate,
    lp: &Candidate,
    tie_break: &TieBreakContext<'_>,
) -> Candidate {
    input
        .scores
        .iter()
        .map(|s| {
            let mut weights: HashMap<Label, f64> = HashMap::new();
            if let Some(label) = ga.get(&s.trainset_id) {
                *weights.entry(*label).or_insert(0.0) += GA_WEIGHT;
            }
            if let Some(label) = sa.get(&s.trainset_id) {
                *weights.entry(*label).or_insert(0.0) += SA_WEIGHT;
            }
            if let Some(label) = lp.get(&s.trainset_id) {
                *weights.entry(*label).or_insert(0.0) += LP_WEIGHT;
            }

            let chosen = pick_label(&weights, &s.trainset_id, tie_break);
            (s.trainset_id.clone(), chosen)
        })
        .collect()
}

fn pick_label(weights: &HashMap<Label, f64>, trainset_id: &str, tie_break: &TieBreakContext<'_>) -> Label {
    let max_weight = weights.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut tied: Vec<Label> = weights
        .iter()
        .filter(|(_, w)| (**w - max_weight).abs() < 1e-9)
        .map(|(l, _)| *l)
        .collect();

    if tied.len() == 1 {
        return tied[0];
    }

    // Tie-break: higher open-job priority wins; IN_SERVICE preferred on a
    // full tie since it's the scarcer, higher-value label.
    let priority = tie_break
        .highest_open_priority
        .get(trainset_id)
        .copied()
        .unwrap_or(JobPriority::Low);

    if priority >= JobPriority::High && tied.contains(&Label::Maintenance) {
        return Label::Maintenance;
    }
    if tied.contains(&Label::InService) {
        Label::InService
    } else if tied.contains(&Label::Standby) {
        Label::Standby
    } else {
        tied.pop().unwrap_or(Label::Standby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoredTrainset;

    fn input_with(n: usize) -> SolverInput {
        SolverInput {
            scores: (0..n)
                .map(|i| ScoredTrainset {
                    trainset_id: format!("t{i}"),
                    coefficient: 0.5 - (i as f64) * 0.05,
                    cleared: true,
                    near_expiry: false,
                    has_emergency_job: false,
                })
                .collect(),
            min_service: 1,
            max_maintenance: usize::MAX,
        }
    }

    #[test]
    fn ensemble_produces_one_label_per_trainset() {
        let input = input_with(10);
        let config = EngineConfig::default();
        let cancel = CancellationToken::new();
        let tie_break = TieBreakContext {
            highest_open_priority: HashMap::new(),
        };
        let result = run_ensemble(&input, &config, &cancel, 123, &tie_break).unwrap();
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn fast_mode_skips_ga_and_sa() {
        let input = input_with(5);
        let mut config = EngineConfig::default();
        config.solver.mode = "fast".to_string();
        let cancel = CancellationToken::new();
        let tie_break = TieBreakContext {
            highest_open_priority: HashMap::new(),
        };
        let result = run_ensemble(&input, &config, &cancel, 1, &tie_break).unwrap();
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn unanimous_vote_wins_outright() {
        let weights: HashMap<Label, f64> = [(Label::InService, 1.0)].into_iter().collect();
        let tie_break = TieBreakContext {
            highest_open_priority: HashMap::new(),
        };
        assert_eq!(pick_label(&weights, "t0", &tie_break), Label::InService);
    }
}
