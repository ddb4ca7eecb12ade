//! Simulated-annealing solver: starts from a greedy-by-coefficient candidate
//! and anneals by flipping one trainset's label per step, accepting worse
//! moves via the Metropolis criterion while temperature remains above the
//! configured floor.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::SimulatedAnnealingConfig;
use crate::error::SolverError;
use tokio_util::sync::CancellationToken;
use crate::types::Label;

use super::{sa_energy, Candidate, SolverInput};

const LABELS: [Label; 3] = [Label::InService, Label::Standby, Label::Maintenance];

fn greedy_start(input: &SolverInput) -> Candidate {
    let mut ranked = input.scores.clone();
    ranked.sort_by(|a, b| b.coefficient.partial_cmp(&a.coefficient).unwrap_or(std::cmp::Ordering::Equal));

    ranked
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let label = if i < input.min_service.max(1) {
                Label::InService
            } else if s.coefficient > 0.0 {
                Label::Standby
            } else {
                Label::Maintenance
            };
            (s.trainset_id.clone(), label)
        })
        .collect()
}

/// Run the SA cooling schedule to convergence (or cancellation). Checked for
/// cancellation once per temperature step.
pub fn run(
    input: &SolverInput,
    config: &SimulatedAnnealingConfig,
    cancel: &CancellationToken,
    seed: u64,
) -> Result<Candidate, SolverError> {
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(seed);

    if input.scores.is_empty() {
        return Ok(Candidate::new());
    }

    let mut current = greedy_start(input);
    let mut current_energy = sa_energy(&current, input);
    let mut best = current.clone();
    let mut best_energy = current_energy;

    let mut temperature = config.initial_t;
    let ids: Vec<&String> = input.scores.iter().map(|s| &s.trainset_id).collect();

    while temperature > config.min_t {
        if cancel.is_cancelled() {
            return Err(SolverError::Cancelled);
        }

        let mut candidate = current.clone();
        if let Some(&id) = ids.choose(&mut rng) {
            let new_label = *LABELS.choose(&mut rng).unwrap_or(&Label::Standby);
            candidate.insert(id.clone(), new_label);
        }

        let candidate_energy = sa_energy(&candidate, input);
        let delta = candidate_energy - current_energy;

        let accept = if delta <= 0.0 {
            true
        } else {
            let probability = (-delta / temperature).exp();
            rng.gen::<f64>() < probability
        };

        if accept {
            current = candidate;
            current_energy = candidate_energy;
            if current_energy < best_energy {
                best_energy = current_energy;
                best = current.clone();
            }
        }

        temperature *= config.cooling;
    }

    Ok(best)
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
                    coefficient: (i as f64) * 0.1 - 0.5,
                    cleared: true,
                    near_expiry: false,
                    has_emergency_job: false,
                })
                .collect(),
            min_service: 2,
            max_maintenance: usize::MAX,
        }
    }

    #[test]
    fn same_seed_yields_deterministic_result() {
        let input = input_with(15);
        let config = SimulatedAnnealingConfig::default();
        let cancel = CancellationToken::new();
        let a = run(&input, &config, &cancel, 99).unwrap();
        let b = run(&input, &config, &cancel, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cancellation_stops_before_min_temperature() {
        let input = input_with(10);
        let mut config = SimulatedAnnealingConfig::default();
        config.cooling = 0.9999;
        config.min_t = 0.0000001;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run(&input, &config, &cancel, 1);
        assert!(matches!(result, Err(SolverError::Cancelled)));
    }

    #[test]
    fn best_found_is_never_worse_than_greedy_start() {
        let input = input_with(12);
        let config = SimulatedAnnealingConfig::default();
        let cancel = CancellationToken::new();
        let start_energy = sa_energy(&greedy_start(&input), &input);
        let result = run(&input, &config, &cancel, 5).unwrap();
        assert!(sa_energy(&result, &input) <= start_energy);
    }
}
