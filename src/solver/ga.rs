//! Genetic-algorithm solver: tournament selection, single-point crossover,
//! per-gene mutation, elitism. Seeded via an injected `StdRng` so GA runs are
//! reproducible, mirroring the teacher's `cfc` modules' `StdRng::seed_from_u64`
//! idiom.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::SolverConfig;
use crate::error::SolverError;
use tokio_util::sync::CancellationToken;
use crate::types::Label;

use super::{ga_fitness, Candidate, SolverInput};

const LABELS: [Label; 3] = [Label::InService, Label::Standby, Label::Maintenance];

fn random_candidate(input: &SolverInput, rng: &mut StdRng) -> Candidate {
    input
        .scores
        .iter()
        .map(|s| (s.trainset_id.clone(), *LABELS.choose(rng).unwrap_or(&Label::Standby)))
        .collect()
}

fn tournament_select<'a>(
    population: &'a [Candidate],
    fitnesses: &[f64],
    tournament_size: usize,
    rng: &mut StdRng,
) -> &'a Candidate {
    let mut best_idx = rng.gen_range(0..population.len());
    for _ in 1..tournament_size {
        let challenger = rng.gen_range(0..population.len());
        if fitnesses[challenger] > fitnesses[best_idx] {
            best_idx = challenger;
        }
    }
    &population[best_idx]
}

fn crossover(a: &Candidate, b: &Candidate, rate: f64, rng: &mut StdRng) -> Candidate {
    a.iter()
        .map(|(id, label)| {
            if rng.gen::<f64>() < rate {
                (id.clone(), b.get(id).copied().unwrap_or(*label))
            } else {
                (id.clone(), *label)
            }
        })
        .collect()
}

fn mutate(candidate: &mut Candidate, rate: f64, rng: &mut StdRng) {
    for label in candidate.values_mut() {
        if rng.gen::<f64>() < rate {
            *label = *LABELS.choose(rng).unwrap_or(&Label::Standby);
        }
    }
}

/// Run the GA to convergence (or cancellation), returning the fittest
/// candidate found. Checked for cancellation once per generation.
pub fn run(
    input: &SolverInput,
    config: &SolverConfig,
    cancel: &CancellationToken,
    seed: u64,
) -> Result<Candidate, SolverError> {
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(seed);

    if input.scores.is_empty() {
        return Ok(Candidate::new());
    }

    let mut population: Vec<Candidate> = (0..config.population)
        .map(|_| random_candidate(input, &mut rng))
        .collect();

    let elite_count = ((config.population as f64) * config.elitism_fraction).round() as usize;
    let elite_count = elite_count.max(1).min(config.population);

    let mut best = population[0].clone();
    let mut best_fitness = ga_fitness(&best, input);

    for _generation in 0..config.generations {
        if cancel.is_cancelled() {
            return Err(SolverError::Cancelled);
        }

        let fitnesses: Vec<f64> = population.iter().map(|c| ga_fitness(c, input)).collect();

        let mut ranked: Vec<usize> = (0..population.len()).collect();
        ranked.sort_by(|&a, &b| fitnesses[b].partial_cmp(&fitnesses[a]).unwrap_or(std::cmp::Ordering::Equal));

        if fitnesses[ranked[0]] > best_fitness {
            best_fitness = fitnesses[ranked[0]];
            best = population[ranked[0]].clone();
        }

        let mut next_gen: Vec<Candidate> = ranked
            .iter()
            .take(elite_count)
            .map(|&i| population[i].clone())
            .collect();

        while next_gen.len() < config.population {
            let parent_a = tournament_select(&population, &fitnesses, config.tournament_size, &mut rng);
            let parent_b = tournament_select(&population, &fitnesses, config.tournament_size, &mut rng);
            let mut child = crossover(parent_a, parent_b, config.crossover_rate, &mut rng);
            mutate(&mut child, config.mutation_rate, &mut rng);
            next_gen.push(child);
        }

        population = next_gen;
    }

    Ok(best)
}
