//! Linear-programming solver: a genuine simplex relaxation decides which
//! trainsets stay in service, then two deterministic repair pivots enforce
//! the maintenance cap and the near-expiry cap the relaxation does not model
//! directly, mirroring the teacher's `optimization::optimizer` pattern of a
//! solved relaxation followed by a gate-checked repair pass. No RNG is used
//! anywhere in this module — the LP pass is fully deterministic given its
//! input.

use crate::error::SolverError;
use tokio_util::sync::CancellationToken;
use crate::types::Label;

use super::{Candidate, SolverInput};

const NEAR_EXPIRY_CAP: usize = 5;

/// Dense-tableau simplex maximizing `c^T x` subject to `A x <= b` (`b >= 0`)
/// and `x >= 0`, via Dantzig's rule for the entering column and the
/// min-ratio test for the leaving row. Returns the optimal `x`.
struct Tableau {
    /// `rows` structural constraints + 1 objective row, `cols` variables +
    /// `rows` slacks + 1 RHS column.
    tableau: Vec<Vec<f64>>,
    n_vars: usize,
    n_constraints: usize,
    basic: Vec<usize>,
}

impl Tableau {
    fn new(c: &[f64], a: &[Vec<f64>], b: &[f64]) -> Self {
        let n_vars = c.len();
        let n_constraints = a.len();
        let width = n_vars + n_constraints + 1;

        let mut tableau = vec![vec![0.0; width]; n_constraints + 1];
        for (row, (a_row, &b_val)) in a.iter().zip(b.iter()).enumerate() {
            tableau[row][..n_vars].copy_from_slice(a_row);
            tableau[row][n_vars + row] = 1.0;
            tableau[row][width - 1] = b_val;
        }
        for (col, &c_val) in c.iter().enumerate() {
            tableau[n_constraints][col] = -c_val;
        }

        let basic = (0..n_constraints).map(|r| n_vars + r).collect();

        Self {
            tableau,
            n_vars,
            n_constraints,
            basic,
        }
    }

    fn solve(&mut self, cancel: &CancellationToken, max_pivots: usize) -> Result<(), SolverError> {
        let width = self.tableau[0].len();
        let obj_row = self.n_constraints;

        for _ in 0..max_pivots {
            if cancel.is_cancelled() {
                return Err(SolverError::Cancelled);
            }

            let Some(pivot_col) = (0..width - 1)
                .filter(|&c| self.tableau[obj_row][c] < -1e-9)
                .min_by(|&a, &b| self.tableau[obj_row][a].partial_cmp(&self.tableau[obj_row][b]).unwrap())
            else {
                return Ok(());
            };

            let pivot_row = (0..self.n_constraints)
                .filter(|&r| self.tableau[r][pivot_col] > 1e-9)
                .min_by(|&a, &b| {
                    let ratio_a = self.tableau[a][width - 1] / self.tableau[a][pivot_col];
                    let ratio_b = self.tableau[b][width - 1] / self.tableau[b][pivot_col];
                    ratio_a.partial_cmp(&ratio_b).unwrap_or(std::cmp::Ordering::Equal)
                });

            let Some(pivot_row) = pivot_row else {
                // unbounded: no feasible leaving row. Box constraints make
                // this unreachable for the relaxation this module builds.
                return Ok(());
            };

            let pivot_value = self.tableau[pivot_row][pivot_col];
            for v in self.tableau[pivot_row].iter_mut() {
                *v /= pivot_value;
            }
            for row in 0..=self.n_constraints {
                if row == pivot_row {
                    continue;
                }
                let factor = self.tableau[row][pivot_col];
                if factor.abs() < 1e-12 {
                    continue;
                }
                for col in 0..width {
                    self.tableau[row][col] -= factor * self.tableau[pivot_row][col];
                }
            }
            self.basic[pivot_row] = pivot_col;
        }

        Err(SolverError::InfeasibleStep {
            solver: "lp".to_string(),
            reason: "simplex did not converge within the pivot budget".to_string(),
        })
    }

    fn solution(&self) -> Vec<f64> {
        let width = self.tableau[0].len();
        let mut x = vec![0.0; self.n_vars];
        for (row, &basic_col) in self.basic.iter().enumerate() {
            if basic_col < self.n_vars {
                x[basic_col] = self.tableau[row][width - 1];
            }
        }
        x
    }
}

/// Relax the IN_SERVICE/not-IN_SERVICE split into a continuous simplex over
/// `z_i = 1 - serviced_i`, minimizing `sum coefficient_i * z_i` subject to
/// `z_i <= 1` and the minimum-service floor `sum z_i <= n - minService`.
fn solve_service_split(input: &SolverInput, cancel: &CancellationToken) -> Result<Vec<f64>, SolverError> {
    let n = input.scores.len();
    let cap = (n as isize - input.min_service as isize).max(0) as f64;

    // Maximize sum(-coefficient_i * z_i), i.e. minimize sum(coefficient_i * z_i).
    let c: Vec<f64> = input.scores.iter().map(|s| -s.coefficient).collect();

    let mut a = Vec::with_capacity(n + 1);
    let mut b = Vec::with_capacity(n + 1);
    for i in 0..n {
        let mut row = vec![0.0; n];
        row[i] = 1.0;
        a.push(row);
        b.push(1.0);
    }
    a.push(vec![1.0; n]);
    b.push(cap);

    let mut tableau = Tableau::new(&c, &a, &b);
    tableau.solve(cancel, (n + 1) * 4 + 16)?;
    Ok(tableau.solution())
}

/// Run the LP pass. `cancel` is checked once per simplex pivot and once per
/// repair pivot, mirroring the per-generation/per-step granularity of the
/// other two solvers.
pub fn run(input: &SolverInput, cancel: &CancellationToken) -> Result<Candidate, SolverError> {
    if input.scores.is_empty() {
        return Ok(Candidate::new());
    }

    let z = solve_service_split(input, cancel)?;

    let mut ranked: Vec<usize> = (0..input.scores.len()).collect();
    ranked.sort_by(|&a, &b| {
        input.scores[b]
            .coefficient
            .partial_cmp(&input.scores[a].coefficient)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut candidate: Candidate = input
        .scores
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let label = if z[i] < 0.5 { Label::InService } else { Label::Standby };
            (s.trainset_id.clone(), label)
        })
        .collect();

    if cancel.is_cancelled() {
        return Err(SolverError::Cancelled);
    }

    // Pivot 1: cap MAINTENANCE at max_maintenance by moving the
    // lowest-coefficient STANDBY trainsets into MAINTENANCE until the
    // out-of-service pool's MAINTENANCE share is filled, worst first.
    let standby_ids: Vec<usize> = ranked
        .iter()
        .rev()
        .copied()
        .filter(|&i| candidate.get(&input.scores[i].trainset_id) == Some(&Label::Standby))
        .collect();
    for &i in standby_ids.iter().take(input.max_maintenance) {
        candidate.insert(input.scores[i].trainset_id.clone(), Label::Maintenance);
    }

    if cancel.is_cancelled() {
        return Err(SolverError::Cancelled);
    }

    // Pivot 2: cap the number of near-expiry trainsets left IN_SERVICE,
    // demoting the lowest-coefficient offenders straight to MAINTENANCE.
    let mut near_expiry_in_service: Vec<usize> = ranked
        .iter()
        .rev()
        .copied()
        .filter(|&i| {
            input.scores[i].near_expiry
                && candidate.get(&input.scores[i].trainset_id) == Some(&Label::InService)
        })
        .collect();
    if near_expiry_in_service.len() > NEAR_EXPIRY_CAP {
        let excess = near_expiry_in_service.len() - NEAR_EXPIRY_CAP;
        near_expiry_in_service.truncate(excess);
        for i in near_expiry_in_service {
            candidate.insert(input.scores[i].trainset_id.clone(), Label::Maintenance);
        }
    }

    // EMERGENCY_REPAIR threshold-mapping branch: an open EMERGENCY job card
    // always wins, regardless of where the relaxation or the repair pivots
    // placed the trainset.
    for s in &input.scores {
        if s.has_emergency_job {
            candidate.insert(s.trainset_id.clone(), Label::EmergencyRepair);
        }
    }

    Ok(candidate)
}
