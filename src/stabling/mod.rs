//! C6 — Stabling Geometry Optimizer.
//!
//! Assigns each decision a physical bay and produces the shunting moves
//! required to realize tonight's plan: classify each move (DIRECT /
//! PULL_PUSH / TRIANGLE), estimate its time/energy cost, then sequence all
//! moves into dependency-respecting waves bounded by
//! `stabling.maxSimultaneousMoves` (spec §4.6).

use std::collections::{HashMap, HashSet};

use crate::error::StablingError;
use crate::types::{Bay, BayType, Decision, Label, MoveType, ShuntingMove};

/// IN_SERVICE trainsets should end up in the bays nearest the yard exit
/// (lowest `(track, position)`); everything else fills in behind them.
#[must_use]
pub fn assign_bays(mut decisions: Vec<Decision>, bays: &[Bay]) -> Result<Vec<Decision>, StablingError> {
    let mut free_bays: Vec<&Bay> = bays.iter().filter(|b| b.is_free()).collect();
    free_bays.sort_by_key(|b: &&Bay| crate::types::bay::sort_key(*b));

    decisions.sort_by(|a, b| departure_priority(b).cmp(&departure_priority(a)).then(a.trainset_id.cmp(&b.trainset_id)));

    let mut used: HashSet<String> = HashSet::new();
    for decision in &mut decisions {
        let preferred_type = preferred_bay_type(decision.label);
        let bay = free_bays
            .iter()
            .find(|b| !used.contains(&b.id) && b.bay_type == preferred_type)
            .or_else(|| free_bays.iter().find(|b| !used.contains(&b.id)))
            .ok_or_else(|| StablingError::NoBayAvailable(decision.trainset_id.clone()))?;
        used.insert(bay.id.clone());
        decision.bay_id = Some(bay.id.clone());
    }

    Ok(decisions)
}

/// Departure priority: IN_SERVICE trainsets leave first thing in the morning
/// and so rank highest, EMERGENCY_REPAIR and MAINTENANCE need the least
/// urgent exit access.
fn departure_priority(decision: &Decision) -> u8 {
    match decision.label {
        Label::InService => 3,
        Label::Standby => 2,
        Label::Maintenance => 1,
        Label::EmergencyRepair => 0,
    }
}

fn preferred_bay_type(label: Label) -> BayType {
    match label {
        Label::InService | Label::Standby => BayType::Stabling,
        Label::Maintenance => BayType::Maintenance,
        Label::EmergencyRepair => BayType::Maintenance,
    }
}

/// Classify a move between two bays by their track/position relationship.
#[must_use]
pub fn classify_move(from: &Bay, to: &Bay) -> MoveType {
    if from.track == to.track {
        MoveType::Direct
    } else if from.track.abs_diff(to.track) == 1 {
        MoveType::PullPush
    } else {
        MoveType::Triangle
    }
}

const BASE_TIME_SECS: f64 = 120.0;
const TIME_PER_POSITION_SECS: f64 = 15.0;
const TRIANGLE_TIME_PENALTY_SECS: f64 = 300.0;
const BASE_ENERGY_KWH: f64 = 2.0;
const ENERGY_PER_POSITION_KWH: f64 = 0.3;
const TRIANGLE_ENERGY_PENALTY_KWH: f64 = 4.5;

#[must_use]
pub fn estimate_move_cost(move_type: MoveType, from: &Bay, to: &Bay) -> (f64, f64) {
    let distance = (from.position.abs_diff(to.position) + from.track.abs_diff(to.track)) as f64;
    let (time_penalty, energy_penalty) = match move_type {
        MoveType::Direct => (0.0, 0.0),
        MoveType::PullPush => (60.0, 1.0),
        MoveType::Triangle => (TRIANGLE_TIME_PENALTY_SECS, TRIANGLE_ENERGY_PENALTY_KWH),
    };
    let time = BASE_TIME_SECS + distance * TIME_PER_POSITION_SECS + time_penalty;
    let energy = BASE_ENERGY_KWH + distance * ENERGY_PER_POSITION_KWH + energy_penalty;
    (time, energy)
}

/// Build a move for every trainset that changed bays, leaving trainsets
/// already parked where they need to be without a move.
#[must_use]
pub fn build_moves(decisions: &[Decision], previous_bay: &HashMap<String, String>) -> Vec<ShuntingMove> {
    let mut moves = Vec::new();
    for decision in decisions {
        let Some(to_bay_id) = &decision.bay_id else { continue };
        let Some(from_bay_id) = previous_bay.get(&decision.trainset_id) else { continue };
        if from_bay_id == to_bay_id {
            continue;
        }
        moves.push(ShuntingMove {
            id: format!("move-{}", decision.trainset_id),
            trainset_id: decision.trainset_id.clone(),
            from_bay: from_bay_id.clone(),
            to_bay: to_bay_id.clone(),
            move_type: MoveType::Direct, // classified once bay geometry is known, see `classify_and_cost`
            estimated_time_secs: 0.0,
            estimated_energy_kwh: 0.0,
            depends_on: Vec::new(),
            wave: 0,
        });
    }
    moves
}

/// Fill in move type and cost now that bay records are available.
pub fn classify_and_cost(moves: &mut [ShuntingMove], bays: &HashMap<String, Bay>) {
    for mv in moves.iter_mut() {
        if let (Some(from), Some(to)) = (bays.get(&mv.from_bay), bays.get(&mv.to_bay)) {
            let move_type = classify_move(from, to);
            let (time, energy) = estimate_move_cost(move_type, from, to);
            mv.move_type = move_type;
            mv.estimated_time_secs = time;
            mv.estimated_energy_kwh = energy;
        }
    }
}

/// A move depends on any other move whose `to_bay` is this move's
/// `from_bay` (you can't vacate a bay that isn't empty yet) — the classic
/// "who's sitting in my spot" shunting dependency.
fn compute_dependencies(moves: &mut [ShuntingMove]) {
    let occupants: HashMap<String, String> = moves
        .iter()
        .map(|m| (m.from_bay.clone(), m.id.clone()))
        .collect();
    for mv in moves.iter_mut() {
        mv.depends_on.clear();
    }
    let ids: Vec<String> = moves.iter().map(|m| m.id.clone()).collect();
    for id in ids {
        let mv_to_bay = moves.iter().find(|m| m.id == id).map(|m| m.to_bay.clone());
        if let Some(to_bay) = mv_to_bay {
            if let Some(blocker) = occupants.get(&to_bay) {
                if blocker != &id {
                    if let Some(mv) = moves.iter_mut().find(|m| m.id == id) {
                        mv.depends_on.push(blocker.clone());
                    }
                }
            }
        }
    }
}

/// Detect a dependency cycle among the given moves via DFS.
fn find_cycle(moves: &[ShuntingMove]) -> Option<Vec<String>> {
    let by_id: HashMap<&str, &ShuntingMove> = moves.iter().map(|m| (m.id.as_str(), m)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a ShuntingMove>,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = stack.iter().position(|s| *s == id) {
            return Some(stack[pos..].iter().map(|s| (*s).to_string()).collect());
        }
        if visited.contains(id) {
            return None;
        }
        visited.insert(id);
        stack.push(id);
        if let Some(mv) = by_id.get(id) {
            for dep in &mv.depends_on {
                if let Some(cycle) = visit(dep.as_str(), by_id, visited, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        None
    }

    for mv in moves {
        if let Some(cycle) = visit(mv.id.as_str(), &by_id, &mut visited, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

/// Sequence moves into parallel-execution waves bounded by
/// `max_simultaneous_moves`, breaking any dependency deadlock by clearing
/// the lowest-cost move's dependency list (it gets a temporary holding
/// position in the real yard, which this model does not need to represent).
pub fn sequence_moves(
    mut moves: Vec<ShuntingMove>,
    max_simultaneous_moves: usize,
) -> Result<Vec<ShuntingMove>, StablingError> {
    compute_dependencies(&mut moves);

    let mut deadlock_breaks = 0;
    while let Some(cycle) = find_cycle(&moves) {
        deadlock_breaks += 1;
        if deadlock_breaks > moves.len() + 1 {
            return Err(StablingError::DeadlockUnresolved);
        }
        // Break the cycle at its cheapest (lowest estimated time) move.
        let victim = cycle
            .iter()
            .min_by(|a, b| {
                let ta = moves.iter().find(|m| &m.id == *a).map_or(f64::MAX, |m| m.estimated_time_secs);
                let tb = moves.iter().find(|m| &m.id == *b).map_or(f64::MAX, |m| m.estimated_time_secs);
                ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();
        if let Some(victim_id) = victim {
            if let Some(mv) = moves.iter_mut().find(|m| m.id == victim_id) {
                mv.depends_on.clear();
            }
        } else {
            return Err(StablingError::DeadlockUnresolved);
        }
    }

    let mut scheduled: HashSet<String> = HashSet::new();
    let mut wave = 0u32;
    let total = moves.len();
    while scheduled.len() < total {
        let ready: Vec<String> = moves
            .iter()
            .filter(|m| !scheduled.contains(&m.id))
            .filter(|m| m.depends_on.iter().all(|d| scheduled.contains(d)))
            .map(|m| m.id.clone())
            .take(max_simultaneous_moves.max(1))
            .collect();

        if ready.is_empty() {
            return Err(StablingError::DeadlockUnresolved);
        }

        for id in &ready {
            if let Some(mv) = moves.iter_mut().find(|m| &m.id == id) {
                mv.wave = wave;
            }
            scheduled.insert(id.clone());
        }
        wave += 1;
    }

    Ok(moves)
}
