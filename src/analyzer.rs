//! This module inspects a loaded machine before it runs. It tags states that can only
//! loop on themselves so the engine can stop exploring them, and reports definitions
//! that are legal but probably not what the author meant.

use crate::table::{Program, TransitionTable};
use crate::types::{StateId, START_STATE};
use std::collections::VecDeque;
use thiserror::Error;

/// Non-fatal findings about a machine definition.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum AnalysisWarning {
    /// No state is accepting, so no input can ever be accepted.
    #[error("No accepting states defined")]
    NoAcceptingStates,
    /// States that define transitions but can't be reached from the start state.
    #[error("Unreachable states detected: {0:?}")]
    UnreachableStates(Vec<StateId>),
    /// Accepting states that can't be reached from the start state.
    #[error("Accepting states are unreachable: {0:?}")]
    UnreachableAcceptingStates(Vec<StateId>),
    /// A zero budget makes every verdict undetermined.
    #[error("Step budget is 0, every input will be undetermined")]
    ZeroBudget,
}

/// Flags every state whose only behavior is an unconditional self-transition.
///
/// A state qualifies when it reacts to exactly one symbol, that transition has a
/// single outcome, and the outcome leads back to the state itself. The written
/// symbol is not compared with the read one, so a state that rewrites its cell
/// and returns to itself is flagged too.
///
/// Applying it twice has no further effect. Returns the ids that qualify.
pub fn mark_loops(table: &mut TransitionTable) -> Vec<StateId> {
    let mut marked = Vec::new();

    for (id, state) in table.states_mut() {
        let self_loop = match state.transitions.as_slice() {
            [only] => matches!(only.outcomes.as_slice(), [outcome] if outcome.next_state == id),
            _ => false,
        };

        if self_loop {
            state.permanent_loop = true;
            marked.push(id);
        }
    }

    marked
}

/// Runs all checks and returns every warning found, in a stable order.
pub fn analyze(program: &Program) -> Vec<AnalysisWarning> {
    [
        check_accepting_states,
        check_unreachable_states,
        check_unreachable_accepting_states,
        check_budget,
    ]
    .iter()
    .filter_map(|f| f(program))
    .collect()
}

fn check_accepting_states(program: &Program) -> Option<AnalysisWarning> {
    program
        .accepting
        .is_empty()
        .then_some(AnalysisWarning::NoAcceptingStates)
}

/// Checks for states that define transitions but are never entered.
fn check_unreachable_states(program: &Program) -> Option<AnalysisWarning> {
    let reachable = reachable_states(&program.table);
    let unreachable: Vec<_> = program
        .table
        .states()
        .filter(|(id, state)| !state.is_empty() && !reachable.contains(id))
        .map(|(id, _)| id)
        .collect();

    (!unreachable.is_empty()).then_some(AnalysisWarning::UnreachableStates(unreachable))
}

fn check_unreachable_accepting_states(program: &Program) -> Option<AnalysisWarning> {
    let reachable = reachable_states(&program.table);
    let unreachable: Vec<_> = program
        .accepting
        .iter()
        .filter(|id| *id != START_STATE && !reachable.contains(id))
        .collect();

    (!unreachable.is_empty()).then_some(AnalysisWarning::UnreachableAcceptingStates(unreachable))
}

fn check_budget(program: &Program) -> Option<AnalysisWarning> {
    (program.step_budget == 0).then_some(AnalysisWarning::ZeroBudget)
}

/// Breadth-first walk over the outcome graph starting at the start state.
fn reachable_states(table: &TransitionTable) -> Vec<StateId> {
    let mut seen = vec![false; table.len().max(START_STATE + 1)];
    let mut queue = VecDeque::from([START_STATE]);
    seen[START_STATE] = true;

    while let Some(id) = queue.pop_front() {
        let Some(state) = table.state(id) else {
            continue;
        };

        for outcome in state.transitions.iter().flat_map(|t| &t.outcomes) {
            if !seen[outcome.next_state] {
                seen[outcome.next_state] = true;
                queue.push_back(outcome.next_state);
            }
        }
    }

    seen.iter()
        .enumerate()
        .filter_map(|(id, &hit)| hit.then_some(id))
        .collect()
}
