//! The static description of a machine: its transition table, the accepting states and the
//! per-run step budget. Built once by the loader and only read by the engine.

use crate::types::{Outcome, StateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// All outcomes a state offers for one read symbol, in definition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The symbol this transition reacts to.
    pub read: char,
    /// The available moves. Never empty.
    pub outcomes: Vec<Outcome>,
}

impl Transition {
    /// A transition with a single outcome never branches.
    pub fn is_deterministic(&self) -> bool {
        self.outcomes.len() == 1
    }
}

/// A single machine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Transitions keyed by read symbol, in the order the symbols were first seen.
    pub transitions: Vec<Transition>,
    /// Set by the loop pre-marker when the state can only ever re-enter itself.
    pub permanent_loop: bool,
}

impl State {
    /// Returns the transition reacting to `symbol`, if any.
    pub fn transition(&self, symbol: char) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.read == symbol)
    }

    /// A state without transitions dead-ends every branch that enters it.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// States indexed `0..len()`. Grows on demand so definitions may reference states
/// before declaring them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    states: Vec<State>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of states, including states that were only referenced.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Grows the table so that `id` names a state.
    pub fn ensure_state(&mut self, id: StateId) {
        if id >= self.states.len() {
            self.states.resize_with(id + 1, State::default);
        }
    }

    /// Appends `outcome` to the transition of `state` on `read`, creating the state,
    /// the transition and the outcome's target state as needed.
    pub fn add_outcome(&mut self, state: StateId, read: char, outcome: Outcome) {
        self.ensure_state(state.max(outcome.next_state));

        let transitions = &mut self.states[state].transitions;
        match transitions.iter_mut().find(|t| t.read == read) {
            Some(transition) => transition.outcomes.push(outcome),
            None => transitions.push(Transition {
                read,
                outcomes: vec![outcome],
            }),
        }
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id)
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.get_mut(id)
    }

    /// Finds the transition for `state` reading `symbol`.
    ///
    /// Returns `None` when the state does not exist, has no transitions, or does not
    /// react to the symbol; the engine treats all three as a dead end.
    pub fn transition(&self, state: StateId, symbol: char) -> Option<&Transition> {
        self.state(state).and_then(|s| s.transition(symbol))
    }

    /// Iterates over `(id, state)` pairs.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states.iter().enumerate()
    }

    pub(crate) fn states_mut(&mut self) -> impl Iterator<Item = (StateId, &mut State)> {
        self.states.iter_mut().enumerate()
    }

    /// Total number of outcomes over all states and symbols.
    pub fn outcome_count(&self) -> usize {
        self.states
            .iter()
            .flat_map(|s| &s.transitions)
            .map(|t| t.outcomes.len())
            .sum()
    }
}

impl fmt::Display for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in self.states() {
            let marker = if state.permanent_loop { " (loop)" } else { "" };
            if state.is_empty() {
                writeln!(f, "State {id}{marker}: no transitions")?;
                continue;
            }

            writeln!(f, "State {id}{marker}:")?;
            for transition in &state.transitions {
                let outcomes = transition
                    .outcomes
                    .iter()
                    .map(Outcome::to_string)
                    .collect::<Vec<_>>()
                    .join(" | ");
                writeln!(f, "  {} -> {}", transition.read, outcomes)?;
            }
        }

        Ok(())
    }
}

/// The set of accepting state ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceSet(BTreeSet<StateId>);

impl AcceptanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: StateId) -> bool {
        self.0.insert(state)
    }

    pub fn contains(&self, state: StateId) -> bool {
        self.0.contains(&state)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<StateId> for AcceptanceSet {
    fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A fully loaded machine definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub table: TransitionTable,
    pub accepting: AcceptanceSet,
    /// Number of breadth-first levels explored before giving up.
    pub step_budget: usize,
}
