//! This module defines the core data structures and types shared by the transition table,
//! the simulation engine and the loader: symbols, moves, verdicts and the error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::Rule;

/// Identifier of a machine state. States are numbered densely from zero.
pub type StateId = usize;

/// The state every simulation starts from.
pub const START_STATE: StateId = 0;
/// The blank symbol used on the tape, both in definitions and when padding.
pub const BLANK_SYMBOL: char = '_';
/// Number of blanks added on each side of the tape whenever it grows.
pub const TAPE_MARGIN: usize = 10;
/// Upper bound on state ids accepted by the loader.
pub const MAX_STATES: usize = 1 << 20;
/// The maximum allowed size for a machine definition in bytes.
pub const MAX_PROGRAM_SIZE: usize = 1 << 20;

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// The signed head offset applied by this move.
    pub fn delta(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }

    /// The letter used for this move in machine definitions.
    pub fn letter(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stay => 'S',
        }
    }
}

/// One `(write, move, next-state)` choice available for a state and read symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome {
    /// Symbol written under the head before moving.
    pub write: char,
    /// Head movement applied after writing.
    pub direction: Direction,
    /// State the new configuration is in.
    pub next_state: StateId,
}

impl Outcome {
    pub fn new(write: char, direction: Direction, next_state: StateId) -> Self {
        Self {
            write,
            direction,
            next_state,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.write,
            self.direction.letter(),
            self.next_state
        )
    }
}

/// The tri-state result of deciding one input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Some branch reached an accepting state.
    Accept,
    /// Every branch dead-ended before the budget ran out.
    Reject,
    /// The budget ran out, or a branch entered a permanent loop.
    Undetermined,
}

impl Verdict {
    /// The character the driver prints for this verdict.
    pub fn symbol(self) -> char {
        match self {
            Verdict::Accept => '1',
            Verdict::Reject => '0',
            Verdict::Undetermined => 'U',
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Represents the outcome of processing one configuration of the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The configuration was processed and the search goes on.
    Continue,
    /// A final verdict has been reached.
    Halt(Verdict),
}

/// Knobs for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Let deterministic moves reuse the parent's tape instead of copying it.
    pub share_tapes: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self { share_tapes: true }
    }
}

/// Represents various errors that can occur while loading or running a machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuringMachineError {
    /// Indicates an error during the parsing of a machine definition.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates a well-formed definition whose values cannot be used.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to reading definitions or writing verdicts.
    #[error("File error: {0}")]
    FileError(String),
    /// The tape could not be grown or copied. Fatal for the current input.
    #[error("Failed to allocate a tape of {0} cells")]
    TapeAllocation(usize),
}
