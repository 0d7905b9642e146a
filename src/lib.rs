//! This crate decides whether a nondeterministic Turing machine accepts an input string
//! within a bounded number of breadth-first levels of its computation tree.
//! It includes modules for loading machine definitions, flagging self-looping states,
//! sharing tapes between branches, and driving the engine over a stream of inputs.

pub mod analyzer;
pub mod driver;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the loop pre-marker and static checks from the analyzer module.
pub use analyzer::{analyze, mark_loops, AnalysisWarning};
/// Re-exports the line-oriented driver.
pub use driver::{pad_input, Driver, OutputFormat, Report, Summary};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the simulation engine.
pub use machine::{simulate, Configuration, RunStats, Simulation, TuringMachine};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
/// Re-exports the machine description types.
pub use table::{AcceptanceSet, Program, State, Transition, TransitionTable};
/// Re-exports the shared tape storage.
pub use tape::{TapeArena, TapeHandle};
/// Re-exports various types related to machine definition and execution from the types module.
pub use types::{
    Direction, Outcome, SimulationOptions, StateId, Step, TuringMachineError, Verdict,
    BLANK_SYMBOL, MAX_PROGRAM_SIZE, TAPE_MARGIN,
};
