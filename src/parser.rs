//! This module provides the parser for machine definitions, utilizing the `pest` crate.
//! It turns the `tr` / `acc` / `max` / `run` text format into a [`Program`] with its
//! permanent-loop states already flagged.

use crate::{
    analyzer::{analyze, mark_loops},
    table::{AcceptanceSet, Program, TransitionTable},
    types::{Direction, Outcome, StateId, TuringMachineError, MAX_STATES},
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use tracing::{debug, warn};

/// Derives a `PestParser` for the definition grammar in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DefinitionParser;

/// Parses a machine definition.
///
/// Forward references are allowed: any state named as a target, or as accepting,
/// exists in the resulting table even if it has no transitions. The loop pre-marker
/// is applied before returning, and analysis warnings are logged.
///
/// # Returns
///
/// * `Ok(Program)` if the input is a well-formed definition.
/// * `Err(TuringMachineError::ParseError)` if there are any syntax errors.
/// * `Err(TuringMachineError::ValidationError)` if a number does not fit a `usize`.
pub fn parse(input: &str) -> Result<Program, TuringMachineError> {
    let root = DefinitionParser::parse(Rule::program, input)
        .map_err(|e| TuringMachineError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| TuringMachineError::ValidationError("Empty definition".to_string()))?;

    let mut program = parse_program(root)?;

    let loops = mark_loops(&mut program.table);
    debug!(
        states = program.table.len(),
        outcomes = program.table.outcome_count(),
        accepting = program.accepting.len(),
        budget = program.step_budget,
        ?loops,
        "definition parsed"
    );

    for warning in analyze(&program) {
        warn!("{}", warning);
    }

    Ok(program)
}

/// Walks the top-level sections of a `Pair<Rule::program>`.
fn parse_program(pair: Pair<Rule>) -> Result<Program, TuringMachineError> {
    let mut table = TransitionTable::new();
    let mut accepting = AcceptanceSet::new();
    let mut step_budget = 0;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::transitions => table = parse_transitions(p)?,
            Rule::acceptance => {
                for state_pair in p.into_inner() {
                    let state = parse_state(state_pair)?;
                    table.ensure_state(state);
                    accepting.insert(state);
                }
            }
            Rule::budget => {
                let count = p.into_inner().next();
                step_budget = match count {
                    Some(count) => parse_number(count, "step budget")?,
                    None => 0,
                };
            }
            _ => {} // SOI, run marker, EOI
        }
    }

    // State 0 always exists, even for a definition without transitions.
    table.ensure_state(0);

    Ok(Program {
        table,
        accepting,
        step_budget,
    })
}

/// Parses every `state read write move next` record of the transition section.
fn parse_transitions(pair: Pair<Rule>) -> Result<TransitionTable, TuringMachineError> {
    let mut table = TransitionTable::new();

    for record in pair.into_inner() {
        let span = record.as_span();
        let mut pairs = record.into_inner();

        let state = parse_state(next_pair(&mut pairs, span)?)?;
        let read = parse_symbol(next_pair(&mut pairs, span)?);
        let write = parse_symbol(next_pair(&mut pairs, span)?);
        let direction = parse_direction(next_pair(&mut pairs, span)?)?;
        let next_state = parse_state(next_pair(&mut pairs, span)?)?;

        table.add_outcome(state, read, Outcome::new(write, direction, next_state));
    }

    Ok(table)
}

/// Parses a single direction from a `Pair<Rule::direction>`.
///
/// Supports '<' or 'L' for Left, '>' or 'R' for Right, and '-' or 'S' for Stay.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, TuringMachineError> {
    let span = pair.as_span();
    match pair.as_str() {
        "<" | "L" => Ok(Direction::Left),
        ">" | "R" => Ok(Direction::Right),
        "-" | "S" => Ok(Direction::Stay),
        other => Err(parse_error(&format!("Unsupported direction: {other}"), span)),
    }
}

fn parse_state(pair: Pair<Rule>) -> Result<StateId, TuringMachineError> {
    let line = line_of(&pair);
    let state = parse_number(pair, "state id")?;
    if state >= MAX_STATES {
        return Err(TuringMachineError::ValidationError(format!(
            "state id {} exceeds the limit of {} states (line {})",
            state, MAX_STATES, line
        )));
    }

    Ok(state)
}

fn parse_number(pair: Pair<Rule>, what: &str) -> Result<usize, TuringMachineError> {
    pair.as_str().parse::<usize>().map_err(|_| {
        TuringMachineError::ValidationError(format!(
            "{} {} is out of range (line {})",
            what,
            pair.as_str(),
            line_of(&pair)
        ))
    })
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

/// The grammar guarantees a symbol is exactly one character.
fn parse_symbol(pair: Pair<Rule>) -> char {
    pair.as_str().chars().next().unwrap_or_default()
}

/// Takes the next inner pair of a record, failing at `span` if the record is short.
fn next_pair<'i>(
    pairs: &mut Pairs<'i, Rule>,
    span: Span<'i>,
) -> Result<Pair<'i, Rule>, TuringMachineError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Incomplete transition record", span))
}

/// Creates a `TuringMachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> TuringMachineError {
    TuringMachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}
