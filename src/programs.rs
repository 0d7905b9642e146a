//! Machine definitions bundled with the crate, parsed once on first use.

use crate::table::Program;
use crate::types::TuringMachineError;
use tracing::warn;

// Embedded definitions, keyed by name.
const PROGRAM_TEXTS: [(&str, &str); 4] = [
    ("even-length", include_str!("../machines/even-length.ntm")),
    ("ends-with-ab", include_str!("../machines/ends-with-ab.ntm")),
    ("anbn", include_str!("../machines/anbn.ntm")),
    ("self-loop", include_str!("../machines/self-loop.ntm")),
];

lazy_static::lazy_static! {
    pub static ref PROGRAMS: Vec<(&'static str, Program)> = PROGRAM_TEXTS
        .iter()
        .filter_map(|&(name, text)| match crate::parser::parse(text) {
            Ok(program) => Some((name, program)),
            Err(e) => {
                warn!(name, "failed to parse bundled machine: {}", e);
                None
            }
        })
        .collect();
}

/// Summary of a bundled machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub name: String,
    pub state_count: usize,
    pub outcome_count: usize,
    pub accepting_count: usize,
    pub step_budget: usize,
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        PROGRAMS.len()
    }

    /// Get a program by its name
    pub fn get_program_by_name(name: &str) -> Result<Program, TuringMachineError> {
        PROGRAMS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, program)| program.clone())
            .ok_or_else(|| {
                TuringMachineError::ValidationError(format!("Program '{}' not found", name))
            })
    }

    /// List all program names
    pub fn list_program_names() -> Vec<String> {
        PROGRAMS.iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Get information about every bundled program
    pub fn list_program_info() -> Vec<ProgramInfo> {
        PROGRAMS
            .iter()
            .map(|(name, program)| ProgramInfo {
                name: name.to_string(),
                state_count: program.table.len(),
                outcome_count: program.table.outcome_count(),
                accepting_count: program.accepting.len(),
                step_budget: program.step_budget,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::TuringMachine;
    use crate::types::Verdict;

    fn decide(name: &str, input: &str) -> Verdict {
        let program = ProgramManager::get_program_by_name(name).unwrap();
        TuringMachine::new(program).decide(input).unwrap()
    }

    #[test]
    fn test_all_bundled_programs_parse() {
        assert_eq!(ProgramManager::get_program_count(), PROGRAM_TEXTS.len());
        assert_eq!(
            ProgramManager::list_program_names(),
            vec!["even-length", "ends-with-ab", "anbn", "self-loop"]
        );
    }

    #[test]
    fn test_unknown_program() {
        let result = ProgramManager::get_program_by_name("nope");
        assert!(matches!(result, Err(TuringMachineError::ValidationError(_))));
    }

    #[test]
    fn test_program_info() {
        let info = ProgramManager::list_program_info();
        let even = info.iter().find(|i| i.name == "even-length").unwrap();
        assert_eq!(even.state_count, 3);
        assert_eq!(even.outcome_count, 5);
        assert_eq!(even.accepting_count, 1);
        assert_eq!(even.step_budget, 100);
    }

    #[test]
    fn test_even_length() {
        assert_eq!(decide("even-length", ""), Verdict::Accept);
        assert_eq!(decide("even-length", "ab"), Verdict::Accept);
        assert_eq!(decide("even-length", "aba"), Verdict::Reject);
        assert_eq!(decide("even-length", "ac"), Verdict::Reject);
    }

    #[test]
    fn test_ends_with_ab() {
        assert_eq!(decide("ends-with-ab", "ab"), Verdict::Accept);
        assert_eq!(decide("ends-with-ab", "babab"), Verdict::Accept);
        assert_eq!(decide("ends-with-ab", "ba"), Verdict::Reject);
        assert_eq!(decide("ends-with-ab", "abb"), Verdict::Reject);
        assert_eq!(decide("ends-with-ab", ""), Verdict::Reject);
    }

    #[test]
    fn test_anbn() {
        assert_eq!(decide("anbn", ""), Verdict::Accept);
        assert_eq!(decide("anbn", "aabb"), Verdict::Accept);
        assert_eq!(decide("anbn", "aab"), Verdict::Reject);
        assert_eq!(decide("anbn", "abb"), Verdict::Reject);
        assert_eq!(decide("anbn", "ba"), Verdict::Reject);
    }

    #[test]
    fn test_self_loop_heuristic() {
        assert_eq!(decide("self-loop", "b"), Verdict::Reject);
        assert_eq!(decide("self-loop", "a"), Verdict::Undetermined);
        // State 1 is flagged as looping even though it has no move for 'b'.
        assert_eq!(decide("self-loop", "ab"), Verdict::Undetermined);
    }
}
