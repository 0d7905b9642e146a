//! This module provides the `ProgramLoader` struct, responsible for loading machine
//! definitions from files, strings, and streams that also carry input strings.

use crate::parser::parse;
use crate::table::Program;
use crate::types::{TuringMachineError, MAX_PROGRAM_SIZE};
use std::fs;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// `ProgramLoader` is a utility struct for loading machine definitions.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a definition from the file at `path`.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and parsed.
    /// * `Err(TuringMachineError::FileError)` if the file cannot be read or is too large.
    /// * `Err(TuringMachineError::ParseError)` if the content is not a valid definition.
    pub fn load_program(path: &Path) -> Result<Program, TuringMachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), bytes = content.len(), "loading definition");
        Self::load_program_from_string(&content)
    }

    /// Loads a definition from string content.
    pub fn load_program_from_string(content: &str) -> Result<Program, TuringMachineError> {
        check_size(content.len())?;
        parse(content)
    }

    /// Reads a definition from the front of `reader`, up to and including the `run`
    /// line. Whatever follows is left unread for the driver.
    ///
    /// If the stream ends before a `run` line the whole stream is the definition.
    pub fn load_from_reader<R: BufRead>(reader: &mut R) -> Result<Program, TuringMachineError> {
        let mut content = String::new();

        loop {
            let mut line = String::new();
            let read = reader.read_line(&mut line).map_err(|e| {
                TuringMachineError::FileError(format!("Failed to read definition: {}", e))
            })?;
            if read == 0 {
                break;
            }

            content.push_str(&line);
            check_size(content.len())?;

            if line.trim().eq_ignore_ascii_case("run") {
                break;
            }
        }

        parse(&content)
    }
}

fn check_size(len: usize) -> Result<(), TuringMachineError> {
    if len > MAX_PROGRAM_SIZE {
        return Err(TuringMachineError::FileError(format!(
            "Definition exceeds {} bytes",
            MAX_PROGRAM_SIZE
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{Cursor, Read, Write};
    use tempfile::tempdir;

    const DEFINITION: &str = "tr\n0 a b R 1\nacc\n1\nmax\n5\nrun\n";

    #[test]
    fn test_load_valid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.ntm");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(DEFINITION.as_bytes()).unwrap();

        let program = ProgramLoader::load_program(&file_path).unwrap();
        assert_eq!(program.step_budget, 5);
        assert!(program.accepting.contains(1));
        assert!(program.table.transition(0, 'a').is_some());
    }

    #[test]
    fn test_load_invalid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.ntm");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"This is not a valid definition").unwrap();

        let result = ProgramLoader::load_program(&file_path);
        assert!(matches!(result, Err(TuringMachineError::ParseError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = ProgramLoader::load_program(&dir.path().join("missing.ntm"));

        let error = result.unwrap_err();
        assert!(matches!(error, TuringMachineError::FileError(_)));
        assert!(error.to_string().contains("missing.ntm"));
    }

    #[test]
    fn test_reader_stops_after_run_marker() {
        let stream = format!("{DEFINITION}aab\n\nab\n");
        let mut reader = Cursor::new(stream);

        let program = ProgramLoader::load_from_reader(&mut reader).unwrap();
        assert_eq!(program.step_budget, 5);

        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "aab\n\nab\n");
    }

    #[test]
    fn test_reader_without_run_marker() {
        let mut reader = Cursor::new("tr\nacc\n0\nmax\n2\n");
        let program = ProgramLoader::load_from_reader(&mut reader).unwrap();
        assert!(program.accepting.contains(0));
    }

    #[test]
    fn test_oversized_definition() {
        let content = "\n".repeat(MAX_PROGRAM_SIZE + 1);
        let result = ProgramLoader::load_program_from_string(&content);
        assert!(matches!(result, Err(TuringMachineError::FileError(_))));
    }
}
