//! The line-oriented driver: reads one input string per line, decides it, and writes one
//! result line per input.

use crate::machine::{RunStats, TuringMachine};
use crate::types::{TuringMachineError, Verdict, BLANK_SYMBOL, TAPE_MARGIN};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::{BufRead, Write};
use std::iter;
use tracing::warn;

/// Builds the initial tape for `input`: [`TAPE_MARGIN`] blanks on each side, with the
/// head on the first input symbol.
pub fn pad_input(input: &str) -> (Vec<char>, usize) {
    let blanks = iter::repeat(BLANK_SYMBOL).take(TAPE_MARGIN);
    let tape = blanks
        .clone()
        .chain(input.chars())
        .chain(blanks)
        .collect();

    (tape, TAPE_MARGIN)
}

/// How results are written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// One verdict character per line: `1`, `0` or `U`.
    #[default]
    Verdict,
    /// One JSON [`Report`] per line.
    Json,
}

/// The result of deciding one input, as written in JSON mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub input: String,
    pub verdict: Verdict,
    pub symbol: char,
    pub stats: RunStats,
}

/// Totals over a driver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    pub rejected: usize,
    pub undetermined: usize,
}

impl Summary {
    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Accept => self.accepted += 1,
            Verdict::Reject => self.rejected += 1,
            Verdict::Undetermined => self.undetermined += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.undetermined
    }
}

/// Feeds input strings to a machine and writes the results.
pub struct Driver<'a> {
    machine: &'a TuringMachine,
    format: OutputFormat,
}

impl<'a> Driver<'a> {
    pub fn new(machine: &'a TuringMachine) -> Self {
        Self {
            machine,
            format: OutputFormat::default(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Decides every line of `reader` until end of input. A trailing `\r` is dropped and
    /// an empty line stands for the empty string. Bytes that are not UTF-8 become
    /// `U+FFFD`, which no transition reads.
    pub fn run<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        writer: &mut W,
    ) -> Result<Summary, TuringMachineError> {
        let mut summary = Summary::default();
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            let read = reader.read_until(b'\n', &mut buffer).map_err(|e| {
                TuringMachineError::FileError(format!("Failed to read input: {}", e))
            })?;
            if read == 0 {
                break;
            }

            let line = buffer.strip_suffix(b"\n").unwrap_or(&buffer[..]);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let input = String::from_utf8_lossy(line);
            if matches!(input, Cow::Owned(_)) {
                warn!(line = summary.total() + 1, "input is not valid UTF-8");
            }

            summary.record(self.evaluate(&input, writer)?);
        }

        Ok(summary)
    }

    /// Decides each of `inputs` in order.
    pub fn run_inputs<I, S, W>(
        &self,
        inputs: I,
        writer: &mut W,
    ) -> Result<Summary, TuringMachineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: Write,
    {
        let mut summary = Summary::default();
        for input in inputs {
            summary.record(self.evaluate(input.as_ref(), writer)?);
        }

        Ok(summary)
    }

    /// Decides a single input and writes its result line.
    pub fn evaluate<W: Write>(
        &self,
        input: &str,
        writer: &mut W,
    ) -> Result<Verdict, TuringMachineError> {
        let mut simulation = self.machine.simulation(input)?;
        let verdict = simulation.run()?;

        let line = match self.format {
            OutputFormat::Verdict => verdict.symbol().to_string(),
            OutputFormat::Json => {
                let report = Report {
                    input: input.to_string(),
                    verdict,
                    symbol: verdict.symbol(),
                    stats: simulation.stats().clone(),
                };
                serde_json::to_string(&report).map_err(|e| {
                    TuringMachineError::FileError(format!("Failed to encode report: {}", e))
                })?
            }
        };

        writeln!(writer, "{}", line)
            .map_err(|e| TuringMachineError::FileError(format!("Failed to write result: {}", e)))?;

        Ok(verdict)
    }
}
