//! Runs one description against many independent inputs in parallel.
//!
//! Every case gets its own `ExecutionState`; the description is only ever borrowed, so the cases
//! share it without any locking.

use rayon::prelude::*;
use tracing::debug;

use crate::config::RunConfig;
use crate::description::MachineDescription;
use crate::machine::{run, ExecutionState};
use crate::types::{MachineError, RunResult};

/// Separates the tapes of one case in a case file.
pub const TAPE_SEPARATOR: char = ';';
/// Introduces the expected output of a case in a case file.
pub const EXPECTATION_MARKER: &str = "=>";

/// One input of a batch: the initial tape contents and, optionally, the expected output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub tapes: Vec<String>,
    pub expected: Option<String>,
}

impl TestCase {
    pub fn new<S: Into<String>>(tapes: impl IntoIterator<Item = S>) -> Self {
        Self {
            tapes: tapes.into_iter().map(Into::into).collect(),
            expected: None,
        }
    }

    pub fn expecting(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

impl AsRef<[String]> for TestCase {
    fn as_ref(&self) -> &[String] {
        &self.tapes
    }
}

/// The result of one case: the run result and every tape's final content, trailing blanks trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub result: RunResult,
    pub tapes: Vec<String>,
}

impl CaseReport {
    /// Returns the final content of one tape.
    pub fn output(&self, tape: usize) -> Option<&str> {
        self.tapes.get(tape).map(String::as_str)
    }

    /// Compares the case's expectation with the final content of `output_tape`.
    ///
    /// Returns `None` when the case has no expectation.
    pub fn check(&self, case: &TestCase, output_tape: usize) -> Option<bool> {
        let expected = case.expected.as_deref()?;
        Some(self.output(output_tape) == Some(expected))
    }
}

/// Runs every case against `description` and returns the reports in input order.
///
/// A case fails with `MachineError::InvalidTapeIndex` if it supplies more tapes than the machine
/// has; the other cases are unaffected.
pub fn run_batch<C>(
    description: &MachineDescription,
    cases: &[C],
    config: &RunConfig,
) -> Vec<Result<CaseReport, MachineError>>
where
    C: AsRef<[String]> + Sync,
{
    debug!(
        machine = description.name(),
        cases = cases.len(),
        "running batch"
    );

    cases
        .par_iter()
        .map(|case| run_case(description, case.as_ref(), config))
        .collect()
}

fn run_case(
    description: &MachineDescription,
    tapes: &[String],
    config: &RunConfig,
) -> Result<CaseReport, MachineError> {
    let mut execution = ExecutionState::new(description, tapes)?;
    let result = run(description, &mut execution, config);

    Ok(CaseReport {
        result,
        tapes: execution.tapes().iter().map(|t| t.content(true)).collect(),
    })
}

/// Reads a case file.
///
/// Each non-empty line that does not start with `#` is one case. Tapes are separated by `;` and
/// taken verbatim; an optional `=> expected` suffix sets the expected output, trimmed of
/// surrounding whitespace.
///
/// ```
/// use mtur::batch::parse_cases;
///
/// let cases = parse_cases("# message; shift\n3#ABC;_||| => DEF\n");
/// assert_eq!(cases[0].tapes, vec!["3#ABC", "_|||"]);
/// assert_eq!(cases[0].expected.as_deref(), Some("DEF"));
/// ```
pub fn parse_cases(text: &str) -> Vec<TestCase> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| {
            let (input, expected) = match line.split_once(EXPECTATION_MARKER) {
                Some((input, expected)) => (input.trim_end(), Some(expected.trim().to_string())),
                None => (line, None),
            };

            TestCase {
                tapes: input.split(TAPE_SEPARATOR).map(str::to_string).collect(),
                expected,
            }
        })
        .collect()
}
