//! This module defines the core data structures shared by the description, the tapes and the
//! execution engine: symbols and patterns, transition actions, step outcomes and error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::Rule;

/// The default blank symbol filling every unwritten tape cell.
pub const DEFAULT_BLANK_SYMBOL: char = '_';
/// The default pattern token that matches any symbol on its tape.
pub const DEFAULT_WILDCARD_SYMBOL: char = '*';
/// The default write token meaning "leave the cell as it is".
pub const DEFAULT_UNCHANGED_SYMBOL: char = '*';
/// Separator between the per-tape components of a pattern key.
pub const PATTERN_SEPARATOR: char = ',';
/// The maximum allowed size for a machine description source in bytes.
pub const MAX_DESCRIPTION_SIZE: usize = 1 << 20; // 1MB
/// The default step budget of a run.
pub const DEFAULT_MAX_STEPS: usize = 100_000;
/// Number of blank cells appended whenever a tape has to grow.
pub const TAPE_BLOCK_SIZE: usize = 1000;

/// Identifies a state of a compiled description.
///
/// Ids are indices into the description's ordered state list, so they are only meaningful
/// together with the description that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl StateId {
    /// Returns the position of the state in the description's state list.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left, stopping at position 0.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Parses a direction token.
    ///
    /// Supports 'L' or '<' for Left, 'R' or '>' for Right, and 'S' or '-' for Stay.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "L" | "<" => Some(Direction::Left),
            "R" | ">" => Some(Direction::Right),
            "S" | "-" => Some(Direction::Stay),
            _ => None,
        }
    }

    /// Returns the canonical one-letter token of this direction.
    pub fn token(self) -> &'static str {
        match self {
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::Stay => "S",
        }
    }
}

/// One component of a pattern key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternSymbol {
    /// Matches whatever symbol is under the head.
    Any,
    /// Matches exactly this symbol.
    Literal(char),
}

impl PatternSymbol {
    pub fn matches(self, symbol: char) -> bool {
        match self {
            PatternSymbol::Any => true,
            PatternSymbol::Literal(expected) => expected == symbol,
        }
    }

    /// Returns true when every symbol matched by `other` is also matched by `self`.
    pub fn covers(self, other: PatternSymbol) -> bool {
        match (self, other) {
            (PatternSymbol::Any, _) => true,
            (PatternSymbol::Literal(a), PatternSymbol::Literal(b)) => a == b,
            (PatternSymbol::Literal(_), PatternSymbol::Any) => false,
        }
    }
}

/// The lookup key of a transition: one pattern symbol per tape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey(pub(crate) Vec<PatternSymbol>);

impl PatternKey {
    pub fn new(symbols: Vec<PatternSymbol>) -> Self {
        Self(symbols)
    }

    pub fn symbols(&self) -> &[PatternSymbol] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the literal symbols of this key if it contains no wildcard.
    pub fn as_literals(&self) -> Option<Vec<char>> {
        self.0
            .iter()
            .map(|symbol| match symbol {
                PatternSymbol::Literal(c) => Some(*c),
                PatternSymbol::Any => None,
            })
            .collect()
    }

    /// Checks the key against the symbols read from all tapes.
    pub fn matches(&self, symbols: &[char]) -> bool {
        self.0.len() == symbols.len()
            && self
                .0
                .iter()
                .zip(symbols)
                .all(|(pattern, &symbol)| pattern.matches(symbol))
    }

    /// Returns true when every read tuple matched by `other` is also matched by `self`.
    pub fn covers(&self, other: &PatternKey) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(mine, theirs)| mine.covers(*theirs))
    }

    /// Renders the key in its comma-joined wire form.
    pub fn render(&self, wildcard: char) -> String {
        self.0
            .iter()
            .map(|symbol| match symbol {
                PatternSymbol::Any => wildcard,
                PatternSymbol::Literal(c) => *c,
            })
            .map(String::from)
            .collect::<Vec<_>>()
            .join(&PATTERN_SEPARATOR.to_string())
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_WILDCARD_SYMBOL))
    }
}

/// What a transition writes to one tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteSymbol {
    /// Leave the cell under the head untouched.
    Keep,
    /// Overwrite the cell under the head.
    Literal(char),
}

/// The effect of a matched transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionAction {
    /// One write per tape.
    pub write: Vec<WriteSymbol>,
    /// One head movement per tape, applied after the writes.
    pub moves: Vec<Direction>,
    /// The state the machine enters.
    pub next_state: StateId,
}

/// A transition rule: the pattern it is looked up by and the action it performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub pattern: PatternKey,
    pub action: TransitionAction,
}

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The machine applied a transition and can continue.
    Continue,
    /// The machine has halted.
    Halt(Halt),
}

/// Why a machine stopped stepping.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// The current state is an accepting state.
    Accepted,
    /// No transition matches the current configuration.
    Rejected(Rejection),
}

/// Details of a rejection outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub state: String,
    pub symbols: Vec<char>,
}

/// The terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Accepted,
    Rejected,
    StepLimitExceeded,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
            Outcome::StepLimitExceeded => "step limit exceeded",
        };
        f.write_str(text)
    }
}

/// The final configuration of a run.
///
/// For `StepLimitExceeded` this is the partial configuration the machine was in when the budget ran
/// out, which is usually what you want to look at when diagnosing a machine that loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub outcome: Outcome,
    /// Name of the state the machine stopped in.
    pub state: String,
    /// Total number of transitions applied.
    pub steps: usize,
    pub heads: Vec<usize>,
    /// The symbols under the heads when the machine stopped.
    pub symbols: Vec<char>,
}

impl RunResult {
    pub fn is_accepted(&self) -> bool {
        self.outcome == Outcome::Accepted
    }
}

/// Represents the errors produced while loading descriptions or querying a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// The description is structurally invalid: dangling states, arity mismatches, unknown symbols
    /// and the like.
    #[error("Malformed description: {0}")]
    MalformedDescription(String),
    /// A tape index at or beyond the machine's tape count was used.
    #[error("Tape index {index} is out of range (machine has {tape_count} tapes)")]
    InvalidTapeIndex { index: usize, tape_count: usize },
    /// The text form of a description could not be parsed.
    #[error("Description parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Reading a description from the file system failed.
    #[error("File error: {0}")]
    FileError(String),
}

impl MachineError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        MachineError::MalformedDescription(message.into())
    }
}
