//! This crate provides the core of a multi-tape Turing machine interpreter.
//! It includes modules for loading and validating machine descriptions, executing them step by
//! step against a set of tapes, running independent inputs concurrently, analyzing transition
//! tables, and managing a catalogue of built-in machines.

pub mod analyzer;
pub mod batch;
pub mod config;
pub mod description;
pub mod document;
pub mod encoder;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `Finding` enum from the analyzer module.
pub use analyzer::{analyze, Finding};
/// Re-exports the batch runner.
pub use batch::{parse_cases, run_batch, CaseReport, TestCase};
pub use config::RunConfig;
pub use description::MachineDescription;
pub use document::DescriptionDocument;
/// Re-exports the encoding functions from the encoder module.
pub use encoder::{encode_json, encode_text};
/// Re-exports the `DescriptionLoader` struct and `Format` enum from the loader module.
pub use loader::{DescriptionLoader, Format};
/// Re-exports the engine entry points from the machine module.
pub use machine::{apply, find_transition, run, step, ExecutionState, TuringMachine};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `MachineInfo`, `MachineCatalog`, and `MACHINES` from the programs module.
pub use programs::{MachineCatalog, MachineInfo, MACHINES};
pub use tape::{Tape, TapeSet};
/// Re-exports the types shared by descriptions and the engine.
pub use types::{
    Direction, Halt, MachineError, Outcome, PatternKey, PatternSymbol, Rejection, RunResult,
    StateId, Step, Transition, TransitionAction, WriteSymbol, MAX_DESCRIPTION_SIZE,
};
