//! This module renders a `MachineDescription` back into one of its source formats: the JSON wire
//! format or the compact text format read by the parser. Loading the output again yields an
//! equivalent description.

use std::fmt::Write as _;

use crate::description::MachineDescription;
use crate::types::{MachineError, PatternSymbol, Transition, WriteSymbol};

/// Encodes a description as pretty-printed JSON with the canonical field names.
///
/// # Returns
///
/// * `Ok(String)` - The JSON document.
/// * `Err(MachineError::MalformedDescription)` - If serialization fails.
pub fn encode_json(description: &MachineDescription) -> Result<String, MachineError> {
    serde_json::to_string_pretty(&description.to_document())
        .map_err(|e| MachineError::malformed(format!("failed to encode description: {e}")))
}

/// Encodes a description in the text format.
///
/// Every section is written out explicitly, so nothing has to be inferred when the text is parsed
/// again. Symbols that the grammar treats specially are quoted. Keep markers are written with the
/// wildcard token, which is what the text format uses for both.
///
/// State names are written as they are; names outside `[A-Za-z0-9_.-]` do not parse back. The text
/// format has no field for the free-text summary, so it is only kept by `encode_json`.
pub fn encode_text(description: &MachineDescription) -> String {
    let wildcard = description.wildcard();
    let mut out = String::new();

    if !description.name().is_empty() {
        let _ = writeln!(out, "name: {}", description.name());
    }
    let _ = writeln!(out, "tapes: {}", description.tape_count());
    let _ = writeln!(out, "blank: {}", quote(description.blank()));
    let _ = writeln!(out, "wildcard: {}", quote(wildcard));
    let _ = writeln!(out, "states: [{}]", description.states().join(", "));
    let _ = writeln!(out, "input: {}", symbol_list(description.input_alphabet()));
    let _ = writeln!(out, "alphabet: {}", symbol_list(description.tape_alphabet()));
    let _ = writeln!(
        out,
        "start: {}",
        description.state_name(description.initial_state())
    );
    let accepting: Vec<&str> = description
        .accepting_states()
        .map(|id| description.state_name(id))
        .collect();
    let _ = writeln!(out, "accept: [{}]", accepting.join(", "));
    out.push('\n');
    out.push_str("rules:\n");

    let mut blocks = 0;
    for id in description.state_ids() {
        let rules = description.transitions_for(id);
        if rules.is_empty() {
            continue;
        }

        let _ = writeln!(out, "  {}:", description.state_name(id));
        for transition in rules {
            let _ = writeln!(out, "    {}", encode_rule(description, transition, wildcard));
        }
        blocks += 1;
    }

    // The grammar needs at least one state block.
    if blocks == 0 {
        let _ = writeln!(
            out,
            "  {}:",
            description.state_name(description.initial_state())
        );
    }

    out
}

fn encode_rule(description: &MachineDescription, transition: &Transition, wildcard: char) -> String {
    let read: Vec<char> = transition
        .pattern
        .symbols()
        .iter()
        .map(|symbol| match symbol {
            PatternSymbol::Any => wildcard,
            PatternSymbol::Literal(c) => *c,
        })
        .collect();
    let write: Vec<char> = transition
        .action
        .write
        .iter()
        .map(|symbol| match symbol {
            WriteSymbol::Keep => wildcard,
            WriteSymbol::Literal(c) => *c,
        })
        .collect();
    let moves: Vec<&str> = transition.action.moves.iter().map(|d| d.token()).collect();

    format!(
        "{} -> {}, [{}], {}",
        symbol_list(&read),
        symbol_list(&write),
        moves.join(", "),
        description.state_name(transition.action.next_state)
    )
}

fn symbol_list(symbols: &[char]) -> String {
    let quoted: Vec<String> = symbols.iter().map(|&c| quote(c)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Quotes symbols that would otherwise be read as punctuation, whitespace or a comment.
fn quote(symbol: char) -> String {
    if matches!(symbol, '[' | ']' | ',' | '\'' | '#') || symbol.is_whitespace() {
        format!("'{symbol}'")
    } else {
        symbol.to_string()
    }
}
