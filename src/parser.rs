//! This module provides the parser for the compact `.tm` description format, utilizing the `pest`
//! crate. It turns the parse tree into a `DescriptionDocument`, inferring whatever the text leaves
//! out, and then validates it like any other document.

use crate::{
    description::MachineDescription,
    document::DescriptionDocument,
    types::{
        Direction, MachineError, DEFAULT_BLANK_SYMBOL, DEFAULT_WILDCARD_SYMBOL, PATTERN_SEPARATOR,
    },
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::Pair,
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::HashSet;

/// Derives a `PestParser` for the description grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DescriptionParser;

/// Parses and validates a description written in the text format.
///
/// # Returns
///
/// * `Ok(MachineDescription)` if the input is well-formed and valid.
/// * `Err(MachineError::ParseError)` if there are syntax errors.
/// * `Err(MachineError::MalformedDescription)` if the machine it describes is invalid.
pub fn parse(input: &str) -> Result<MachineDescription, MachineError> {
    let document = parse_document(input)?;
    MachineDescription::from_document(&document)
}

/// Parses the text format into a document without validating it.
pub fn parse_document(input: &str) -> Result<DescriptionDocument, MachineError> {
    let root = DescriptionParser::parse(Rule::program, input)
        .map_err(|e| MachineError::ParseError(Box::new(e)))?
        .next()
        .ok_or_else(|| MachineError::malformed("empty description"))?;

    parse_program(root)
}

/// A rule as written, before symbols are turned into document tokens.
struct ParsedRule {
    read: Vec<char>,
    write: Vec<char>,
    moves: Vec<Direction>,
    next: String,
}

/// Parses the top-level structure of a description from a `Pair<Rule::program>`.
///
/// Header sections may appear at most once; `rules:` comes last.
fn parse_program(pair: Pair<Rule>) -> Result<DescriptionDocument, MachineError> {
    let mut name: Option<String> = None;
    let mut tapes: Option<usize> = None;
    let mut blank: Option<char> = None;
    let mut wildcard: Option<char> = None;
    let mut states: Option<Vec<String>> = None;
    let mut input: Option<Vec<char>> = None;
    let mut alphabet: Option<Vec<char>> = None;
    let mut start: Option<String> = None;
    let mut accept: Option<Vec<String>> = None;
    let mut blocks: Vec<(String, Vec<ParsedRule>)> = Vec::new();
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let kind = p.as_rule();

        check_unique_rule(kind, span, &mut seen)?;

        match kind {
            Rule::name => name = Some(parse_inner_string(p).trim().to_string()),
            Rule::tapes => tapes = Some(parse_count(p)?),
            Rule::blank => blank = first_inner(p).map(|s| parse_symbol(s.as_str())),
            Rule::wildcard => wildcard = first_inner(p).map(|s| parse_symbol(s.as_str())),
            Rule::states => states = first_inner(p).map(parse_identifiers),
            Rule::input => input = first_inner(p).map(parse_symbols),
            Rule::alphabet => alphabet = first_inner(p).map(parse_symbols),
            Rule::start => start = Some(parse_inner_string(p)),
            Rule::accept => accept = first_inner(p).map(parse_identifiers),
            Rule::rules => blocks = parse_rules(p)?,
            _ => {} // EOI
        }
    }

    let blank = blank.unwrap_or(DEFAULT_BLANK_SYMBOL);
    let wildcard = wildcard.unwrap_or(DEFAULT_WILDCARD_SYMBOL);
    let accept = accept.unwrap_or_default();

    // The first state block is the initial state unless `start:` says otherwise.
    let start = match start.or_else(|| blocks.first().map(|(state, _)| state.clone())) {
        Some(start) => start,
        None => return Err(MachineError::malformed("no initial state")),
    };

    let tape_count = tapes
        .or_else(|| {
            blocks
                .iter()
                .flat_map(|(_, rules)| rules.first())
                .map(|rule| rule.read.len())
                .next()
        })
        .unwrap_or(1);

    let states = states.unwrap_or_else(|| infer_states(&start, &blocks, &accept));
    let alphabet =
        alphabet.unwrap_or_else(|| infer_alphabet(input.as_deref(), &blocks, blank, wildcard));
    let input = input.unwrap_or_else(|| alphabet.iter().copied().filter(|&c| c != blank).collect());

    let mut document = DescriptionDocument::new(name.unwrap_or_default(), tape_count);
    document.states = states;
    document.input_alphabet = input.iter().map(char::to_string).collect();
    document.tape_alphabet = alphabet.iter().map(char::to_string).collect();
    document.initial_state = start;
    document.accepting_states = accept;
    document.blank = blank.to_string();
    document.wildcard = wildcard.to_string();
    document.unchanged = wildcard.to_string();

    for (state, rules) in blocks {
        let table = document.transitions.entry_or_default(state);
        for rule in rules {
            let pattern = rule
                .read
                .iter()
                .map(char::to_string)
                .collect::<Vec<_>>()
                .join(&PATTERN_SEPARATOR.to_string());

            table.push(
                pattern,
                crate::document::ActionRecord {
                    write: rule.write.iter().map(char::to_string).collect(),
                    moves: rule.moves.iter().map(|d| d.token().to_string()).collect(),
                    next_state: rule.next,
                },
            );
        }
    }

    Ok(document)
}

/// Parses the `rules:` section into state blocks, keeping authoring order.
fn parse_rules(pair: Pair<Rule>) -> Result<Vec<(String, Vec<ParsedRule>)>, MachineError> {
    let mut blocks: Vec<(String, Vec<ParsedRule>)> = Vec::new();

    for block in pair.into_inner() {
        let span = block.as_span();
        let mut inner = block.into_inner();
        let state = match inner.next() {
            Some(identifier) => identifier.as_str().to_string(),
            None => continue,
        };

        // Prevent duplicated state blocks
        if blocks.iter().any(|(existing, _)| *existing == state) {
            return Err(parse_error(
                &format!("Duplicate transition rule: {state}"),
                span,
            ));
        }

        let rules = inner.map(parse_rule).collect::<Result<Vec<_>, _>>()?;
        blocks.push((state, rules));
    }

    Ok(blocks)
}

/// Parses one rule line. Single-tape shorthand (`a -> b, R, next`) yields one-element lists.
fn parse_rule(pair: Pair<Rule>) -> Result<ParsedRule, MachineError> {
    let span = pair.as_span();
    let mut read = Vec::new();
    let mut write = Vec::new();
    let mut moves = Vec::new();
    let mut next = String::new();
    let mut symbol_groups = 0;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::symbol_list | Rule::symbol => {
                let symbols = if part.as_rule() == Rule::symbol {
                    vec![parse_symbol(part.as_str())]
                } else {
                    parse_symbols(part)
                };
                if symbol_groups == 0 {
                    read = symbols;
                } else {
                    write = symbols;
                }
                symbol_groups += 1;
            }
            Rule::directions => {
                for direction in part.into_inner() {
                    moves.push(parse_direction(direction)?);
                }
            }
            Rule::direction => moves.push(parse_direction(part)?),
            Rule::identifier => next = part.as_str().to_string(),
            _ => {}
        }
    }

    // Validate that all lists have the same length
    if read.len() != write.len() || read.len() != moves.len() {
        return Err(parse_error(
            &format!(
                "Inconsistent multi-tape action: read={}, write={}, directions={}",
                read.len(),
                write.len(),
                moves.len()
            ),
            span,
        ));
    }

    Ok(ParsedRule {
        read,
        write,
        moves,
        next,
    })
}

/// Lists states in order of first mention: start state, rule blocks, targets, accepting states.
fn infer_states(start: &str, blocks: &[(String, Vec<ParsedRule>)], accept: &[String]) -> Vec<String> {
    let mentioned = std::iter::once(start)
        .chain(blocks.iter().map(|(state, _)| state.as_str()))
        .chain(
            blocks
                .iter()
                .flat_map(|(_, rules)| rules.iter().map(|rule| rule.next.as_str())),
        )
        .chain(accept.iter().map(String::as_str));

    let mut seen = HashSet::new();
    mentioned
        .filter(|state| seen.insert(*state))
        .map(str::to_string)
        .collect()
}

/// Collects the input symbols, every literal used in a rule, and the blank.
fn infer_alphabet(
    input: Option<&[char]>,
    blocks: &[(String, Vec<ParsedRule>)],
    blank: char,
    wildcard: char,
) -> Vec<char> {
    let used = blocks
        .iter()
        .flat_map(|(_, rules)| rules.iter())
        .flat_map(|rule| rule.read.iter().chain(&rule.write))
        .copied()
        .filter(|&c| c != wildcard);

    let mut seen = HashSet::new();
    input
        .unwrap_or_default()
        .iter()
        .copied()
        .chain(used)
        .chain(std::iter::once(blank))
        .filter(|c| seen.insert(*c))
        .collect()
}

/// Creates a `MachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> MachineError {
    MachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Parses a direction token from a `Pair<Rule::direction>`.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, MachineError> {
    Direction::from_token(pair.as_str()).ok_or_else(|| {
        parse_error(
            &format!("Unsupported direction: {}", pair.as_str()),
            pair.as_span(),
        )
    })
}

/// Parses a single symbol, handling quoted and unquoted forms.
fn parse_symbol(input: &str) -> char {
    let mut chars = input.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('\''), Some(symbol), Some('\'')) => symbol,
        (Some(symbol), _, _) => symbol,
        _ => DEFAULT_BLANK_SYMBOL,
    }
}

/// Parses the symbols of a `Pair<Rule::symbol_list>`.
fn parse_symbols(pair: Pair<Rule>) -> Vec<char> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::symbol)
        .map(|p| parse_symbol(p.as_str()))
        .collect()
}

/// Parses the names of a `Pair<Rule::identifiers>`.
fn parse_identifiers(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
        .collect()
}

fn parse_count(pair: Pair<Rule>) -> Result<usize, MachineError> {
    let span = pair.as_span();
    let digits = parse_inner_string(pair);
    digits
        .parse()
        .map_err(|_| parse_error(&format!("Invalid tape count: {digits}"), span))
}

fn first_inner(pair: Pair<Rule>) -> Option<Pair<Rule>> {
    pair.into_inner().next()
}

/// Extracts the inner string content from a `Pair`.
fn parse_inner_string(pair: Pair<Rule>) -> String {
    first_inner(pair)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

/// Checks if a given header has already been declared.
fn check_unique_rule(
    kind: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), MachineError> {
    if !matches!(
        kind,
        Rule::name
            | Rule::tapes
            | Rule::blank
            | Rule::wildcard
            | Rule::states
            | Rule::input
            | Rule::alphabet
            | Rule::start
            | Rule::accept
    ) {
        return Ok(());
    };

    if !seen.insert(kind) {
        return Err(parse_error(
            &format!("Duplicate \"{kind:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PatternSymbol, WriteSymbol};

    #[test]
    fn test_parse_simple_program() {
        let input = r#"
name: Simple Test
accept: halt
rules:
  start:
    a -> b, R, halt
"#;

        let description = parse(input).unwrap();
        assert_eq!(description.name(), "Simple Test");
        assert_eq!(description.tape_count(), 1);
        assert_eq!(description.states(), &["start", "halt"]);
        assert_eq!(description.tape_alphabet(), &['a', 'b', '_']);
        assert_eq!(description.input_alphabet(), &['a', 'b']);
        assert_eq!(description.state_name(description.initial_state()), "start");
        assert!(description.is_accepting(description.state_id("halt").unwrap()));
    }

    #[test]
    fn test_parse_multi_tape_program() {
        let input = r#"
name: Simple Multi-Tape
tapes: 2
states: [start, halt]
input: [a]
alphabet: [a, b, _]
start: start
accept: [halt]
rules:
  start:
    [a, *] -> [*, b], [R, S], start
    [_, *] -> [*, *], [S, S], halt
  halt:
"#;

        let description = parse(input).unwrap();
        let start = description.state_id("start").unwrap();
        let rules = description.transitions_for(start);

        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].pattern.symbols(),
            &[PatternSymbol::Literal('a'), PatternSymbol::Any]
        );
        assert_eq!(
            rules[0].action.write,
            vec![WriteSymbol::Keep, WriteSymbol::Literal('b')]
        );
        assert_eq!(rules[0].action.moves, vec![Direction::Right, Direction::Stay]);
        assert!(description
            .transitions_for(description.state_id("halt").unwrap())
            .is_empty());
    }

    #[test]
    fn test_parse_infers_tape_count_from_rules() {
        let input = r#"
rules:
  q0:
    [a, b, c] -> [*, *, *], [S, S, S], q0
"#;
        let document = parse_document(input).unwrap();
        assert_eq!(document.tape_count, 3);
    }

    #[test]
    fn test_parse_quoted_symbols_and_comments() {
        let input = r#"
# Spaces and hashes have to be quoted.
name: Quoted # trailing comment
accept: [done]
rules:
  scan:
    ' ' -> '#', R, scan   # replace spaces
    x -> x, R, scan
    _ -> _, S, done
"#;

        let description = parse(input).unwrap();
        assert_eq!(description.name(), "Quoted");

        let scan = description.state_id("scan").unwrap();
        let first = &description.transitions_for(scan)[0];
        assert_eq!(first.pattern.symbols(), &[PatternSymbol::Literal(' ')]);
        assert_eq!(first.action.write, vec![WriteSymbol::Literal('#')]);
    }

    #[test]
    fn test_parse_custom_wildcard() {
        let input = r#"
wildcard: ?
accept: [done]
rules:
  start:
    ? -> ?, R, done
"#;

        let description = parse(input).unwrap();
        assert_eq!(description.wildcard(), '?');

        let start = description.state_id("start").unwrap();
        let rule = &description.transitions_for(start)[0];
        assert_eq!(rule.pattern.symbols(), &[PatternSymbol::Any]);
        assert_eq!(rule.action.write, vec![WriteSymbol::Keep]);
    }

    #[test]
    fn test_parse_duplicate_section() {
        let input = r#"
name: First Name
name: Second Name
rules:
  start:
    a -> b, R, halt
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, MachineError::ParseError(_)));
        assert!(error
            .to_string()
            .contains("Duplicate \"name:\" declaration"));
    }

    #[test]
    fn test_parse_single_transition_line() {
        let pair = DescriptionParser::parse(Rule::transition, "[a, _] -> [b, *], [R, L], done")
            .unwrap()
            .next()
            .unwrap();

        let rule = parse_rule(pair).unwrap();
        assert_eq!(rule.read, vec!['a', '_']);
        assert_eq!(rule.write, vec!['b', '*']);
        assert_eq!(rule.moves, vec![Direction::Right, Direction::Left]);
        assert_eq!(rule.next, "done");
    }

    #[test]
    fn test_parse_missing_rules() {
        let error = parse("name: Missing Rules\n").unwrap_err();
        assert!(matches!(error, MachineError::ParseError(_)));
    }

    #[test]
    fn test_parse_duplicate_state_block() {
        let input = r#"
rules:
  start:
    a -> b, R, halt
  start:
    b -> a, L, start
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, MachineError::ParseError(_)));
        assert!(error
            .to_string()
            .contains("Duplicate transition rule: start"));
    }

    #[test]
    fn test_parse_inconsistent_multi_tape_action() {
        let input = r#"
rules:
  start:
    [a, b] -> [c], [R, R], halt
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, MachineError::ParseError(_)));
        assert!(error
            .to_string()
            .contains("Inconsistent multi-tape action: read=2, write=1, directions=2"));
    }

    #[test]
    fn test_parse_unsupported_direction() {
        let input = r#"
rules:
  start:
    a -> b, X, halt
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, MachineError::ParseError(_)));
    }

    #[test]
    fn test_parse_tape_count_mismatch_is_malformed() {
        let input = r#"
tapes: 2
rules:
  start:
    a -> b, R, start
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, MachineError::MalformedDescription(_)));
    }

    #[test]
    fn test_parse_dangling_accepting_state_is_inferred() {
        let input = r#"
accept: [elsewhere]
rules:
  start:
    a -> a, R, start
"#;
        let description = parse(input).unwrap();
        assert_eq!(description.states(), &["start", "elsewhere"]);
    }
}
