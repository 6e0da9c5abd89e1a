//! This module defines `MachineDescription`, the validated and compiled form of a machine's formal
//! definition: states, alphabets, tape count, initial and accepting states, and the transition table.
//!
//! A description is immutable once built and holds no per-run state, so one instance can be shared
//! by reference across any number of concurrent runs.

use std::collections::{HashMap, HashSet};

use crate::document::{ActionRecord, DescriptionDocument, OrderedMap};
use crate::types::{
    Direction, MachineError, PatternKey, PatternSymbol, StateId, Transition, TransitionAction,
    WriteSymbol, PATTERN_SEPARATOR,
};

/// The transitions declared for one state.
///
/// `rules` keeps authoring order for wildcard resolution; `exact` indexes the fully literal patterns
/// so an exact match can be found without scanning.
#[derive(Debug, Clone, Default)]
struct StateTransitions {
    rules: Vec<Transition>,
    exact: HashMap<Vec<char>, usize>,
}

/// A validated multi-tape Turing machine.
#[derive(Debug, Clone)]
pub struct MachineDescription {
    name: String,
    summary: String,
    states: Vec<String>,
    state_ids: HashMap<String, StateId>,
    input_alphabet: Vec<char>,
    tape_alphabet: Vec<char>,
    tape_count: usize,
    blank: char,
    wildcard: char,
    unchanged: char,
    initial_state: StateId,
    accepting: Vec<bool>,
    transitions: Vec<StateTransitions>,
}

impl MachineDescription {
    /// Loads a description from its JSON form.
    pub fn from_json(content: &str) -> Result<Self, MachineError> {
        let document = DescriptionDocument::from_json(content)
            .map_err(|e| MachineError::malformed(e.to_string()))?;
        Self::from_document(&document)
    }

    /// Validates a document and compiles it into a description.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::MalformedDescription` when a state reference dangles, a symbol is not in
    /// the tape alphabet, a pattern or action has the wrong arity, a pattern key is repeated within a
    /// state, or a token is not a single character.
    pub fn from_document(document: &DescriptionDocument) -> Result<Self, MachineError> {
        let tape_count = document.tape_count;
        if tape_count == 0 {
            return Err(MachineError::malformed("tape count must be at least 1"));
        }

        let (states, state_ids) = compile_states(&document.states)?;

        let blank = parse_token(&document.blank, "blank symbol")?;
        let wildcard = parse_token(&document.wildcard, "wildcard token")?;
        let unchanged = parse_token(&document.unchanged, "unchanged token")?;

        let tape_alphabet = compile_alphabet(&document.tape_alphabet, "tape alphabet")?;
        let input_alphabet = compile_alphabet(&document.input_alphabet, "input alphabet")?;
        let symbols: HashSet<char> = tape_alphabet.iter().copied().collect();

        if let Some(symbol) = input_alphabet.iter().find(|c| !symbols.contains(c)) {
            return Err(MachineError::malformed(format!(
                "input symbol '{symbol}' is not in the tape alphabet"
            )));
        }
        if !symbols.contains(&blank) {
            return Err(MachineError::malformed(format!(
                "blank symbol '{blank}' is not in the tape alphabet"
            )));
        }
        for (reserved, what) in [
            (wildcard, "wildcard token"),
            (unchanged, "unchanged token"),
            (PATTERN_SEPARATOR, "pattern separator"),
        ] {
            if symbols.contains(&reserved) {
                return Err(MachineError::malformed(format!(
                    "{what} '{reserved}' cannot be a tape symbol"
                )));
            }
        }

        let lookup = |name: &str, role: &str| {
            state_ids.get(name).copied().ok_or_else(|| {
                MachineError::malformed(format!("{role} '{name}' is not a declared state"))
            })
        };

        let initial_state = lookup(&document.initial_state, "initial state")?;

        let mut accepting = vec![false; states.len()];
        for name in &document.accepting_states {
            accepting[lookup(name, "accepting state")?.0] = true;
        }

        let mut transitions = vec![StateTransitions::default(); states.len()];
        let mut seen_sources = HashSet::new();
        for (source, rules) in document.transitions.iter() {
            let id = lookup(source, "transition source")?;
            if !seen_sources.insert(id) {
                return Err(MachineError::malformed(format!(
                    "transitions for state '{source}' are declared twice"
                )));
            }

            let context = RuleContext {
                tape_count,
                wildcard,
                unchanged,
                symbols: &symbols,
            };
            transitions[id.0] = compile_rules(source, rules, &context, &lookup)?;
        }

        Ok(Self {
            name: document.name.clone(),
            summary: document.description.clone(),
            states,
            state_ids,
            input_alphabet,
            tape_alphabet,
            tape_count,
            blank,
            wildcard,
            unchanged,
            initial_state,
            accepting,
            transitions,
        })
    }

    /// Renders the description back into its serializable document form.
    pub fn to_document(&self) -> DescriptionDocument {
        let mut document = DescriptionDocument::new(self.name.clone(), self.tape_count);
        document.description = self.summary.clone();
        document.states = self.states.clone();
        document.input_alphabet = self.input_alphabet.iter().map(char::to_string).collect();
        document.tape_alphabet = self.tape_alphabet.iter().map(char::to_string).collect();
        document.initial_state = self.state_name(self.initial_state).to_string();
        document.accepting_states = self
            .accepting_states()
            .map(|id| self.state_name(id).to_string())
            .collect();
        document.blank = self.blank.to_string();
        document.wildcard = self.wildcard.to_string();
        document.unchanged = self.unchanged.to_string();

        for id in self.state_ids() {
            let rules = self.transitions_for(id);
            if rules.is_empty() {
                continue;
            }

            let mut table = OrderedMap::new();
            for transition in rules {
                table.push(
                    transition.pattern.render(self.wildcard),
                    self.action_record(&transition.action),
                );
            }
            document
                .transitions
                .push(self.state_name(id).to_string(), table);
        }

        document
    }

    fn action_record(&self, action: &TransitionAction) -> ActionRecord {
        ActionRecord {
            write: action
                .write
                .iter()
                .map(|symbol| match symbol {
                    WriteSymbol::Keep => self.unchanged.to_string(),
                    WriteSymbol::Literal(c) => c.to_string(),
                })
                .collect(),
            moves: action.moves.iter().map(|d| d.token().to_string()).collect(),
            next_state: self.state_name(action.next_state).to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The free-text `description` of the source document, empty when it had none.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// State names in declaration order.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len()).map(StateId)
    }

    /// Returns the name of a state.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this description.
    pub fn state_name(&self, id: StateId) -> &str {
        &self.states[id.0]
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.state_ids.get(name).copied()
    }

    pub fn input_alphabet(&self) -> &[char] {
        &self.input_alphabet
    }

    pub fn tape_alphabet(&self) -> &[char] {
        &self.tape_alphabet
    }

    pub fn tape_count(&self) -> usize {
        self.tape_count
    }

    pub fn blank(&self) -> char {
        self.blank
    }

    pub fn wildcard(&self) -> char {
        self.wildcard
    }

    pub fn unchanged(&self) -> char {
        self.unchanged
    }

    pub fn initial_state(&self) -> StateId {
        self.initial_state
    }

    pub fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.state_ids().filter(|id| self.accepting[id.0])
    }

    pub fn is_accepting(&self, id: StateId) -> bool {
        self.accepting.get(id.0).copied().unwrap_or(false)
    }

    /// Returns the transitions of a state in authoring order.
    ///
    /// A state without outgoing transitions yields an empty slice; the engine reads that as "no move
    /// defined" and rejects.
    pub fn transitions_for(&self, id: StateId) -> &[Transition] {
        self.transitions
            .get(id.0)
            .map(|t| t.rules.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the transition whose pattern is exactly `symbols`, with no wildcard.
    pub fn exact_transition(&self, id: StateId, symbols: &[char]) -> Option<&Transition> {
        let state = self.transitions.get(id.0)?;
        state.exact.get(symbols).map(|&index| &state.rules[index])
    }

    /// Total number of transitions across all states.
    pub fn transition_count(&self) -> usize {
        self.transitions.iter().map(|t| t.rules.len()).sum()
    }
}

/// Symbol-level settings shared by every rule of a description.
struct RuleContext<'a> {
    tape_count: usize,
    wildcard: char,
    unchanged: char,
    symbols: &'a HashSet<char>,
}

fn compile_states(names: &[String]) -> Result<(Vec<String>, HashMap<String, StateId>), MachineError> {
    if names.is_empty() {
        return Err(MachineError::malformed("no states declared"));
    }

    let mut ids = HashMap::new();
    for (index, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(MachineError::malformed("state names cannot be empty"));
        }
        if ids.insert(name.clone(), StateId(index)).is_some() {
            return Err(MachineError::malformed(format!(
                "state '{name}' is declared twice"
            )));
        }
    }

    Ok((names.to_vec(), ids))
}

fn compile_alphabet(tokens: &[String], what: &str) -> Result<Vec<char>, MachineError> {
    let mut seen = HashSet::new();
    let mut alphabet = Vec::with_capacity(tokens.len());

    for token in tokens {
        let symbol = parse_token(token, &format!("{what} symbol"))?;
        if !seen.insert(symbol) {
            return Err(MachineError::malformed(format!(
                "{what} lists '{symbol}' twice"
            )));
        }
        alphabet.push(symbol);
    }

    Ok(alphabet)
}

fn compile_rules<F>(
    source: &str,
    rules: &OrderedMap<String, ActionRecord>,
    context: &RuleContext,
    lookup: &F,
) -> Result<StateTransitions, MachineError>
where
    F: Fn(&str, &str) -> Result<StateId, MachineError>,
{
    let mut compiled = StateTransitions::default();
    let mut seen = HashSet::new();

    for (pattern, record) in rules.iter() {
        let key = compile_pattern(source, pattern, context)?;
        if !seen.insert(key.clone()) {
            return Err(MachineError::malformed(format!(
                "state '{source}': pattern '{pattern}' is declared twice"
            )));
        }

        let action = compile_action(source, pattern, record, context, lookup)?;

        if let Some(literals) = key.as_literals() {
            compiled.exact.insert(literals, compiled.rules.len());
        }
        compiled.rules.push(Transition {
            pattern: key,
            action,
        });
    }

    Ok(compiled)
}

fn compile_pattern(
    source: &str,
    pattern: &str,
    context: &RuleContext,
) -> Result<PatternKey, MachineError> {
    let components: Vec<&str> = pattern.split(PATTERN_SEPARATOR).collect();
    if components.len() != context.tape_count {
        return Err(MachineError::malformed(format!(
            "state '{source}': pattern '{pattern}' names {} symbols, expected {}",
            components.len(),
            context.tape_count
        )));
    }

    components
        .into_iter()
        .map(|component| {
            let symbol = parse_token(component, &format!("state '{source}': pattern symbol"))?;
            if symbol == context.wildcard {
                Ok(PatternSymbol::Any)
            } else {
                check_symbol(source, symbol, context).map(|_| PatternSymbol::Literal(symbol))
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(PatternKey)
}

fn compile_action<F>(
    source: &str,
    pattern: &str,
    record: &ActionRecord,
    context: &RuleContext,
    lookup: &F,
) -> Result<TransitionAction, MachineError>
where
    F: Fn(&str, &str) -> Result<StateId, MachineError>,
{
    if record.write.len() != context.tape_count || record.moves.len() != context.tape_count {
        return Err(MachineError::malformed(format!(
            "state '{source}', pattern '{pattern}': action has {} writes and {} moves, expected {}",
            record.write.len(),
            record.moves.len(),
            context.tape_count
        )));
    }

    let write = record
        .write
        .iter()
        .map(|token| {
            let symbol = parse_token(token, &format!("state '{source}': write symbol"))?;
            if symbol == context.unchanged {
                Ok(WriteSymbol::Keep)
            } else {
                check_symbol(source, symbol, context).map(|_| WriteSymbol::Literal(symbol))
            }
        })
        .collect::<Result<Vec<_>, MachineError>>()?;

    let moves = record
        .moves
        .iter()
        .map(|token| {
            Direction::from_token(token).ok_or_else(|| {
                MachineError::malformed(format!(
                    "state '{source}', pattern '{pattern}': unsupported direction '{token}'"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let next_state = lookup(&record.next_state, "next state")?;

    Ok(TransitionAction {
        write,
        moves,
        next_state,
    })
}

fn check_symbol(source: &str, symbol: char, context: &RuleContext) -> Result<(), MachineError> {
    if context.symbols.contains(&symbol) {
        Ok(())
    } else {
        Err(MachineError::malformed(format!(
            "state '{source}': symbol '{symbol}' is not in the tape alphabet"
        )))
    }
}

/// Reads a token that must hold exactly one character.
fn parse_token(token: &str, what: &str) -> Result<char, MachineError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(symbol), None) => Ok(symbol),
        _ => Err(MachineError::malformed(format!(
            "{what} '{token}' must be exactly one character"
        ))),
    }
}
