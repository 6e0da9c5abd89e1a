//! This module provides static checks over a validated `MachineDescription`. Loading already
//! rejects everything that makes a description unusable; the findings reported here point at
//! tables that load fine but probably do not do what their author intended: states that can never
//! be entered, states where every visit rejects, and wildcard rules that can never fire.

use std::collections::HashSet;
use std::fmt;

use crate::description::MachineDescription;
use crate::types::{PatternKey, StateId};

/// Represents a suspicious construct found in a description.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Finding {
    /// States that cannot be reached from the initial state through any sequence of transitions.
    UnreachableStates(Vec<String>),
    /// Reachable, non-accepting states without any outgoing transition. Every visit rejects.
    DeadEndStates(Vec<String>),
    /// A wildcard rule that never fires because an earlier rule of the same state matches every
    /// symbol combination it does.
    ShadowedTransition {
        state: String,
        pattern: String,
        shadowed_by: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UnreachableStates(states) => {
                write!(f, "Unreachable states detected: {}", states.join(", "))
            }
            Finding::DeadEndStates(states) => write!(
                f,
                "States without transitions that are not accepting: {}",
                states.join(", ")
            ),
            Finding::ShadowedTransition {
                state,
                pattern,
                shadowed_by,
            } => write!(
                f,
                "Transition '{pattern}' in state '{state}' is shadowed by '{shadowed_by}'"
            ),
        }
    }
}

/// Analyzes a description and returns every finding, in a deterministic order.
///
/// An empty result means nothing suspicious was found. Findings never make a description
/// unusable; the engine runs it either way.
pub fn analyze(description: &MachineDescription) -> Vec<Finding> {
    let reachable = reachable_states(description);

    let mut findings = Vec::new();
    findings.extend(check_unreachable_states(description, &reachable));
    findings.extend(check_dead_end_states(description, &reachable));
    findings.extend(check_shadowed_transitions(description));
    findings
}

/// Collects the states reachable from the initial state with a depth-first traversal.
fn reachable_states(description: &MachineDescription) -> HashSet<StateId> {
    let mut visited = HashSet::new();
    let mut stack = vec![description.initial_state()];

    while let Some(state) = stack.pop() {
        if !visited.insert(state) {
            continue;
        }

        for transition in description.transitions_for(state) {
            if !visited.contains(&transition.action.next_state) {
                stack.push(transition.action.next_state);
            }
        }
    }

    visited
}

/// Reports declared states that no run can ever enter.
fn check_unreachable_states(
    description: &MachineDescription,
    reachable: &HashSet<StateId>,
) -> Option<Finding> {
    let unreachable: Vec<String> = description
        .state_ids()
        .filter(|id| !reachable.contains(id))
        .map(|id| description.state_name(id).to_string())
        .collect();

    (!unreachable.is_empty()).then_some(Finding::UnreachableStates(unreachable))
}

/// Reports reachable states that reject on every visit.
fn check_dead_end_states(
    description: &MachineDescription,
    reachable: &HashSet<StateId>,
) -> Option<Finding> {
    let dead_ends: Vec<String> = description
        .state_ids()
        .filter(|id| reachable.contains(id))
        .filter(|&id| !description.is_accepting(id) && description.transitions_for(id).is_empty())
        .map(|id| description.state_name(id).to_string())
        .collect();

    (!dead_ends.is_empty()).then_some(Finding::DeadEndStates(dead_ends))
}

/// Reports wildcard rules covered by an earlier wildcard rule of the same state.
///
/// Fully literal rules are looked up before any wildcard rule, so they can never be shadowed, and
/// they never shadow a wildcard rule either.
fn check_shadowed_transitions(description: &MachineDescription) -> Vec<Finding> {
    let wildcard = description.wildcard();
    let mut findings = Vec::new();

    for id in description.state_ids() {
        let wildcard_rules: Vec<&PatternKey> = description
            .transitions_for(id)
            .iter()
            .map(|transition| &transition.pattern)
            .filter(|pattern| pattern.as_literals().is_none())
            .collect();

        for (index, pattern) in wildcard_rules.iter().enumerate() {
            if let Some(earlier) = wildcard_rules[..index].iter().find(|e| e.covers(pattern)) {
                findings.push(Finding::ShadowedTransition {
                    state: description.state_name(id).to_string(),
                    pattern: pattern.render(wildcard),
                    shadowed_by: earlier.render(wildcard),
                });
            }
        }
    }

    findings
}
