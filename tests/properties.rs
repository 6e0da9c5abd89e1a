//! Property-based tests for the execution engine.
//!
//! These tests use proptest to check that runs are total and deterministic, that heads clamp at
//! the left boundary, that tape growth is invisible to the machine, and that the step budget only
//! ever cuts a run short.

use mtur::{
    apply, run, DescriptionDocument, Direction, ExecutionState, MachineDescription, Outcome,
    RunConfig, Tape, TransitionAction, WriteSymbol,
};
use proptest::prelude::*;

const SYMBOLS: [&str; 3] = ["0", "1", "_"];
const STATES: [&str; 4] = ["q0", "q1", "q2", "accept"];
const MOVES: [&str; 3] = ["L", "R", "S"];

/// One optional rule per (non-accepting state, symbol): write index, move index, next state index.
type RuleTable = Vec<Option<(usize, usize, usize)>>;

prop_compose! {
    fn arbitrary_rules()(
        rules in prop::collection::vec(
            prop::option::weighted(0.8, (0..3usize, 0..3usize, 0..STATES.len())),
            3 * 3,
        )
    ) -> RuleTable {
        rules
    }
}

fn arbitrary_input() -> impl Strategy<Value = String> {
    "[01]{0,12}"
}

fn build_description(rules: &RuleTable) -> MachineDescription {
    let mut document = DescriptionDocument::new("Random", 1);
    document.states = STATES.iter().map(|s| s.to_string()).collect();
    document.input_alphabet = vec!["0".into(), "1".into()];
    document.tape_alphabet = SYMBOLS.iter().map(|s| s.to_string()).collect();
    document.initial_state = "q0".into();
    document.accepting_states = vec!["accept".into()];

    for (index, rule) in rules.iter().enumerate() {
        if let Some((write, direction, next)) = rule {
            document.add_rule(
                STATES[index / 3],
                SYMBOLS[index % 3],
                &[SYMBOLS[*write]],
                &[MOVES[*direction]],
                STATES[*next],
            );
        }
    }

    MachineDescription::from_document(&document).unwrap()
}

fn run_to_end(
    description: &MachineDescription,
    input: &str,
    max_steps: usize,
) -> (mtur::RunResult, String) {
    let mut execution = ExecutionState::new(description, &[input]).unwrap();
    let result = run(description, &mut execution, &RunConfig::new(max_steps));
    let tape = execution.tape_content(0, false).unwrap();
    (result, tape)
}

proptest! {
    #[test]
    fn run_is_total_and_respects_budget(
        rules in arbitrary_rules(),
        input in arbitrary_input(),
        max_steps in 0..400usize,
    ) {
        let description = build_description(&rules);
        let (result, _) = run_to_end(&description, &input, max_steps);

        prop_assert!(result.steps <= max_steps);
        if result.outcome == Outcome::StepLimitExceeded {
            prop_assert_eq!(result.steps, max_steps);
        }
    }

    #[test]
    fn run_is_deterministic(
        rules in arbitrary_rules(),
        input in arbitrary_input(),
        max_steps in 0..400usize,
    ) {
        let description = build_description(&rules);
        let first = run_to_end(&description, &input, max_steps);
        let second = run_to_end(&description, &input, max_steps);

        prop_assert_eq!(first, second);
    }

    #[test]
    fn larger_budget_reproduces_halting_run(
        rules in arbitrary_rules(),
        input in arbitrary_input(),
        extra in 0..50usize,
    ) {
        let description = build_description(&rules);
        let (unbounded, tape) = run_to_end(&description, &input, 2_000);
        if unbounded.outcome == Outcome::StepLimitExceeded {
            return Ok(());
        }

        let (bounded, bounded_tape) = run_to_end(&description, &input, unbounded.steps + extra);
        prop_assert_eq!(&bounded, &unbounded);
        prop_assert_eq!(bounded_tape, tape);

        if unbounded.steps > 0 {
            let (short, _) = run_to_end(&description, &input, unbounded.steps - 1);
            prop_assert_eq!(short.outcome, Outcome::StepLimitExceeded);
        }
    }

    #[test]
    fn left_moves_clamp_at_zero(moves in prop::collection::vec(0..3usize, 0..200)) {
        let description = build_description(&vec![None; 9]);
        let mut execution = ExecutionState::new(&description, &["01"]).unwrap();
        let state = description.initial_state();

        let mut expected = 0usize;
        for index in moves {
            let direction = [Direction::Left, Direction::Right, Direction::Stay][index];
            apply(
                &mut execution,
                &TransitionAction {
                    write: vec![WriteSymbol::Keep],
                    moves: vec![direction],
                    next_state: state,
                },
            );

            expected = match direction {
                Direction::Left => expected.saturating_sub(1),
                Direction::Right => expected + 1,
                Direction::Stay => expected,
            };
            prop_assert_eq!(execution.heads(), vec![expected]);
        }
    }

    #[test]
    fn tape_growth_is_transparent(content in "[01]{0,20}", distance in 0..3_500usize) {
        let mut tape = Tape::new(&content, '_');
        for _ in 0..distance {
            tape.shift(Direction::Right);
        }

        let expected = content.chars().nth(distance).unwrap_or('_');
        prop_assert_eq!(tape.read(), expected);
        prop_assert_eq!(tape.content(true), content.trim_end_matches('_'));
        prop_assert_eq!(tape.content(false).len(), content.len().max(distance + 1));
    }
}
