//! This module contains the execution engine: the per-run `ExecutionState`, transition matching,
//! the apply step and the run loop, plus `TuringMachine`, a convenience wrapper that pairs a
//! borrowed description with one execution state.
//!
//! Every engine function takes the description by shared reference and the execution state by
//! exclusive reference, so any number of runs can share one description.

use tracing::{debug, info, trace, warn};

use crate::config::RunConfig;
use crate::description::MachineDescription;
use crate::tape::{Tape, TapeSet};
use crate::types::{
    Halt, MachineError, Outcome, Rejection, RunResult, StateId, Step, Transition,
    TransitionAction, WriteSymbol,
};

/// Steps always logged when tracing is enabled.
const TRACE_WARMUP_STEPS: usize = 100;
/// After the warm-up, every n-th step is logged.
const TRACE_INTERVAL: usize = 1000;

/// The mutable configuration of one run: current state, step count and tapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    state: StateId,
    step_count: usize,
    tapes: TapeSet,
}

impl ExecutionState {
    /// Creates the initial configuration of a run.
    ///
    /// Tape `i` is seeded with `contents[i]`; tapes without contents start blank. All heads start at
    /// position 0 and the machine starts in the description's initial state.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::InvalidTapeIndex` if more contents than tapes are supplied.
    pub fn new<S: AsRef<str>>(
        description: &MachineDescription,
        contents: &[S],
    ) -> Result<Self, MachineError> {
        Ok(Self {
            state: description.initial_state(),
            step_count: 0,
            tapes: TapeSet::new(description.tape_count(), contents, description.blank())?,
        })
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn tapes(&self) -> &TapeSet {
        &self.tapes
    }

    pub fn heads(&self) -> Vec<usize> {
        self.tapes.heads()
    }

    /// Returns the symbols under every head.
    pub fn symbols(&self) -> Vec<char> {
        self.tapes.read()
    }

    /// Returns the content of one tape, optionally without trailing blanks.
    pub fn tape_content(&self, index: usize, trim_blanks: bool) -> Result<String, MachineError> {
        self.tapes.get(index).map(|tape| tape.content(trim_blanks))
    }

    fn result(&self, description: &MachineDescription, outcome: Outcome) -> RunResult {
        RunResult {
            outcome,
            state: description.state_name(self.state).to_string(),
            steps: self.step_count,
            heads: self.heads(),
            symbols: self.symbols(),
        }
    }
}

/// Finds the transition to apply for `symbols` in `state`.
///
/// A pattern made only of literals that equals `symbols` wins outright. Otherwise the state's
/// transitions are scanned in authoring order and the first one whose every component is a wildcard
/// or equals the symbol read wins. `None` means the machine rejects.
pub fn find_transition<'d>(
    description: &'d MachineDescription,
    state: StateId,
    symbols: &[char],
) -> Option<&'d Transition> {
    description.exact_transition(state, symbols).or_else(|| {
        description
            .transitions_for(state)
            .iter()
            .find(|transition| transition.pattern.matches(symbols))
    })
}

/// Applies a transition: writes, then head moves, then the state change.
///
/// `action` must carry one write and one move per tape; descriptions guarantee this, hand-built
/// actions are checked in debug builds.
pub fn apply(execution: &mut ExecutionState, action: &TransitionAction) {
    debug_assert_eq!(action.write.len(), execution.tapes.len(), "one write per tape");
    debug_assert_eq!(action.moves.len(), execution.tapes.len(), "one move per tape");

    for ((tape, write), direction) in execution
        .tapes
        .iter_mut()
        .zip(&action.write)
        .zip(&action.moves)
    {
        if let WriteSymbol::Literal(symbol) = write {
            tape.write(*symbol);
        }
        tape.shift(*direction);
    }

    execution.state = action.next_state;
    execution.step_count += 1;
}

/// Returns the action the machine would take next, or why it cannot take one.
fn next_action<'d>(
    description: &'d MachineDescription,
    execution: &ExecutionState,
) -> Result<&'d TransitionAction, Halt> {
    if description.is_accepting(execution.state) {
        return Err(Halt::Accepted);
    }

    let symbols = execution.symbols();
    match find_transition(description, execution.state, &symbols) {
        Some(transition) => Ok(&transition.action),
        None => Err(Halt::Rejected(Rejection {
            state: description.state_name(execution.state).to_string(),
            symbols,
        })),
    }
}

/// Executes a single step.
///
/// Acceptance is checked before matching, so an accepting state needs no outgoing transition.
///
/// # Returns
///
/// * `Step::Continue` if a transition was applied.
/// * `Step::Halt(Halt::Accepted)` if the current state is accepting.
/// * `Step::Halt(Halt::Rejected(_))` if no transition matches.
pub fn step(description: &MachineDescription, execution: &mut ExecutionState) -> Step {
    match next_action(description, execution) {
        Ok(action) => {
            trace!(
                step = execution.step_count,
                state = description.state_name(execution.state),
                next = description.state_name(action.next_state),
                "applying transition"
            );
            apply(execution, action);
            Step::Continue
        }
        Err(halt) => Step::Halt(halt),
    }
}

/// Runs until the machine accepts, rejects, or would need more than `config.max_steps` steps.
///
/// The budget counts applied transitions over the whole life of `execution`. It is only checked
/// when another transition is actually needed, so a machine that halts exactly at the budget still
/// reports its real outcome.
pub fn run(
    description: &MachineDescription,
    execution: &mut ExecutionState,
    config: &RunConfig,
) -> RunResult {
    loop {
        let action = match next_action(description, execution) {
            Ok(action) => action,
            Err(Halt::Accepted) => {
                debug!(
                    state = description.state_name(execution.state),
                    steps = execution.step_count,
                    "machine accepted"
                );
                return execution.result(description, Outcome::Accepted);
            }
            Err(Halt::Rejected(rejection)) => {
                debug!(
                    state = %rejection.state,
                    symbols = ?rejection.symbols,
                    steps = execution.step_count,
                    "no transition matches, machine rejected"
                );
                return execution.result(description, Outcome::Rejected);
            }
        };

        if execution.step_count >= config.max_steps {
            warn!(
                max_steps = config.max_steps,
                state = description.state_name(execution.state),
                heads = ?execution.heads(),
                "step limit exceeded"
            );
            return execution.result(description, Outcome::StepLimitExceeded);
        }

        if config.trace
            && (execution.step_count < TRACE_WARMUP_STEPS
                || execution.step_count % TRACE_INTERVAL == 0)
        {
            info!(
                step = execution.step_count,
                state = description.state_name(execution.state),
                symbols = ?execution.symbols(),
                heads = ?execution.heads(),
                "step"
            );
        }

        apply(execution, action);
    }
}

/// Represents one run of a multi-tape Turing Machine over a borrowed description.
///
/// This pairs the description with an `ExecutionState` and keeps a copy of the initial
/// configuration so the run can be reset.
#[derive(Debug, Clone)]
pub struct TuringMachine<'d> {
    description: &'d MachineDescription,
    initial: ExecutionState,
    execution: ExecutionState,
}

impl<'d> TuringMachine<'d> {
    /// Creates a machine ready to run `description` on the given tape contents.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::InvalidTapeIndex` if more contents than tapes are supplied.
    pub fn new<S: AsRef<str>>(
        description: &'d MachineDescription,
        contents: &[S],
    ) -> Result<Self, MachineError> {
        let initial = ExecutionState::new(description, contents)?;
        Ok(Self {
            description,
            execution: initial.clone(),
            initial,
        })
    }

    /// Executes a single step. See [`step`].
    pub fn step(&mut self) -> Step {
        step(self.description, &mut self.execution)
    }

    /// Runs the machine to a terminal outcome. See [`run`].
    pub fn run(&mut self, config: &RunConfig) -> RunResult {
        run(self.description, &mut self.execution, config)
    }

    /// Resets state, tapes, heads and step count to the initial configuration.
    pub fn reset(&mut self) {
        self.execution = self.initial.clone();
    }

    pub fn description(&self) -> &'d MachineDescription {
        self.description
    }

    /// Returns the name of the current state.
    pub fn state(&self) -> &str {
        self.description.state_name(self.execution.state)
    }

    pub fn state_id(&self) -> StateId {
        self.execution.state
    }

    pub fn is_accepting(&self) -> bool {
        self.description.is_accepting(self.execution.state)
    }

    pub fn step_count(&self) -> usize {
        self.execution.step_count
    }

    pub fn heads(&self) -> Vec<usize> {
        self.execution.heads()
    }

    pub fn tapes(&self) -> &TapeSet {
        &self.execution.tapes
    }

    /// Returns the symbols currently under each head.
    pub fn symbols(&self) -> Vec<char> {
        self.execution.symbols()
    }

    /// Returns the transition the next step would apply, if any.
    pub fn transition(&self) -> Option<&'d Transition> {
        find_transition(self.description, self.execution.state, &self.symbols())
    }

    pub fn tape_content(&self, index: usize, trim_blanks: bool) -> Result<String, MachineError> {
        self.execution.tape_content(index, trim_blanks)
    }

    /// Returns every tape's content with trailing blanks removed.
    pub fn tape_contents(&self) -> Vec<String> {
        self.execution.tapes.iter().map(|t| t.content(true)).collect()
    }

    /// Replaces the content of one tape and moves its head back to position 0.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::InvalidTapeIndex` if `index` is not below the tape count.
    pub fn set_tape_content(&mut self, index: usize, content: &str) -> Result<(), MachineError> {
        let blank = self.description.blank();
        let tape = self.execution.tapes.get_mut(index)?;
        *tape = Tape::new(content, blank);
        Ok(())
    }

    pub fn execution(&self) -> &ExecutionState {
        &self.execution
    }

    pub fn into_execution(self) -> ExecutionState {
        self.execution
    }
}

#[cfg(test)]
mod multi_tape_tests {
    use super::*;
    use crate::document::DescriptionDocument;
    use crate::types::Direction;

    /// Replaces `a` with `b` on tape 0 and copies it to tape 1, then accepts on the first blank.
    fn create_simple_multi_tape_description() -> MachineDescription {
        let mut document = DescriptionDocument::new("Simple Multi-Tape Test", 2);
        document.states = vec!["start".into(), "halt".into()];
        document.input_alphabet = vec!["a".into(), "b".into()];
        document.tape_alphabet = vec!["a".into(), "b".into(), "-".into()];
        document.blank = "-".into();
        document.initial_state = "start".into();
        document.accepting_states = vec!["halt".into()];
        document
            .add_rule("start", "a,*", &["b", "b"], &["R", "R"], "start")
            .add_rule("start", "-,*", &["*", "*"], &["S", "S"], "halt");

        MachineDescription::from_document(&document).unwrap()
    }

    #[test]
    fn test_multi_tape_machine_creation() {
        let description = create_simple_multi_tape_description();
        let machine = TuringMachine::new(&description, &["aa"]).unwrap();

        assert_eq!(machine.state(), "start");
        assert_eq!(machine.heads(), vec![0, 0]);
        assert_eq!(machine.symbols(), vec!['a', '-']);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_multi_tape_single_step() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["a"]).unwrap();

        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.state(), "start");
        assert_eq!(machine.heads(), vec![1, 1]);
        assert_eq!(machine.tape_contents(), vec!["b", "b"]);
        assert_eq!(machine.step_count(), 1);
    }

    #[test]
    fn test_multi_tape_accepts_after_steps() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["a"]).unwrap();

        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.step(), Step::Continue);
        assert!(machine.is_accepting());
        assert_eq!(machine.step(), Step::Halt(Halt::Accepted));
        assert_eq!(machine.step_count(), 2);
    }

    #[test]
    fn test_multi_tape_rejection() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["b"]).unwrap();

        match machine.step() {
            Step::Halt(Halt::Rejected(rejection)) => {
                assert_eq!(rejection.state, "start");
                assert_eq!(rejection.symbols, vec!['b', '-']);
            }
            result => panic!("Expected a rejection, but got {:?}", result),
        }
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_multi_tape_run_to_completion() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["aaa"]).unwrap();

        let result = machine.run(&RunConfig::default());
        assert_eq!(result.outcome, Outcome::Accepted);
        assert_eq!(result.state, "halt");
        assert_eq!(result.steps, 4);
        assert_eq!(result.heads, vec![3, 3]);
        assert_eq!(machine.tape_content(0, true).unwrap(), "bbb");
        assert_eq!(machine.tape_content(1, false).unwrap(), "bbb-");
    }

    #[test]
    fn test_multi_tape_reset() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["a"]).unwrap();

        machine.run(&RunConfig::default());
        assert_eq!(machine.state(), "halt");

        machine.reset();
        assert_eq!(machine.state(), "start");
        assert_eq!(machine.tape_contents(), vec!["a", ""]);
        assert_eq!(machine.heads(), vec![0, 0]);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_step_limit_reports_partial_configuration() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["aaaa"]).unwrap();

        let result = machine.run(&RunConfig::new(2));
        assert_eq!(result.outcome, Outcome::StepLimitExceeded);
        assert_eq!(result.state, "start");
        assert_eq!(result.steps, 2);
        assert_eq!(result.heads, vec![2, 2]);
        assert_eq!(result.symbols, vec!['a', '-']);
    }

    #[test]
    fn test_halt_exactly_at_budget_reports_real_outcome() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["a"]).unwrap();

        // "a" needs two transitions to reach the accepting state.
        assert_eq!(machine.run(&RunConfig::new(2)).outcome, Outcome::Accepted);
    }

    #[test]
    fn test_run_can_resume_with_larger_budget() {
        let description = create_simple_multi_tape_description();
        let mut execution = ExecutionState::new(&description, &["aaa"]).unwrap();

        let first = run(&description, &mut execution, &RunConfig::new(1));
        assert_eq!(first.outcome, Outcome::StepLimitExceeded);

        let second = run(&description, &mut execution, &RunConfig::new(10));
        assert_eq!(second.outcome, Outcome::Accepted);
        assert_eq!(second.steps, 4);
    }

    #[test]
    fn test_transition_preview() {
        let description = create_simple_multi_tape_description();
        let machine = TuringMachine::new(&description, &["a"]).unwrap();

        let transition = machine.transition().unwrap();
        assert_eq!(transition.action.moves, vec![Direction::Right, Direction::Right]);
    }

    #[test]
    fn test_set_tape_content() {
        let description = create_simple_multi_tape_description();
        let mut machine = TuringMachine::new(&description, &["a"]).unwrap();

        machine.set_tape_content(1, "ab").unwrap();
        assert_eq!(machine.tape_content(1, true).unwrap(), "ab");

        let error = machine.set_tape_content(2, "a").unwrap_err();
        assert_eq!(
            error,
            MachineError::InvalidTapeIndex {
                index: 2,
                tape_count: 2
            }
        );
    }

    #[test]
    fn test_tape_content_invalid_index() {
        let description = create_simple_multi_tape_description();
        let machine = TuringMachine::new(&description, &["a"]).unwrap();

        assert!(matches!(
            machine.tape_content(5, true),
            Err(MachineError::InvalidTapeIndex { index: 5, .. })
        ));
    }

    #[test]
    fn test_too_many_tape_contents() {
        let description = create_simple_multi_tape_description();
        assert!(TuringMachine::new(&description, &["a", "b", "c"]).is_err());
    }

    #[test]
    fn test_apply_keeps_cells_marked_unchanged() {
        let description = create_simple_multi_tape_description();
        let mut execution = ExecutionState::new(&description, &["-", "b"]).unwrap();
        let done = description.state_id("halt").unwrap();

        let action = TransitionAction {
            write: vec![WriteSymbol::Literal('a'), WriteSymbol::Keep],
            moves: vec![Direction::Left, Direction::Stay],
            next_state: done,
        };
        apply(&mut execution, &action);

        assert_eq!(execution.symbols(), vec!['a', 'b']);
        assert_eq!(execution.heads(), vec![0, 0]);
        assert_eq!(execution.state(), done);
        assert_eq!(execution.step_count(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "one write per tape")]
    fn test_apply_rejects_action_for_fewer_tapes() {
        let description = create_simple_multi_tape_description();
        let mut execution = ExecutionState::new(&description, &["a"]).unwrap();

        let action = TransitionAction {
            write: vec![WriteSymbol::Literal('b')],
            moves: vec![Direction::Right],
            next_state: description.initial_state(),
        };
        apply(&mut execution, &action);
    }
}
