//! This module defines the breadth-first simulation of a nondeterministic Turing machine.
//!
//! A [`Simulation`] explores the computation tree level by level. Each queued
//! [`Configuration`] is one node of the tree; processing it either decides the verdict,
//! dead-ends the branch, or enqueues one child per outcome of the matching transition.
//! The step budget counts completed levels, so a level with a thousand branches costs
//! the same single unit as a level with one.

use crate::analyzer::mark_loops;
use crate::driver::pad_input;
use crate::table::{AcceptanceSet, Program, Transition, TransitionTable};
use crate::tape::{TapeArena, TapeHandle};
use crate::types::{SimulationOptions, StateId, Step, TuringMachineError, Verdict, START_STATE};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// One node of the computation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub state: StateId,
    /// Head offset, always inside `[0, length)` once queued.
    pub head: usize,
    /// Length of the tape behind `tape`. Only a widening move changes it.
    pub length: usize,
    pub tape: TapeHandle,
}

/// FIFO of configurations with breadth-level bookkeeping.
///
/// `current` counts the configurations of the level being processed that are still
/// queued, `next` those already enqueued for the following level. Their sum is
/// always the queue length.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Configuration>,
    current: usize,
    next: usize,
}

impl Frontier {
    /// Creates a frontier whose first level is the single `root`.
    pub fn new(root: Configuration) -> Self {
        Self {
            queue: VecDeque::from([root]),
            current: 1,
            next: 0,
        }
    }

    /// Enqueues a configuration for the next level.
    pub fn push(&mut self, config: Configuration) {
        self.queue.push_back(config);
        self.next += 1;
    }

    pub fn front(&self) -> Option<&Configuration> {
        self.queue.front()
    }

    /// Dequeues the front configuration. The flag is `true` when that closed the
    /// current level, in which case the next level becomes current.
    pub fn pop(&mut self) -> Option<(Configuration, bool)> {
        let config = self.queue.pop_front()?;
        self.current -= 1;

        let level_done = self.current == 0;
        if level_done {
            self.current = self.next;
            self.next = 0;
        }

        Some((config, level_done))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Configuration> {
        self.queue.iter()
    }

    /// Drops every queued configuration without touching their tapes.
    fn discard(&mut self) {
        self.queue.clear();
        self.current = 0;
        self.next = 0;
    }
}

/// Counters collected while simulating one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Breadth-first levels fully processed, i.e. budget units spent.
    pub levels: usize,
    /// Configurations taken off the frontier.
    pub examined: usize,
    /// Children that reused their parent's tape.
    pub shared: usize,
    /// Children that received a private copy of the tape.
    pub forked: usize,
    pub peak_frontier: usize,
    pub peak_tapes: usize,
}

/// The state of one bounded breadth-first search.
pub struct Simulation<'a> {
    table: &'a TransitionTable,
    accepting: &'a AcceptanceSet,
    options: SimulationOptions,
    tapes: TapeArena,
    frontier: Frontier,
    budget: usize,
    looping: bool,
    verdict: Option<Verdict>,
    stats: RunStats,
}

impl<'a> Simulation<'a> {
    /// Seeds a search from the start state with `tape` and the head at `head`.
    ///
    /// The tape is widened first if `head` falls outside it.
    pub fn new(
        table: &'a TransitionTable,
        accepting: &'a AcceptanceSet,
        tape: Vec<char>,
        head: usize,
        step_budget: usize,
    ) -> Result<Self, TuringMachineError> {
        let mut tape = tape;
        let mut head = head as isize;
        let length = crate::tape::widen(&mut tape, &mut head)?;

        let mut tapes = TapeArena::new();
        let root = Configuration {
            state: START_STATE,
            head: head as usize,
            length,
            tape: tapes.alloc(tape),
        };

        Ok(Self {
            table,
            accepting,
            options: SimulationOptions::default(),
            tapes,
            frontier: Frontier::new(root),
            budget: step_budget,
            looping: false,
            verdict: None,
            stats: RunStats {
                peak_frontier: 1,
                peak_tapes: 1,
                ..RunStats::default()
            },
        })
    }

    pub fn with_options(mut self, options: SimulationOptions) -> Self {
        self.options = options;
        self
    }

    /// Processes the configuration at the front of the frontier.
    ///
    /// Once a verdict is reached every further call returns it again.
    pub fn step(&mut self) -> Result<Step, TuringMachineError> {
        if let Some(verdict) = self.verdict {
            return Ok(Step::Halt(verdict));
        }

        if self.budget == 0 {
            // Children already queued were reached within the budget.
            let verdict = if self.frontier.iter().any(|c| self.accepting.contains(c.state)) {
                Verdict::Accept
            } else {
                Verdict::Undetermined
            };
            return Ok(self.halt(verdict));
        }

        let Some(config) = self.frontier.front().copied() else {
            let verdict = if self.looping {
                Verdict::Undetermined
            } else {
                Verdict::Reject
            };
            return Ok(self.halt(verdict));
        };

        self.stats.examined += 1;
        trace!(state = config.state, head = config.head, "examining configuration");

        if self.accepting.contains(config.state) {
            return Ok(self.halt(Verdict::Accept));
        }

        if self.table.state(config.state).is_some_and(|s| s.permanent_loop) {
            trace!(state = config.state, "permanent loop");
            self.looping = true;
            self.retire();
            return Ok(Step::Continue);
        }

        let table = self.table;
        let symbol = self.tapes.read(config.tape, config.head);
        if let Some(transition) = table.transition(config.state, symbol) {
            self.expand(&config, transition)?;
        } else {
            trace!(state = config.state, %symbol, "dead end");
        }
        self.retire();

        Ok(Step::Continue)
    }

    /// Steps until a verdict is reached.
    pub fn run(&mut self) -> Result<Verdict, TuringMachineError> {
        loop {
            if let Step::Halt(verdict) = self.step()? {
                return Ok(verdict);
            }
        }
    }

    /// Enqueues one child per outcome of `transition`.
    fn expand(
        &mut self,
        parent: &Configuration,
        transition: &Transition,
    ) -> Result<(), TuringMachineError> {
        let share = self.options.share_tapes && transition.is_deterministic();

        for outcome in &transition.outcomes {
            let tape = if share {
                self.stats.shared += 1;
                self.tapes.share(parent.tape)
            } else {
                self.stats.forked += 1;
                self.tapes.fork(parent.tape)?
            };

            self.tapes.write(tape, parent.head, outcome.write);
            let mut head = parent.head as isize + outcome.direction.delta();
            let length = if head < 0 || head as usize >= parent.length {
                self.tapes.widen(tape, &mut head)?
            } else {
                parent.length
            };

            self.frontier.push(Configuration {
                state: outcome.next_state,
                head: head as usize,
                length,
                tape,
            });
        }

        Ok(())
    }

    /// Dequeues the front configuration, releases its tape, and charges the budget
    /// when that finished a level.
    fn retire(&mut self) {
        if let Some((config, level_done)) = self.frontier.pop() {
            self.tapes.release(config.tape);
            if level_done {
                self.budget -= 1;
                self.stats.levels += 1;
            }
        }

        self.stats.peak_frontier = self.stats.peak_frontier.max(self.frontier.len());
        self.stats.peak_tapes = self.stats.peak_tapes.max(self.tapes.live());
    }

    fn halt(&mut self, verdict: Verdict) -> Step {
        debug!(
            %verdict,
            levels = self.stats.levels,
            examined = self.stats.examined,
            "simulation halted"
        );
        self.verdict = Some(verdict);
        self.frontier.discard();
        Step::Halt(verdict)
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    /// Budget units left.
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Configurations waiting to be processed, front first.
    pub fn frontier(&self) -> impl Iterator<Item = &Configuration> {
        self.frontier.iter()
    }

    pub fn tapes(&self) -> &TapeArena {
        &self.tapes
    }

    /// The tape contents seen by `config`.
    pub fn tape(&self, config: &Configuration) -> &[char] {
        self.tapes.cells(config.tape)
    }
}

/// Decides one input under the default options.
///
/// `tape` is moved into the search, `head` addresses its first examined cell, and
/// `step_budget` bounds the number of breadth-first levels explored.
pub fn simulate(
    table: &TransitionTable,
    accepting: &AcceptanceSet,
    tape: Vec<char>,
    head: usize,
    step_budget: usize,
) -> Result<Verdict, TuringMachineError> {
    Simulation::new(table, accepting, tape, head, step_budget)?.run()
}

/// A loaded machine ready to decide input strings.
#[derive(Debug, Clone)]
pub struct TuringMachine {
    program: Program,
    options: SimulationOptions,
}

impl TuringMachine {
    /// Wraps `program`, flagging its permanent-loop states.
    pub fn new(mut program: Program) -> Self {
        mark_loops(&mut program.table);
        Self {
            program,
            options: SimulationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SimulationOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the step budget loaded with the program.
    pub fn set_step_budget(&mut self, step_budget: usize) {
        self.program.step_budget = step_budget;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn options(&self) -> SimulationOptions {
        self.options
    }

    /// Prepares a search for `input`, padded with blanks and the head on its first symbol.
    pub fn simulation(&self, input: &str) -> Result<Simulation<'_>, TuringMachineError> {
        let (tape, head) = pad_input(input);
        let simulation = Simulation::new(
            &self.program.table,
            &self.program.accepting,
            tape,
            head,
            self.program.step_budget,
        )?;

        Ok(simulation.with_options(self.options))
    }

    /// Decides whether the machine accepts `input` within its budget.
    pub fn decide(&self, input: &str) -> Result<Verdict, TuringMachineError> {
        debug!(input, budget = self.program.step_budget, "deciding input");
        self.simulation(input)?.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, Outcome, BLANK_SYMBOL, TAPE_MARGIN};
    use std::collections::HashMap;

    fn program(
        records: &[(StateId, char, char, Direction, StateId)],
        accepting: &[StateId],
        step_budget: usize,
    ) -> Program {
        let mut table = TransitionTable::new();
        table.ensure_state(0);
        for &(state, read, write, direction, next) in records {
            table.add_outcome(state, read, Outcome::new(write, direction, next));
        }

        Program {
            table,
            accepting: accepting.iter().copied().collect(),
            step_budget,
        }
    }

    /// Checks that every live tape is referenced by exactly `owners` queued configurations
    /// and that each configuration knows the length of its tape.
    fn assert_owner_counts(simulation: &Simulation) {
        let mut holders: HashMap<TapeHandle, usize> = HashMap::new();
        for config in simulation.frontier() {
            *holders.entry(config.tape).or_default() += 1;
        }

        for config in simulation.frontier() {
            assert_eq!(config.length, simulation.tape(config).len());
        }
        assert_eq!(holders.len(), simulation.tapes().live());
        for handle in simulation.tapes().handles() {
            assert_eq!(simulation.tapes().owners(handle), holders.get(&handle).copied());
        }
    }

    #[test]
    fn test_accepting_start_state() {
        let machine = TuringMachine::new(program(&[], &[0], 1));
        assert_eq!(machine.decide("").unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_dead_end_rejects() {
        let machine = TuringMachine::new(program(&[(0, 'a', 'a', Direction::Right, 1)], &[], 5));
        assert_eq!(machine.decide("a").unwrap(), Verdict::Reject);
        assert_eq!(machine.decide("b").unwrap(), Verdict::Reject);
    }

    #[test]
    fn test_permanent_loop_is_undetermined() {
        let machine = TuringMachine::new(program(&[(0, 'a', 'a', Direction::Right, 0)], &[], 3));
        assert!(machine.program().table.state(0).unwrap().permanent_loop);

        let mut simulation = machine.simulation("a").unwrap();
        assert_eq!(simulation.run().unwrap(), Verdict::Undetermined);
        // decided on the first level, the budget is not exhausted
        assert_eq!(simulation.budget(), 2);
    }

    #[test]
    fn test_branches_do_not_observe_each_other() {
        let machine = TuringMachine::new(program(
            &[
                (0, 'a', 'b', Direction::Stay, 1),
                (0, 'a', 'c', Direction::Stay, 2),
            ],
            &[1],
            1,
        ));

        let mut simulation = machine.simulation("a").unwrap();
        assert_eq!(simulation.step().unwrap(), Step::Continue);

        let children: Vec<_> = simulation.frontier().copied().collect();
        assert_eq!(children.len(), 2);
        assert_ne!(children[0].tape, children[1].tape);
        assert_eq!(children[0].state, 1);
        assert_eq!(simulation.tape(&children[0])[children[0].head], 'b');
        assert_eq!(children[1].state, 2);
        assert_eq!(simulation.tape(&children[1])[children[1].head], 'c');
        assert_owner_counts(&simulation);

        assert_eq!(simulation.run().unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_budget_exhaustion_is_undetermined() {
        // Walks right forever through two alternating states; never flagged as a loop.
        let machine = TuringMachine::new(program(
            &[
                (0, 'a', 'a', Direction::Right, 1),
                (0, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Right, 1),
                (1, 'a', 'a', Direction::Right, 0),
                (1, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Right, 0),
            ],
            &[],
            25,
        ));

        let mut simulation = machine.simulation("aa").unwrap();
        assert_eq!(simulation.run().unwrap(), Verdict::Undetermined);
        assert_eq!(simulation.budget(), 0);
        assert_eq!(simulation.stats().levels, 25);
        // the head ran off the padded tape at least once
        assert!(simulation.stats().examined > TAPE_MARGIN);
    }

    #[test]
    fn test_accept_dominates_other_branches() {
        let machine = TuringMachine::new(program(
            &[
                (0, 'a', 'a', Direction::Right, 1),
                (0, 'a', 'a', Direction::Right, 2),
                (0, 'a', 'a', Direction::Right, 3),
                // state 1 loops, state 2 dead-ends, state 3 accepts later
                (1, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Stay, 1),
                (3, BLANK_SYMBOL, 'x', Direction::Left, 4),
            ],
            &[4],
            10,
        ));

        assert_eq!(machine.decide("a").unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_loop_seen_overrides_reject() {
        let machine = TuringMachine::new(program(
            &[
                (0, 'a', 'a', Direction::Stay, 1),
                (0, 'a', 'a', Direction::Stay, 2),
                (1, 'a', 'a', Direction::Left, 1),
            ],
            &[],
            10,
        ));

        assert_eq!(machine.decide("a").unwrap(), Verdict::Undetermined);
    }

    #[test]
    fn test_budget_counts_levels_not_branches() {
        // Every level doubles the number of branches; three levels cost three units.
        let machine = TuringMachine::new(program(
            &[
                (0, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Right, 1),
                (0, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Left, 1),
                (1, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Right, 2),
                (1, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Left, 2),
                (2, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Right, 3),
                (2, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Left, 3),
            ],
            &[3],
            3,
        ));

        let mut simulation = machine.simulation("").unwrap();
        assert_eq!(simulation.run().unwrap(), Verdict::Accept);
        assert_eq!(simulation.stats().levels, 3);
        assert_eq!(simulation.stats().examined, 1 + 2 + 4);
        assert_eq!(simulation.stats().peak_frontier, 8);

        let mut short = machine.clone();
        short.set_step_budget(2);
        assert_eq!(short.decide("").unwrap(), Verdict::Undetermined);
    }

    #[test]
    fn test_budget_spent_by_last_level_is_undetermined() {
        let p = program(&[(0, 'a', 'a', Direction::Right, 1)], &[], 2);
        let (tape, head) = pad_input("a");
        let verdict = simulate(&p.table, &p.accepting, tape, head, 2).unwrap();
        assert_eq!(verdict, Verdict::Undetermined);

        // the root dead-ends and spends the only unit
        let verdict = simulate(&p.table, &p.accepting, vec!['b'], 0, 1).unwrap();
        assert_eq!(verdict, Verdict::Undetermined);

        // one spare unit lets the empty frontier be seen
        let mut machine = TuringMachine::new(p);
        machine.set_step_budget(3);
        assert_eq!(machine.decide("a").unwrap(), Verdict::Reject);
    }

    #[test]
    fn test_zero_budget() {
        let machine = TuringMachine::new(program(&[(0, 'a', 'a', Direction::Right, 1)], &[1], 0));
        assert_eq!(machine.decide("a").unwrap(), Verdict::Undetermined);

        let machine = TuringMachine::new(program(&[], &[0], 0));
        assert_eq!(machine.decide("").unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_owner_counts_hold_at_every_step() {
        let machine = TuringMachine::new(program(
            &[
                (0, 'a', 'x', Direction::Right, 0),
                (0, 'a', 'y', Direction::Right, 1),
                (0, 'b', 'b', Direction::Right, 0),
                (1, 'a', 'a', Direction::Right, 1),
                (1, 'b', 'z', Direction::Left, 0),
            ],
            &[],
            40,
        ));

        let mut simulation = machine.simulation("aabab").unwrap();
        loop {
            assert_owner_counts(&simulation);
            if let Step::Halt(_) = simulation.step().unwrap() {
                break;
            }
        }
        assert!(simulation.stats().shared > 0);
        assert!(simulation.stats().forked > 0);
    }

    #[test]
    fn test_sharing_is_transparent() {
        // Binary increment: deterministic, writes, moves both ways and grows the tape.
        let machine = TuringMachine::new(program(
            &[
                (0, '0', '0', Direction::Right, 0),
                (0, '1', '1', Direction::Right, 0),
                (0, BLANK_SYMBOL, BLANK_SYMBOL, Direction::Left, 1),
                (1, '1', '0', Direction::Left, 1),
                (1, '0', '1', Direction::Stay, 2),
                (1, BLANK_SYMBOL, '1', Direction::Stay, 2),
            ],
            &[2],
            50,
        ));
        let copying = machine.clone().with_options(SimulationOptions { share_tapes: false });

        let mut shared = machine.simulation("0111").unwrap();
        let mut copied = copying.simulation("0111").unwrap();

        loop {
            let a: Vec<_> = shared
                .frontier()
                .map(|c| (c.state, c.head, shared.tape(c).to_vec()))
                .collect();
            let b: Vec<_> = copied
                .frontier()
                .map(|c| (c.state, c.head, copied.tape(c).to_vec()))
                .collect();
            assert_eq!(a, b);

            let (x, y) = (shared.step().unwrap(), copied.step().unwrap());
            assert_eq!(x, y);
            if let Step::Halt(verdict) = x {
                assert_eq!(verdict, Verdict::Accept);
                break;
            }
        }

        assert_eq!(shared.stats().forked, 0);
        assert_eq!(copied.stats().shared, 0);
        assert_eq!(shared.stats().peak_tapes, 1);
    }

    #[test]
    fn test_halted_simulation_is_stable() {
        let machine = TuringMachine::new(program(&[], &[0], 4));
        let mut simulation = machine.simulation("abc").unwrap();

        assert_eq!(simulation.step().unwrap(), Step::Halt(Verdict::Accept));
        assert_eq!(simulation.step().unwrap(), Step::Halt(Verdict::Accept));
        assert_eq!(simulation.verdict(), Some(Verdict::Accept));
        assert_eq!(simulation.frontier().count(), 0);
    }

    #[test]
    fn test_simulate_with_raw_tape() {
        let p = program(&[(0, 'a', 'b', Direction::Left, 1)], &[1], 2);
        // head at 0 moves off the left edge and forces growth
        let verdict = simulate(&p.table, &p.accepting, vec!['a'], 0, p.step_budget).unwrap();
        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn test_frontier_levels() {
        let mut arena = TapeArena::new();
        let tape = arena.alloc(vec!['a']);
        let config = |state| Configuration {
            state,
            head: 0,
            length: 1,
            tape,
        };

        let mut frontier = Frontier::new(config(0));
        frontier.push(config(1));
        frontier.push(config(2));

        assert_eq!(frontier.pop().map(|(c, done)| (c.state, done)), Some((0, true)));
        assert_eq!(frontier.pop().map(|(c, done)| (c.state, done)), Some((1, false)));
        frontier.push(config(3));
        assert_eq!(frontier.pop().map(|(c, done)| (c.state, done)), Some((2, true)));
        assert_eq!(frontier.pop().map(|(c, done)| (c.state, done)), Some((3, true)));
        assert!(frontier.pop().is_none());
        assert!(frontier.is_empty());
    }
}
