//! Tests for the search engine.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cpforge_config::SolverConfig;

use crate::constraint::Constraint;
use crate::decision::{Decision, DecisionBuilder, DecisionModification};
use crate::failure::SearchResult;
use crate::monitor::{monitor, CountingMonitor, MonitorRef, SearchMonitor, SolutionCollector};
use crate::solver::{Solver, SolverState};
use crate::test_utils::{binary_vars, values, BinaryBuilder, UNBOUND};

fn all_solutions(collector: &Rc<RefCell<SolutionCollector<i64>>>) -> Vec<Vec<i64>> {
    collector
        .borrow()
        .solutions()
        .iter()
        .map(|s| s.values.clone())
        .collect()
}

#[derive(Debug)]
struct RejectOddSum {
    vars: Vec<cpforge_core::Rev<i64>>,
}

impl SearchMonitor for RejectOddSum {
    fn accept_solution(&mut self, solver: &mut Solver) -> bool {
        values(solver, &self.vars).iter().sum::<i64>() % 2 == 0
    }
}

/// Restarts at the second solution and finishes at the fourth.
#[derive(Debug, Default)]
struct Scripted {
    seen: u64,
}

impl SearchMonitor for Scripted {
    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        self.seen += 1;
        match self.seen {
            2 => solver.restart_current_search(),
            4 => solver.finish_current_search(),
            _ => {}
        }
        true
    }
}

#[test]
fn test_solve_enumerates_all_leaves_in_order() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 3);
    let collector = monitor(SolutionCollector::all(vars.clone()));
    let counter = monitor(CountingMonitor::new());

    let found = solver.solve(
        Rc::new(BinaryBuilder::new(vars.clone())),
        vec![collector.clone() as MonitorRef, counter.clone() as MonitorRef],
    );

    assert!(found);
    let solutions = all_solutions(&collector);
    assert_eq!(solutions.len(), 8);
    assert_eq!(solutions[0], vec![0, 0, 0]);
    assert_eq!(solutions[1], vec![0, 0, 1]);
    assert_eq!(solutions[7], vec![1, 1, 1]);

    assert_eq!(solver.solutions(), 8);
    assert_eq!(solver.decisions(), 7);
    assert_eq!(solver.branches(), 14);
    assert_eq!(solver.failures(), 8);
    assert_eq!(solver.state(), SolverState::OutsideSearch);
    assert_eq!(values(&solver, &vars), vec![UNBOUND; 3]);

    let c = counter.borrow();
    assert_eq!(c.enter_search_count(), 1);
    assert_eq!(c.exit_search_count(), 1);
    assert_eq!(c.initial_propagation_count(), 1);
    assert_eq!(c.apply_decision_count(), 7);
    assert_eq!(c.refute_decision_count(), 7);
    assert_eq!(c.after_decision_count(), 14);
    assert_eq!(c.begin_fail_count(), 8);
    assert_eq!(c.end_fail_count(), 8);
    assert_eq!(c.no_more_solutions_count(), 1);
}

#[test]
fn test_solve_stops_at_first_solution() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 4);
    let counter = monitor(CountingMonitor::new());

    assert!(solver.solve(Rc::new(BinaryBuilder::new(vars.clone())), vec![counter.clone() as MonitorRef]));

    assert_eq!(solver.solutions(), 1);
    assert_eq!(solver.failures(), 0);
    assert_eq!(counter.borrow().solutions(), 1);
    assert_eq!(counter.borrow().no_more_solutions_count(), 0);
    assert_eq!(values(&solver, &vars), vec![UNBOUND; 4]);
}

#[test]
fn test_periodic_check_at_decision_boundaries() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 6);
    let collector = monitor(SolutionCollector::all(vars.clone()));
    let counter = monitor(CountingMonitor::new());

    solver.solve(
        Rc::new(BinaryBuilder::new(vars)),
        vec![collector.clone() as MonitorRef, counter.clone() as MonitorRef],
    );

    // No demon ever runs, so every poll comes from a decision boundary.
    let c = counter.borrow();
    assert_eq!(collector.borrow().solution_count(), 64);
    assert_eq!(c.periodic_check_count(), c.begin_next_decision_count());
    assert!(c.periodic_check_count() > 64);
}

#[test]
fn test_next_solution_iterates_states() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 2);
    solver.new_search(Rc::new(BinaryBuilder::new(vars.clone())), Vec::new());
    assert_eq!(solver.state(), SolverState::OutsideSearch);

    let mut seen = Vec::new();
    while solver.next_solution() {
        assert_eq!(solver.state(), SolverState::AtSolution);
        assert_eq!(solver.solve_depth(), 1);
        seen.push(values(&solver, &vars));
    }
    assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
    assert_eq!(solver.state(), SolverState::NoMoreSolutions);
    assert!(!solver.next_solution());

    solver.end_search();
    assert_eq!(solver.state(), SolverState::OutsideSearch);
    assert_eq!(solver.solve_depth(), 0);
    assert_eq!(values(&solver, &vars), vec![UNBOUND; 2]);
}

#[test]
fn test_next_solution_without_search_returns_false() {
    let mut solver = Solver::new();
    assert!(!solver.next_solution());
}

#[test]
fn test_failing_prefix_prunes_subtree() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 3);
    let collector = monitor(SolutionCollector::all(vars.clone()));
    let builder = BinaryBuilder::rejecting(vars.clone(), |v| v[0] == 0 && v[1] == 0);

    assert!(solver.solve(Rc::new(builder), vec![collector.clone() as MonitorRef]));

    let solutions = all_solutions(&collector);
    assert_eq!(solutions.len(), 6);
    assert!(solutions.iter().all(|s| !(s[0] == 0 && s[1] == 0)));
}

#[test]
fn test_rejected_leaves_count_as_unchecked() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 3);
    let collector = monitor(SolutionCollector::all(vars.clone()));
    let parity = monitor(RejectOddSum { vars: vars.clone() });
    let counter = monitor(CountingMonitor::new());

    solver.solve(
        Rc::new(BinaryBuilder::new(vars.clone())),
        vec![parity as MonitorRef, counter.clone() as MonitorRef, collector.clone() as MonitorRef],
    );

    assert_eq!(collector.borrow().solution_count(), 4);
    assert_eq!(solver.solutions(), 4);
    assert_eq!(solver.unchecked_solutions(), 8);
    // Every monitor votes, even after a rejection.
    assert_eq!(counter.borrow().accept_solution_count(), 8);
    assert_eq!(counter.borrow().solutions(), 4);
}

#[test]
fn test_collector_first_and_last() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 2);
    let first = monitor(SolutionCollector::first(vars.clone()));
    let last = monitor(SolutionCollector::last(vars.clone()));

    solver.solve(
        Rc::new(BinaryBuilder::new(vars.clone())),
        vec![first.clone() as MonitorRef, last.clone() as MonitorRef],
    );

    assert_eq!(all_solutions(&first), vec![vec![0, 0]]);
    assert_eq!(all_solutions(&last), vec![vec![1, 1]]);
}

struct RecordingConstraint {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
    child: Option<Rc<dyn Constraint>>,
    fail: bool,
}

impl Constraint for RecordingConstraint {
    fn post(&self, solver: &mut Solver) -> SearchResult<()> {
        self.log.borrow_mut().push(format!("post {}", self.name));
        if let Some(child) = &self.child {
            solver.add_constraint(Rc::clone(child))?;
        }
        Ok(())
    }

    fn initial_propagate(&self, solver: &mut Solver) -> SearchResult<()> {
        self.log.borrow_mut().push(format!("propagate {}", self.name));
        if self.fail {
            return Err(solver.fail());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn recording(
    name: &'static str,
    log: &Rc<RefCell<Vec<String>>>,
    child: Option<Rc<dyn Constraint>>,
    fail: bool,
) -> Rc<dyn Constraint> {
    Rc::new(RecordingConstraint {
        name,
        log: Rc::clone(log),
        child,
        fail,
    })
}

#[test]
fn test_root_posts_constraints_then_nested_ones() {
    let mut solver = Solver::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let nested = recording("c", &log, None, false);
    solver.add_constraint(recording("a", &log, Some(nested), false)).unwrap();
    solver.add_constraint(recording("b", &log, None, false)).unwrap();
    assert_eq!(solver.constraint_count(), 2);

    assert!(solver.solve(Rc::new(BinaryBuilder::new(Vec::new())), Vec::new()));

    assert_eq!(
        *log.borrow(),
        vec!["post a", "propagate a", "post b", "propagate b", "post c", "propagate c"]
    );
    assert_eq!(solver.additional_constraint_count(), 1);
    assert_eq!(solver.additional_constraint_parent(0), Some(0));
}

#[test]
fn test_root_failure_is_infeasible() {
    let mut solver = Solver::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    solver.add_constraint(recording("bad", &log, None, true)).unwrap();
    let counter = monitor(CountingMonitor::new());

    solver.new_search(Rc::new(BinaryBuilder::new(Vec::new())), vec![counter.clone() as MonitorRef]);
    assert!(!solver.next_solution());
    assert_eq!(solver.state(), SolverState::ProblemInfeasible);
    assert!(!solver.next_solution());
    assert_eq!(counter.borrow().begin_fail_count(), 1);
    assert_eq!(counter.borrow().initial_propagation_count(), 0);
    solver.end_search();
    assert_eq!(solver.failures(), 1);
}

#[test]
fn test_disable_solve_fails_root() {
    let config = SolverConfig::new().with_disable_solve(true);
    let mut solver = Solver::with_config(config).unwrap();
    let vars = binary_vars(&mut solver, 2);
    assert!(!solver.solve(Rc::new(BinaryBuilder::new(vars)), Vec::new()));
    assert_eq!(solver.failures(), 1);
}

#[test]
#[should_panic(expected = "fail called outside of a search")]
fn test_fail_outside_search_panics() {
    let mut solver = Solver::new();
    let _ = solver.fail();
}

/// Runs a nested search on `inner` at every leaf of the outer search.
struct NestedSolveBuilder {
    inner: Vec<cpforge_core::Rev<i64>>,
    commit: bool,
    counts: Rc<RefCell<Vec<usize>>>,
    depths: Rc<RefCell<Vec<usize>>>,
    actions: Rc<Cell<u32>>,
}

/// Registers a backtrack action on its first call, then defers to a binary
/// builder.
struct ActionBuilder {
    inner: BinaryBuilder,
    installed: Cell<bool>,
    actions: Rc<Cell<u32>>,
}

impl DecisionBuilder for ActionBuilder {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        if !self.installed.replace(true) {
            let actions = Rc::clone(&self.actions);
            solver.add_backtrack_action(move |_| actions.set(actions.get() + 1), false);
        }
        self.inner.next(solver)
    }
}

impl DecisionBuilder for NestedSolveBuilder {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        if values(solver, &self.inner).iter().all(|&v| v != UNBOUND) {
            return Ok(None);
        }
        let depths = Rc::clone(&self.depths);
        let observer = monitor(DepthRecorder { depths });
        let collector = if self.commit {
            monitor(SolutionCollector::first(self.inner.clone()))
        } else {
            monitor(SolutionCollector::all(self.inner.clone()))
        };
        let monitors = vec![observer as MonitorRef, collector.clone() as MonitorRef];
        if self.commit {
            let builder = ActionBuilder {
                inner: BinaryBuilder::new(self.inner.clone()),
                installed: Cell::new(false),
                actions: Rc::clone(&self.actions),
            };
            solver.solve_and_commit(Rc::new(builder), monitors);
        } else {
            solver.solve(Rc::new(BinaryBuilder::new(self.inner.clone())), monitors);
            assert!(values(solver, &self.inner).iter().all(|&v| v == UNBOUND));
        }
        self.counts.borrow_mut().push(collector.borrow().solution_count());
        Ok(None)
    }
}

#[derive(Debug)]
struct DepthRecorder {
    depths: Rc<RefCell<Vec<usize>>>,
}

impl SearchMonitor for DepthRecorder {
    fn enter_search(&mut self, solver: &mut Solver) {
        self.depths.borrow_mut().push(solver.solve_depth());
    }
}

#[test]
fn test_nested_solve_is_isolated() {
    let mut solver = Solver::new();
    let outer = binary_vars(&mut solver, 1);
    let inner = binary_vars(&mut solver, 2);
    let counts = Rc::new(RefCell::new(Vec::new()));
    let depths = Rc::new(RefCell::new(Vec::new()));
    let nested = NestedSolveBuilder {
        inner: inner.clone(),
        commit: false,
        counts: Rc::clone(&counts),
        depths: Rc::clone(&depths),
        actions: Rc::new(Cell::new(0)),
    };
    let builder = crate::decision::ComposeDecisionBuilder::new(vec![
        Rc::new(BinaryBuilder::new(outer.clone())),
        Rc::new(nested),
    ]);
    let all: Vec<_> = outer.iter().chain(inner.iter()).copied().collect();
    let collector = monitor(SolutionCollector::all(all));

    assert!(solver.solve(Rc::new(builder), vec![collector.clone() as MonitorRef]));

    assert_eq!(*counts.borrow(), vec![4, 4]);
    assert_eq!(*depths.borrow(), vec![2, 2]);
    assert_eq!(all_solutions(&collector), vec![vec![0, -1, -1], vec![1, -1, -1]]);
    assert_eq!(solver.solve_depth(), 0);
}

#[test]
fn test_solve_and_commit_keeps_nested_effects() {
    let mut solver = Solver::new();
    let outer = binary_vars(&mut solver, 1);
    let inner = binary_vars(&mut solver, 2);
    let actions = Rc::new(Cell::new(0));
    let nested = NestedSolveBuilder {
        inner: inner.clone(),
        commit: true,
        counts: Rc::new(RefCell::new(Vec::new())),
        depths: Rc::new(RefCell::new(Vec::new())),
        actions: Rc::clone(&actions),
    };
    let builder = crate::decision::ComposeDecisionBuilder::new(vec![
        Rc::new(BinaryBuilder::new(outer.clone())),
        Rc::new(nested),
    ]);
    let all: Vec<_> = outer.iter().chain(inner.iter()).copied().collect();
    let collector = monitor(SolutionCollector::all(all.clone()));

    assert!(solver.solve(Rc::new(builder), vec![collector.clone() as MonitorRef]));

    assert_eq!(all_solutions(&collector), vec![vec![0, 0, 0], vec![1, 0, 0]]);
    // Moved to the outer search, the actions ran when it backtracked.
    assert_eq!(actions.get(), 2);
    assert_eq!(values(&solver, &all), vec![UNBOUND; 3]);
}

#[test]
#[should_panic(expected = "solve_and_commit can only run inside a search")]
fn test_solve_and_commit_at_top_level_panics() {
    let mut solver = Solver::new();
    solver.solve_and_commit(Rc::new(BinaryBuilder::new(Vec::new())), Vec::new());
}

/// Records how many monitors the active search carries, then runs itself
/// once as a nested search.
struct MonitorCountBuilder {
    counts: Rc<RefCell<Vec<usize>>>,
}

impl DecisionBuilder for MonitorCountBuilder {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        self.counts.borrow_mut().push(solver.active_search().monitors.len());
        if solver.solve_depth() == 1 {
            let nested = MonitorCountBuilder {
                counts: Rc::clone(&self.counts),
            };
            solver.solve(Rc::new(nested), Vec::new());
        }
        Ok(None)
    }
}

#[test]
fn test_trace_search_installed_on_top_level_only() {
    let config = SolverConfig::new().with_trace_search(true);
    let mut solver = Solver::with_config(config).unwrap();
    let counts = Rc::new(RefCell::new(Vec::new()));

    let builder = MonitorCountBuilder {
        counts: Rc::clone(&counts),
    };
    assert!(solver.solve(Rc::new(builder), Vec::new()));

    assert_eq!(*counts.borrow(), vec![1, 0]);
}

#[test]
fn test_restart_and_finish_requests() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 3);
    let collector = monitor(SolutionCollector::all(vars.clone()));
    let counter = monitor(CountingMonitor::new());
    let script = monitor(Scripted::default());

    let found = solver.solve(
        Rc::new(BinaryBuilder::new(vars.clone())),
        vec![
            collector.clone() as MonitorRef,
            counter.clone() as MonitorRef,
            script as MonitorRef,
        ],
    );

    assert!(found);
    assert_eq!(
        all_solutions(&collector),
        vec![vec![0, 0, 0], vec![0, 0, 1], vec![0, 0, 0], vec![0, 0, 1]]
    );
    assert_eq!(counter.borrow().restart_search_count(), 1);
    assert_eq!(counter.borrow().no_more_solutions_count(), 0);
    assert_eq!(values(&solver, &vars), vec![UNBOUND; 3]);
}

#[test]
fn test_restart_search_from_solution() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 2);
    solver.new_search(Rc::new(BinaryBuilder::new(vars.clone())), Vec::new());

    assert!(solver.next_solution());
    assert!(solver.next_solution());
    assert_eq!(values(&solver, &vars), vec![0, 1]);

    solver.restart_search();
    assert_eq!(solver.state(), SolverState::InSearch);
    assert_eq!(values(&solver, &vars), vec![UNBOUND, UNBOUND]);
    assert!(solver.next_solution());
    assert_eq!(values(&solver, &vars), vec![0, 0]);
    solver.end_search();
}

/// Installs a branch selector on its first call.
struct Selecting {
    inner: BinaryBuilder,
    modification: DecisionModification,
    installed: Cell<bool>,
}

impl DecisionBuilder for Selecting {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        if !self.installed.replace(true) {
            let modification = self.modification;
            solver.set_branch_selector(move |_| modification);
        }
        self.inner.next(solver)
    }
}

fn solve_with_selector(modification: DecisionModification) -> (bool, Vec<Vec<i64>>, u64) {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 3);
    let collector = monitor(SolutionCollector::all(vars.clone()));
    let builder = Selecting {
        inner: BinaryBuilder::new(vars),
        modification,
        installed: Cell::new(false),
    };
    let found = solver.solve(Rc::new(builder), vec![collector.clone() as MonitorRef]);
    (found, all_solutions(&collector), solver.branches())
}

#[test]
fn test_branch_selector_switch_branches_reverses_order() {
    let (found, solutions, _) = solve_with_selector(DecisionModification::SwitchBranches);
    assert!(found);
    assert_eq!(solutions.len(), 8);
    assert_eq!(solutions[0], vec![1, 1, 1]);
    assert_eq!(solutions[7], vec![0, 0, 0]);
}

#[test]
fn test_branch_selector_keep_right_and_left() {
    let (found, solutions, branches) = solve_with_selector(DecisionModification::KeepRight);
    assert!(found);
    assert_eq!(solutions, vec![vec![1, 1, 1]]);
    assert_eq!(branches, 0);

    let (_, solutions, _) = solve_with_selector(DecisionModification::KeepLeft);
    assert_eq!(solutions, vec![vec![0, 0, 0]]);
}

#[test]
fn test_branch_selector_kill_both() {
    let (found, solutions, _) = solve_with_selector(DecisionModification::KillBoth);
    assert!(!found);
    assert!(solutions.is_empty());
}

#[test]
fn test_search_depth_tracks_branches() {
    #[derive(Debug, Default)]
    struct Depths(Vec<(u32, u32)>);
    impl SearchMonitor for Depths {
        fn at_solution(&mut self, solver: &mut Solver) -> bool {
            self.0.push((solver.search_depth(), solver.search_left_depth()));
            true
        }
    }

    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 2);
    let depths = monitor(Depths::default());
    solver.solve(Rc::new(BinaryBuilder::new(vars)), vec![depths.clone() as MonitorRef]);
    assert_eq!(depths.borrow().0, vec![(2, 2), (2, 1), (2, 1), (2, 0)]);
}

#[test]
fn test_fail_stamp_moves_on_backtrack() {
    let mut solver = Solver::new();
    let vars = binary_vars(&mut solver, 1);
    let before = solver.fail_stamp();
    solver.new_search(Rc::new(BinaryBuilder::new(vars)), Vec::new());
    assert!(solver.next_solution());
    assert!(solver.next_solution());
    assert!(solver.fail_stamp() > before);
    solver.end_search();
}
