//! Search behaviour over the finite-domain fixtures.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cpforge::limit::{SearchLimit, SolutionLimit, TimeLimit};
use cpforge::monitor::{monitor, MonitorRef};
use cpforge::{
    Constraint, Decision, DecisionBuilder, DecisionModification, DemonPriority, SearchMonitor, SearchResult, Solver,
    SolverState,
};
use cpforge_test::{
    nqueens_model, AllDifferent, FirstUnbound, IntVar, NotEqual, SolutionRecorder, ValueStrategy,
};

fn int_vars(solver: &mut Solver, n: usize, max: i64) -> Vec<IntVar> {
    (0..n).map(|i| IntVar::new(solver, format!("x{i}"), 0, max)).collect()
}

fn recorded(recorder: &Rc<RefCell<SolutionRecorder>>) -> Vec<Vec<i64>> {
    recorder.borrow().solutions().to_vec()
}

/// Runs an inner search over `inner` the first time it is asked for a
/// decision, then reports a leaf.
struct NestedSearchBuilder {
    inner: Vec<IntVar>,
    commit: bool,
    inner_solutions: Rc<Cell<usize>>,
}

impl DecisionBuilder for NestedSearchBuilder {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        let recorder = if self.commit {
            monitor(SolutionRecorder::passive(self.inner.clone()))
        } else {
            monitor(SolutionRecorder::all(self.inner.clone()))
        };
        let builder = Rc::new(FirstUnbound::min_value(self.inner.clone()));
        if self.commit {
            solver.solve_and_commit(builder, vec![recorder.clone() as MonitorRef]);
        } else {
            solver.solve(builder, vec![recorder.clone() as MonitorRef]);
        }
        self.inner_solutions.set(recorder.borrow().solutions().len());
        Ok(None)
    }
}

/// Installs a branch selector on its first call, then delegates.
struct WithSelector {
    inner: FirstUnbound,
    modification: DecisionModification,
    installed: Cell<bool>,
}

impl WithSelector {
    fn new(vars: Vec<IntVar>, modification: DecisionModification) -> Self {
        Self {
            inner: FirstUnbound::min_value(vars),
            modification,
            installed: Cell::new(false),
        }
    }
}

impl DecisionBuilder for WithSelector {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        if !self.installed.replace(true) {
            let modification = self.modification;
            solver.set_branch_selector(move |_| modification);
        }
        self.inner.next(solver)
    }
}

/// Runs a nested search over `inner` when posted. If it finds nothing,
/// removes 0 from `target`.
struct NestedFeasibility {
    inner: Vec<IntVar>,
    target: IntVar,
    outcomes: Rc<RefCell<Vec<bool>>>,
    cleanups: Rc<Cell<u32>>,
}

impl Constraint for NestedFeasibility {
    fn post(&self, _solver: &mut Solver) -> SearchResult<()> {
        Ok(())
    }

    fn initial_propagate(&self, solver: &mut Solver) -> SearchResult<()> {
        let cleanups = Rc::clone(&self.cleanups);
        solver.set_action_on_fail(move |_| cleanups.set(cleanups.get() + 1));
        let found = solver.solve(Rc::new(FirstUnbound::min_value(self.inner.clone())), Vec::new());

        // The posting is still under way: frozen, with its fail action kept.
        assert!(solver.is_queue_frozen());
        assert_eq!(self.cleanups.get(), 0);
        assert!(self.inner.iter().all(|v| v.size(solver) == 2));
        self.outcomes.borrow_mut().push(found);
        if found {
            Ok(())
        } else {
            self.target.remove_value(solver, 0)
        }
    }
}

/// Posts `constraint` the first time it is asked for a decision, then
/// delegates.
struct PostOnce {
    constraint: Rc<dyn Constraint>,
    inner: FirstUnbound,
    posted: Cell<bool>,
}

impl DecisionBuilder for PostOnce {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        if !self.posted.replace(true) {
            solver.add_constraint(Rc::clone(&self.constraint))?;
        }
        self.inner.next(solver)
    }
}

#[derive(Debug, Default)]
struct RestartOnce {
    restarted: bool,
}

impl SearchMonitor for RestartOnce {
    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        if !self.restarted {
            self.restarted = true;
            solver.restart_current_search();
        }
        true
    }
}

#[test]
fn test_nested_solve_leaves_no_trace() {
    let mut solver = Solver::new();
    let inner = int_vars(&mut solver, 3, 2);
    solver.add_constraint(Rc::new(AllDifferent::new(inner.clone()))).unwrap();
    let inner_solutions = Rc::new(Cell::new(0));
    let outer = monitor(SolutionRecorder::all(inner.clone()));

    let found = solver.solve(
        Rc::new(NestedSearchBuilder {
            inner: inner.clone(),
            commit: false,
            inner_solutions: Rc::clone(&inner_solutions),
        }),
        vec![outer.clone() as MonitorRef],
    );

    assert!(found);
    assert_eq!(inner_solutions.get(), 6);
    assert_eq!(outer.borrow().solutions().len(), 1);
    assert_eq!(solver.solutions(), 1);
    assert!(inner.iter().all(|v| v.size(&solver) == 3));
}

#[test]
fn test_solve_and_commit_keeps_first_solution() {
    let mut solver = Solver::new();
    let inner = int_vars(&mut solver, 3, 2);
    solver.add_constraint(Rc::new(AllDifferent::new(inner.clone()))).unwrap();
    let inner_solutions = Rc::new(Cell::new(0));
    let outer = monitor(SolutionRecorder::all(inner.clone()));

    solver.solve(
        Rc::new(NestedSearchBuilder {
            inner: inner.clone(),
            commit: true,
            inner_solutions: Rc::clone(&inner_solutions),
        }),
        vec![outer.clone() as MonitorRef],
    );

    assert_eq!(inner_solutions.get(), 1);
    assert_eq!(recorded(&outer), vec![vec![0, 1, 2]]);
    // The outer search has ended, so everything is restored.
    assert!(inner.iter().all(|v| v.size(&solver) == 3));
}

#[test]
fn test_nested_solve_in_demon_restores_state() {
    let mut solver = Solver::new();
    let x = IntVar::new(&mut solver, "x", 0, 1);
    let y = IntVar::new(&mut solver, "y", 0, 1);
    let inner = int_vars(&mut solver, 3, 2);
    solver.add_constraint(Rc::new(AllDifferent::new(inner.clone()))).unwrap();
    let nested_counts = Rc::new(RefCell::new(Vec::new()));

    let demon = {
        let (x, y, inner, counts) = (x.clone(), y.clone(), inner.clone(), Rc::clone(&nested_counts));
        solver.make_closure_demon("nested_solve", DemonPriority::Var, move |s| {
            let Some(value) = x.value(s) else {
                return Ok(());
            };
            let recorder = monitor(SolutionRecorder::all(inner.clone()));
            s.solve(
                Rc::new(FirstUnbound::min_value(inner.clone())),
                vec![recorder.clone() as MonitorRef],
            );
            assert!(inner.iter().all(|v| v.size(s) == 3));
            assert_eq!(x.value(s), Some(value));
            counts.borrow_mut().push(recorder.borrow().solutions().len());
            // Propagation of the outer search goes on.
            y.set_value(s, 1 - value)
        })
    };
    x.when_domain(&mut solver, demon);
    let outer = monitor(SolutionRecorder::all(vec![x.clone(), y.clone()]));

    solver.solve(
        Rc::new(FirstUnbound::min_value(vec![x.clone(), y.clone()])),
        vec![outer.clone() as MonitorRef],
    );

    assert_eq!(recorded(&outer), vec![vec![0, 1], vec![1, 0]]);
    assert_eq!(*nested_counts.borrow(), vec![6, 6]);
    assert!(inner.iter().all(|v| v.size(&solver) == 3));
}

#[test]
fn test_failing_nested_solve_keeps_outer_propagation() {
    let mut solver = Solver::new();
    let target = IntVar::new(&mut solver, "t", 0, 1);
    // Three variables over two values cannot all differ.
    let inner = int_vars(&mut solver, 3, 1);
    solver.add_constraint(Rc::new(AllDifferent::new(inner.clone()))).unwrap();
    let outcomes = Rc::new(RefCell::new(Vec::new()));
    let cleanups = Rc::new(Cell::new(0));
    let constraint = NestedFeasibility {
        inner: inner.clone(),
        target: target.clone(),
        outcomes: Rc::clone(&outcomes),
        cleanups: Rc::clone(&cleanups),
    };
    let outer = monitor(SolutionRecorder::all(vec![target.clone()]));

    let found = solver.solve(
        Rc::new(PostOnce {
            constraint: Rc::new(constraint),
            inner: FirstUnbound::min_value(vec![target.clone()]),
            posted: Cell::new(false),
        }),
        vec![outer.clone() as MonitorRef],
    );

    assert!(found);
    assert_eq!(*outcomes.borrow(), vec![false]);
    assert_eq!(recorded(&outer), vec![vec![1]]);
    // Only the outer failure after the solution ran the action.
    assert_eq!(cleanups.get(), 1);
    assert_eq!(target.size(&solver), 2);
    assert!(inner.iter().all(|v| v.size(&solver) == 2));
}

#[test]
fn test_solution_limit_stops_enumeration() {
    let mut solver = Solver::new();
    let queens = nqueens_model(&mut solver, 5).unwrap();
    let recorder = monitor(SolutionRecorder::all(queens.clone()));
    let limit = monitor(SearchLimit::new(SolutionLimit::new(3)));

    solver.solve(
        Rc::new(FirstUnbound::min_value(queens)),
        vec![recorder.clone() as MonitorRef, limit.clone() as MonitorRef],
    );

    assert_eq!(recorder.borrow().solutions().len(), 3);
    assert!(limit.borrow().is_crossed());
}

#[test]
fn test_zero_time_limit_finds_nothing() {
    let mut solver = Solver::new();
    let queens = nqueens_model(&mut solver, 6).unwrap();
    let recorder = monitor(SolutionRecorder::all(queens.clone()));
    let limit = monitor(SearchLimit::new(TimeLimit::millis(0)));

    let found = solver.solve(
        Rc::new(FirstUnbound::min_value(queens)),
        vec![recorder.clone() as MonitorRef, limit as MonitorRef],
    );

    assert!(!found);
    assert!(recorder.borrow().solutions().is_empty());
}

#[test]
fn test_restart_reenumerates_from_root() {
    let mut solver = Solver::new();
    let queens = nqueens_model(&mut solver, 4).unwrap();
    let recorder = monitor(SolutionRecorder::all(queens.clone()));

    solver.solve(
        Rc::new(FirstUnbound::min_value(queens)),
        vec![
            recorder.clone() as MonitorRef,
            monitor(RestartOnce::default()) as MonitorRef,
        ],
    );

    let solutions = recorded(&recorder);
    assert_eq!(solutions, vec![vec![1, 3, 0, 2], vec![1, 3, 0, 2], vec![2, 0, 3, 1]]);
}

#[test]
fn test_switch_branches_reverses_order() {
    let mut solver = Solver::new();
    let vars = int_vars(&mut solver, 2, 1);
    let recorder = monitor(SolutionRecorder::all(vars.clone()));

    solver.solve(
        Rc::new(WithSelector::new(vars, DecisionModification::SwitchBranches)),
        vec![recorder.clone() as MonitorRef],
    );

    assert_eq!(recorded(&recorder), vec![vec![1, 1], vec![1, 0], vec![0, 1], vec![0, 0]]);
}

#[test]
fn test_keep_right_follows_refutations() {
    let mut solver = Solver::new();
    let vars = int_vars(&mut solver, 3, 2);
    let recorder = monitor(SolutionRecorder::all(vars.clone()));

    solver.solve(
        Rc::new(WithSelector::new(vars, DecisionModification::KeepRight)),
        vec![recorder.clone() as MonitorRef],
    );

    assert_eq!(recorded(&recorder), vec![vec![2, 2, 2]]);
    assert_eq!(solver.branches(), 0);
}

#[test]
fn test_root_conflict_is_infeasible() {
    let mut solver = Solver::new();
    let x = IntVar::new(&mut solver, "x", 4, 4);
    let y = IntVar::new(&mut solver, "y", 4, 4);
    solver.add_constraint(Rc::new(NotEqual::new(x.clone(), y.clone(), 0))).unwrap();

    solver.new_search(Rc::new(FirstUnbound::min_value(vec![x, y])), Vec::new());
    assert!(!solver.next_solution());
    assert_eq!(solver.state(), SolverState::ProblemInfeasible);
    solver.end_search();
    assert_eq!(solver.state(), SolverState::OutsideSearch);
}

#[test]
fn test_exhausted_search_has_no_more_solutions() {
    let mut solver = Solver::new();
    let queens = nqueens_model(&mut solver, 3).unwrap();

    solver.new_search(Rc::new(FirstUnbound::min_value(queens)), Vec::new());
    assert!(!solver.next_solution());
    assert_eq!(solver.state(), SolverState::NoMoreSolutions);
    solver.end_search();
}

#[test]
fn test_same_seed_same_random_order() {
    let run = |seed: u64| {
        let config = cpforge::SolverConfig::new().with_random_seed(seed);
        let mut solver = Solver::with_config(config).unwrap();
        let vars = int_vars(&mut solver, 4, 3);
        solver.add_constraint(Rc::new(AllDifferent::new(vars.clone()))).unwrap();
        let recorder = monitor(SolutionRecorder::all(vars.clone()));
        solver.solve(
            Rc::new(FirstUnbound::new(vars, ValueStrategy::Random)),
            vec![recorder.clone() as MonitorRef],
        );
        recorded(&recorder)
    };

    let first = run(42);
    assert_eq!(first.len(), 24);
    assert_eq!(first, run(42));
}
