//! Solution collectors.

use std::time::{Duration, Instant};

use cpforge_core::{Rev, RevValue};

use crate::solver::Solver;

use super::SearchMonitor;

/// Which solutions a [`SolutionCollector`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMode {
    /// Every solution; asks `solve` to keep enumerating.
    All,
    /// The first solution only; lets `solve` stop there.
    First,
    /// The most recent solution; asks `solve` to keep enumerating.
    Last,
}

/// Snapshot of the collected values at one solution.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedSolution<T> {
    pub values: Vec<T>,
    pub branches: u64,
    pub failures: u64,
    pub wall_time: Duration,
}

/// Records the values of a set of reversible cells at each accepted
/// solution.
///
/// # Example
///
/// ```
/// use cpforge_solver::monitor::{monitor, SolutionCollector};
/// use cpforge_solver::Solver;
///
/// let mut solver = Solver::new();
/// let x = solver.make_rev(3i64);
/// let collector = monitor(SolutionCollector::all(vec![x]));
/// assert_eq!(collector.borrow().solution_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct SolutionCollector<T: RevValue> {
    vars: Vec<Rev<T>>,
    mode: CollectionMode,
    solutions: Vec<CollectedSolution<T>>,
    start: Option<Instant>,
}

impl<T: RevValue> SolutionCollector<T> {
    pub fn new(vars: Vec<Rev<T>>, mode: CollectionMode) -> Self {
        Self {
            vars,
            mode,
            solutions: Vec::new(),
            start: None,
        }
    }

    pub fn all(vars: Vec<Rev<T>>) -> Self {
        Self::new(vars, CollectionMode::All)
    }

    pub fn first(vars: Vec<Rev<T>>) -> Self {
        Self::new(vars, CollectionMode::First)
    }

    pub fn last(vars: Vec<Rev<T>>) -> Self {
        Self::new(vars, CollectionMode::Last)
    }

    pub fn mode(&self) -> CollectionMode {
        self.mode
    }

    pub fn solution_count(&self) -> usize {
        self.solutions.len()
    }

    pub fn solutions(&self) -> &[CollectedSolution<T>] {
        &self.solutions
    }

    pub fn solution(&self, index: usize) -> Option<&CollectedSolution<T>> {
        self.solutions.get(index)
    }

    /// Returns the value of `vars[var]` in solution `index`.
    pub fn value(&self, index: usize, var: usize) -> Option<T> {
        self.solutions.get(index)?.values.get(var).copied()
    }

    fn push_solution(&mut self, solver: &Solver) {
        let values = self.vars.iter().map(|v| solver.value(*v)).collect();
        self.solutions.push(CollectedSolution {
            values,
            branches: solver.branches(),
            failures: solver.failures(),
            wall_time: self.start.map(|s| s.elapsed()).unwrap_or_default(),
        });
    }
}

impl<T: RevValue> SearchMonitor for SolutionCollector<T> {
    fn enter_search(&mut self, _solver: &mut Solver) {
        self.solutions.clear();
        self.start = Some(Instant::now());
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        match self.mode {
            CollectionMode::All => {
                self.push_solution(solver);
                true
            }
            CollectionMode::First => {
                if self.solutions.is_empty() {
                    self.push_solution(solver);
                }
                false
            }
            CollectionMode::Last => {
                self.solutions.clear();
                self.push_solution(solver);
                true
            }
        }
    }
}
