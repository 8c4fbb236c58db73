//! Decisions, decision builders and a recording monitor over [`IntVar`]s.

use std::fmt;
use std::rc::Rc;

use cpforge_solver::{Decision, DecisionBuilder, SearchMonitor, SearchResult, Solver};

use crate::intvar::IntVar;

/// `var == value` on the left branch, `var != value` on the right one.
pub struct AssignValue {
    var: IntVar,
    value: i64,
}

impl AssignValue {
    pub fn new(var: IntVar, value: i64) -> Self {
        Self { var, value }
    }
}

impl fmt::Debug for AssignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.var.name(), self.value)
    }
}

impl Decision for AssignValue {
    fn apply(&self, solver: &mut Solver) -> SearchResult<()> {
        self.var.set_value(solver, self.value)
    }

    fn refute(&self, solver: &mut Solver) -> SearchResult<()> {
        self.var.remove_value(solver, self.value)
    }
}

/// How [`FirstUnbound`] picks the value to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueStrategy {
    Min,
    Max,
    /// Uniform over the domain, drawn from the solver's random generator.
    Random,
}

/// Branches on the first unbound variable.
pub struct FirstUnbound {
    vars: Vec<IntVar>,
    strategy: ValueStrategy,
}

impl FirstUnbound {
    pub fn new(vars: Vec<IntVar>, strategy: ValueStrategy) -> Self {
        Self { vars, strategy }
    }

    pub fn min_value(vars: Vec<IntVar>) -> Self {
        Self::new(vars, ValueStrategy::Min)
    }
}

impl DecisionBuilder for FirstUnbound {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        let Some(var) = self.vars.iter().find(|v| !v.is_bound(solver)) else {
            return Ok(None);
        };
        let value = match self.strategy {
            ValueStrategy::Min => var.min(solver),
            ValueStrategy::Max => var.max(solver),
            ValueStrategy::Random => {
                let size = u64::from(var.size(solver));
                let n = solver.rand_u64(size) as usize;
                var.nth_value(solver, n).unwrap_or_else(|| var.min(solver))
            }
        };
        let decision: Rc<dyn Decision> = Rc::new(AssignValue::new(var.clone(), value));
        Ok(Some(decision))
    }

    fn name(&self) -> &str {
        "FirstUnbound"
    }
}

/// Records the values of bound variables at every solution.
#[derive(Debug)]
pub struct SolutionRecorder {
    vars: Vec<IntVar>,
    keep_going: bool,
    solutions: Vec<Vec<i64>>,
}

impl SolutionRecorder {
    /// Records every solution and asks `solve` to keep enumerating.
    pub fn all(vars: Vec<IntVar>) -> Self {
        Self {
            vars,
            keep_going: true,
            solutions: Vec::new(),
        }
    }

    /// Records solutions without asking `solve` to continue.
    pub fn passive(vars: Vec<IntVar>) -> Self {
        Self {
            vars,
            keep_going: false,
            solutions: Vec::new(),
        }
    }

    pub fn solutions(&self) -> &[Vec<i64>] {
        &self.solutions
    }
}

impl SearchMonitor for SolutionRecorder {
    fn enter_search(&mut self, _solver: &mut Solver) {
        self.solutions.clear();
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        let values = self
            .vars
            .iter()
            .map(|v| v.value(solver).unwrap_or_else(|| v.min(solver)))
            .collect();
        self.solutions.push(values);
        self.keep_going
    }
}
