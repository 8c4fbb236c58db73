//! Logging monitors.

use std::time::Instant;

use tracing::{debug, info};

use crate::decision::{Decision, DecisionBuilder};
use crate::failure::SearchResult;
use crate::solver::Solver;

use super::SearchMonitor;

/// Logs every search event at debug level.
///
/// Installed automatically on top-level searches when `trace_search` is set
/// in the solver configuration.
#[derive(Debug, Clone, Default)]
pub struct SearchTrace {
    prefix: String,
}

impl SearchTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a trace whose messages carry `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl SearchMonitor for SearchTrace {
    fn enter_search(&mut self, solver: &mut Solver) {
        debug!(prefix = %self.prefix, depth = solver.solve_depth(), "enter search");
    }

    fn restart_search(&mut self, _solver: &mut Solver) {
        debug!(prefix = %self.prefix, "restart search");
    }

    fn exit_search(&mut self, _solver: &mut Solver) {
        debug!(prefix = %self.prefix, "exit search");
    }

    fn end_next_decision(
        &mut self,
        solver: &mut Solver,
        _builder: &dyn DecisionBuilder,
        decision: Option<&dyn Decision>,
    ) -> SearchResult<()> {
        match decision {
            Some(d) => debug!(prefix = %self.prefix, depth = solver.search_depth(), decision = ?d, "next decision"),
            None => debug!(prefix = %self.prefix, depth = solver.search_depth(), "leaf"),
        }
        Ok(())
    }

    fn apply_decision(&mut self, _solver: &mut Solver, decision: &dyn Decision) -> SearchResult<()> {
        debug!(prefix = %self.prefix, ?decision, "apply");
        Ok(())
    }

    fn refute_decision(&mut self, _solver: &mut Solver, decision: &dyn Decision) -> SearchResult<()> {
        debug!(prefix = %self.prefix, ?decision, "refute");
        Ok(())
    }

    fn begin_fail(&mut self, solver: &mut Solver) {
        debug!(prefix = %self.prefix, failures = solver.failures(), "begin fail");
    }

    fn end_fail(&mut self, _solver: &mut Solver) {
        debug!(prefix = %self.prefix, "end fail");
    }

    fn begin_initial_propagation(&mut self, _solver: &mut Solver) {
        debug!(prefix = %self.prefix, "begin initial propagation");
    }

    fn end_initial_propagation(&mut self, _solver: &mut Solver) -> SearchResult<()> {
        debug!(prefix = %self.prefix, "end initial propagation");
        Ok(())
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        debug!(
            prefix = %self.prefix,
            branches = solver.branches(),
            failures = solver.failures(),
            "solution found"
        );
        false
    }

    fn no_more_solutions(&mut self, _solver: &mut Solver) {
        debug!(prefix = %self.prefix, "no more solutions");
    }
}

/// Reports search progress at info level every `period` branches, plus a
/// summary on exit.
#[derive(Debug, Clone)]
pub struct SearchLog {
    period: u64,
    next_report: u64,
    solutions: u64,
    start: Option<Instant>,
}

impl SearchLog {
    /// Creates a log reporting every `period` branches.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(period: u64) -> Self {
        assert!(period > 0, "search log period must be positive");
        Self {
            period,
            next_report: period,
            solutions: 0,
            start: None,
        }
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    fn elapsed_ms(&self) -> u64 {
        self.start
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or_default()
    }
}

impl SearchMonitor for SearchLog {
    fn enter_search(&mut self, solver: &mut Solver) {
        self.start = Some(Instant::now());
        self.solutions = 0;
        self.next_report = solver.branches() + self.period;
        info!(depth = solver.solve_depth(), "Start search");
    }

    fn begin_next_decision(&mut self, solver: &mut Solver, _builder: &dyn DecisionBuilder) -> SearchResult<()> {
        let branches = solver.branches();
        if branches >= self.next_report {
            self.next_report = branches + self.period;
            info!(
                branches,
                failures = solver.failures(),
                depth = solver.search_depth(),
                solutions = self.solutions,
                elapsed_ms = self.elapsed_ms(),
                "Search progress"
            );
        }
        Ok(())
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        self.solutions += 1;
        info!(
            solution = self.solutions,
            branches = solver.branches(),
            failures = solver.failures(),
            elapsed_ms = self.elapsed_ms(),
            "Solution"
        );
        false
    }

    fn exit_search(&mut self, solver: &mut Solver) {
        info!(
            branches = solver.branches(),
            failures = solver.failures(),
            solutions = self.solutions,
            elapsed_ms = self.elapsed_ms(),
            "End search"
        );
    }
}
