//! A monitor that counts events.

use crate::decision::{Decision, DecisionBuilder};
use crate::failure::SearchResult;
use crate::solver::Solver;

use super::SearchMonitor;

/// Counts every search event it observes.
///
/// Useful for testing and statistics collection.
#[derive(Debug, Default, Clone)]
pub struct CountingMonitor {
    enter_search: u64,
    restart_search: u64,
    exit_search: u64,
    begin_next_decision: u64,
    end_next_decision: u64,
    apply_decision: u64,
    refute_decision: u64,
    after_decision: u64,
    begin_fail: u64,
    end_fail: u64,
    initial_propagations: u64,
    accept_solution: u64,
    solutions: u64,
    no_more_solutions: u64,
    periodic_checks: u64,
}

impl CountingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_search_count(&self) -> u64 {
        self.enter_search
    }

    pub fn restart_search_count(&self) -> u64 {
        self.restart_search
    }

    pub fn exit_search_count(&self) -> u64 {
        self.exit_search
    }

    pub fn begin_next_decision_count(&self) -> u64 {
        self.begin_next_decision
    }

    pub fn end_next_decision_count(&self) -> u64 {
        self.end_next_decision
    }

    pub fn apply_decision_count(&self) -> u64 {
        self.apply_decision
    }

    pub fn refute_decision_count(&self) -> u64 {
        self.refute_decision
    }

    pub fn after_decision_count(&self) -> u64 {
        self.after_decision
    }

    pub fn begin_fail_count(&self) -> u64 {
        self.begin_fail
    }

    pub fn end_fail_count(&self) -> u64 {
        self.end_fail
    }

    /// Number of completed root propagations.
    pub fn initial_propagation_count(&self) -> u64 {
        self.initial_propagations
    }

    /// Number of leaves submitted for acceptance.
    pub fn accept_solution_count(&self) -> u64 {
        self.accept_solution
    }

    /// Number of accepted solutions.
    pub fn solutions(&self) -> u64 {
        self.solutions
    }

    pub fn no_more_solutions_count(&self) -> u64 {
        self.no_more_solutions
    }

    pub fn periodic_check_count(&self) -> u64 {
        self.periodic_checks
    }

    /// Resets all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl SearchMonitor for CountingMonitor {
    fn enter_search(&mut self, _solver: &mut Solver) {
        self.enter_search += 1;
    }

    fn restart_search(&mut self, _solver: &mut Solver) {
        self.restart_search += 1;
    }

    fn exit_search(&mut self, _solver: &mut Solver) {
        self.exit_search += 1;
    }

    fn begin_next_decision(&mut self, _solver: &mut Solver, _builder: &dyn DecisionBuilder) -> SearchResult<()> {
        self.begin_next_decision += 1;
        Ok(())
    }

    fn end_next_decision(
        &mut self,
        _solver: &mut Solver,
        _builder: &dyn DecisionBuilder,
        _decision: Option<&dyn Decision>,
    ) -> SearchResult<()> {
        self.end_next_decision += 1;
        Ok(())
    }

    fn apply_decision(&mut self, _solver: &mut Solver, _decision: &dyn Decision) -> SearchResult<()> {
        self.apply_decision += 1;
        Ok(())
    }

    fn refute_decision(&mut self, _solver: &mut Solver, _decision: &dyn Decision) -> SearchResult<()> {
        self.refute_decision += 1;
        Ok(())
    }

    fn after_decision(&mut self, _solver: &mut Solver, _decision: &dyn Decision, _applied: bool) -> SearchResult<()> {
        self.after_decision += 1;
        Ok(())
    }

    fn begin_fail(&mut self, _solver: &mut Solver) {
        self.begin_fail += 1;
    }

    fn end_fail(&mut self, _solver: &mut Solver) {
        self.end_fail += 1;
    }

    fn end_initial_propagation(&mut self, _solver: &mut Solver) -> SearchResult<()> {
        self.initial_propagations += 1;
        Ok(())
    }

    fn accept_solution(&mut self, _solver: &mut Solver) -> bool {
        self.accept_solution += 1;
        true
    }

    fn at_solution(&mut self, _solver: &mut Solver) -> bool {
        self.solutions += 1;
        false
    }

    fn no_more_solutions(&mut self, _solver: &mut Solver) {
        self.no_more_solutions += 1;
    }

    fn periodic_check(&mut self, _solver: &mut Solver) -> SearchResult<()> {
        self.periodic_checks += 1;
        Ok(())
    }
}
