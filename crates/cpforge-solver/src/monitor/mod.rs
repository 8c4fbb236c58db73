//! Search monitors: observers of the search lifecycle.
//!
//! A monitor is installed on one search by passing it to
//! [`Solver::new_search`] or [`Solver::solve`], or by a decision builder
//! through [`DecisionBuilder::append_monitors`]. Every hook receives the
//! solver so monitors can read reversible values or fail the current node.
//!
//! Hooks returning [`SearchResult`] may fail; the first failing monitor stops
//! the notification and the search backtracks.
//!
//! [`DecisionBuilder::append_monitors`]: crate::DecisionBuilder::append_monitors

mod collector;
mod counting;
mod log;

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::decision::{Decision, DecisionBuilder};
use crate::failure::SearchResult;
use crate::solver::Solver;

pub use collector::{CollectedSolution, CollectionMode, SolutionCollector};
pub use counting::CountingMonitor;
pub use log::{SearchLog, SearchTrace};

/// Shared handle to a monitor.
pub type MonitorRef = Rc<RefCell<dyn SearchMonitor>>;

/// Wraps a monitor into a [`MonitorRef`], keeping a typed handle for the
/// caller.
///
/// # Example
///
/// ```
/// use cpforge_solver::monitor::{monitor, CountingMonitor, MonitorRef};
///
/// let counter = monitor(CountingMonitor::new());
/// let installed: MonitorRef = counter.clone();
/// assert_eq!(counter.borrow().solutions(), 0);
/// # drop(installed);
/// ```
pub fn monitor<M: SearchMonitor + 'static>(m: M) -> Rc<RefCell<M>> {
    Rc::new(RefCell::new(m))
}

/// Observer of search events.
///
/// All hooks have empty defaults.
pub trait SearchMonitor: Debug {
    /// Called when a search starts, before the initial sentinel is pushed.
    fn enter_search(&mut self, _solver: &mut Solver) {}

    /// Called after the search was restarted from its root.
    fn restart_search(&mut self, _solver: &mut Solver) {}

    /// Called when the search ends.
    fn exit_search(&mut self, _solver: &mut Solver) {}

    fn begin_next_decision(&mut self, _solver: &mut Solver, _builder: &dyn DecisionBuilder) -> SearchResult<()> {
        Ok(())
    }

    fn end_next_decision(
        &mut self,
        _solver: &mut Solver,
        _builder: &dyn DecisionBuilder,
        _decision: Option<&dyn Decision>,
    ) -> SearchResult<()> {
        Ok(())
    }

    /// Called before a decision is applied.
    fn apply_decision(&mut self, _solver: &mut Solver, _decision: &dyn Decision) -> SearchResult<()> {
        Ok(())
    }

    /// Called before a decision is refuted.
    fn refute_decision(&mut self, _solver: &mut Solver, _decision: &dyn Decision) -> SearchResult<()> {
        Ok(())
    }

    /// Called after a decision was applied (`applied`) or refuted.
    fn after_decision(&mut self, _solver: &mut Solver, _decision: &dyn Decision, _applied: bool) -> SearchResult<()> {
        Ok(())
    }

    /// Called when a failure is caught, before backtracking.
    fn begin_fail(&mut self, _solver: &mut Solver) {}

    /// Called after backtracking from a failure.
    fn end_fail(&mut self, _solver: &mut Solver) {}

    fn begin_initial_propagation(&mut self, _solver: &mut Solver) {}

    fn end_initial_propagation(&mut self, _solver: &mut Solver) -> SearchResult<()> {
        Ok(())
    }

    /// Votes on a leaf. The leaf is a solution only if every monitor accepts.
    fn accept_solution(&mut self, _solver: &mut Solver) -> bool {
        true
    }

    /// Called on an accepted solution. Returning true asks a `solve` call to
    /// keep enumerating.
    fn at_solution(&mut self, _solver: &mut Solver) -> bool {
        false
    }

    /// Called when the search tree is exhausted.
    fn no_more_solutions(&mut self, _solver: &mut Solver) {}

    /// Polled periodically during propagation.
    fn periodic_check(&mut self, _solver: &mut Solver) -> SearchResult<()> {
        Ok(())
    }

    /// Estimated progress in percent, if the monitor can tell.
    fn progress_percent(&self, _solver: &Solver) -> Option<u32> {
        None
    }
}
