//! cpforge - a constraint programming runtime.
//!
//! The runtime provides reversible memory, a demon propagation queue and a
//! backtracking search driven by decision builders. Variables and
//! constraints are supplied by the caller through the [`Constraint`],
//! [`Demon`], [`Decision`] and [`DecisionBuilder`] traits.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use cpforge::prelude::*;
//!
//! // Sets an unassigned cell to 1, or to 2 on backtrack.
//! struct Assign(Rev<i64>);
//!
//! impl DecisionBuilder for Assign {
//!     fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
//!         if solver.value(self.0) != 0 {
//!             return Ok(None);
//!         }
//!         let x = self.0;
//!         let decision: Rc<dyn Decision> = Rc::new(ClosureDecision::new(
//!             "x = 1",
//!             move |s: &mut Solver| {
//!                 s.set_value(x, 1);
//!                 Ok(())
//!             },
//!             move |s: &mut Solver| {
//!                 s.set_value(x, 2);
//!                 Ok(())
//!             },
//!         ));
//!         Ok(Some(decision))
//!     }
//! }
//!
//! let mut solver = Solver::new();
//! let x = solver.make_rev(0i64);
//! let collector = monitor(SolutionCollector::all(vec![x]));
//! assert!(solver.solve(Rc::new(Assign(x)), vec![collector.clone() as MonitorRef]));
//! assert_eq!(collector.borrow().solution_count(), 2);
//! ```

pub use cpforge_config::{ConfigError, LimitConfig, SolverConfig, TrailCompression};
pub use cpforge_core::{CpForgeError, Rev, RevAlloc, RevValue};

pub use cpforge_solver::limit;
pub use cpforge_solver::monitor;
pub use cpforge_solver::{
    ClosureDecision, ClosureDemon, ComposeDecisionBuilder, Constraint, Decision, DecisionBuilder,
    DecisionModification, Demon, DemonId, DemonPriority, Failure, ReverseDecision, SearchMonitor, SearchResult,
    Solver, SolverState, SolverStatistics,
};

pub mod console;

pub mod prelude {
    pub use cpforge_config::{SolverConfig, TrailCompression};
    pub use cpforge_core::Rev;
    pub use cpforge_solver::monitor::{monitor, CountingMonitor, MonitorRef, SearchLog, SolutionCollector};
    pub use cpforge_solver::{
        ClosureDecision, ComposeDecisionBuilder, Constraint, Decision, DecisionBuilder, Demon, DemonPriority,
        SearchMonitor, SearchResult, Solver, SolverState,
    };
}
