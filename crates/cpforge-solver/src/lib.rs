//! cpforge solver engine
//!
//! This crate provides the runtime of the constraint solver:
//! - The search-failure signal ([`Failure`], [`SearchResult`])
//! - Demons and the propagation queue
//! - State markers and the choice-point search engine
//! - Search monitors and search limits
//! - The [`Solver`] that owns all reversible state

pub mod constraint;
pub mod decision;
pub mod demon;
pub mod failure;
pub mod limit;
pub mod marker;
pub mod monitor;
mod queue;
mod search;
pub mod solver;
pub mod stats;

#[cfg(test)]
mod search_tests;
#[cfg(test)]
mod test_utils;

pub use constraint::Constraint;
pub use decision::{ClosureDecision, ComposeDecisionBuilder, Decision, DecisionBuilder, DecisionModification, ReverseDecision};
pub use demon::{ClosureDemon, Demon, DemonId, DemonPriority};
pub use failure::{Failure, SearchResult};
pub use limit::{
    AndLimit, BranchLimit, ExternalLimit, FailureLimit, LimitCheck, OrLimit, RegularLimit, SearchLimit, SearchProgress,
    SolutionLimit, TimeLimit,
};
pub use marker::{Branch, MarkerType, SentinelKind};
pub use monitor::{
    monitor, CollectedSolution, CollectionMode, CountingMonitor, MonitorRef, SearchLog, SearchMonitor, SearchTrace,
    SolutionCollector,
};
pub use solver::{Solver, SolverState};
pub use stats::{SolverStatistics, SolverStats};
