//! The search-failure signal.

use thiserror::Error;

/// Signal that the current search node is infeasible.
///
/// Returned as the `Err` side of [`SearchResult`] by propagation, decisions,
/// decision builders and monitor hooks, and propagated with `?` up to the
/// search loop, which backtracks. Only [`Solver::fail`](crate::Solver::fail)
/// creates one, so every failure is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("search failure")]
pub struct Failure {
    _private: (),
}

impl Failure {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// Result of a callback that may fail the current search node.
pub type SearchResult<T> = Result<T, Failure>;
