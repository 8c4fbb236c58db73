//! Search limits.
//!
//! A [`SearchLimit`] monitor wraps a [`LimitCheck`]. Once the check reports
//! the limit as crossed, the monitor fails every following decision, refutation
//! and periodic check, which unwinds the search to its sentinel.

mod composite;
mod counts;
mod external;
mod regular;
mod time;

use std::fmt::Debug;
use std::time::{Duration, Instant};

use cpforge_config::LimitConfig;
use tracing::debug;

use crate::decision::{Decision, DecisionBuilder};
use crate::failure::SearchResult;
use crate::monitor::SearchMonitor;
use crate::solver::Solver;

pub use composite::{AndLimit, OrLimit};
pub use counts::{BranchLimit, FailureLimit, SolutionLimit};
pub use external::ExternalLimit;
pub use regular::RegularLimit;
pub use time::TimeLimit;

/// Counters a limit is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchProgress {
    pub branches: u64,
    pub failures: u64,
    pub solutions: u64,
    pub elapsed: Duration,
}

/// Trait for deciding when a search must stop.
pub trait LimitCheck: Debug {
    /// Returns true once the limit is reached.
    fn is_crossed(&self, progress: &SearchProgress) -> bool;

    /// Returns how far the search is towards the limit, in percent.
    fn progress_percent(&self, _progress: &SearchProgress) -> Option<u32> {
        None
    }
}

pub(crate) fn percent_of(value: u64, limit: u64) -> u32 {
    if limit == 0 {
        100
    } else {
        (value.saturating_mul(100) / limit).min(100) as u32
    }
}

/// Monitor failing the search once its check is crossed.
///
/// By default the counters restart at every `enter_search`; a cumulative
/// limit counts from the creation of the solver instead.
///
/// # Example
///
/// ```
/// use cpforge_solver::limit::{BranchLimit, SearchLimit};
/// use cpforge_solver::monitor::monitor;
///
/// let limit = monitor(SearchLimit::new(BranchLimit::new(1000)));
/// assert!(!limit.borrow().is_crossed());
/// ```
#[derive(Debug)]
pub struct SearchLimit<L> {
    check: L,
    cumulative: bool,
    crossed: bool,
    baseline: SearchProgress,
    start: Option<Instant>,
}

impl<L: LimitCheck> SearchLimit<L> {
    pub fn new(check: L) -> Self {
        Self {
            check,
            cumulative: false,
            crossed: false,
            baseline: SearchProgress::default(),
            start: None,
        }
    }

    /// Counts from the creation of the solver instead of the search entry.
    pub fn with_cumulative(mut self, cumulative: bool) -> Self {
        self.cumulative = cumulative;
        self
    }

    pub fn check(&self) -> &L {
        &self.check
    }

    /// Returns true once the limit stopped the search.
    pub fn is_crossed(&self) -> bool {
        self.crossed
    }

    /// Returns the counters the check sees.
    pub fn progress(&self, solver: &Solver) -> SearchProgress {
        if self.cumulative {
            SearchProgress {
                branches: solver.branches(),
                failures: solver.failures(),
                solutions: solver.total_solutions(),
                elapsed: solver.wall_time(),
            }
        } else {
            SearchProgress {
                branches: solver.branches() - self.baseline.branches,
                failures: solver.failures() - self.baseline.failures,
                solutions: solver.total_solutions() - self.baseline.solutions,
                elapsed: self.start.map(|s| s.elapsed()).unwrap_or_default(),
            }
        }
    }

    fn check_and_fail(&mut self, solver: &mut Solver) -> SearchResult<()> {
        if !self.crossed {
            let progress = self.progress(solver);
            if self.check.is_crossed(&progress) {
                debug!(
                    limit = ?self.check,
                    branches = progress.branches,
                    failures = progress.failures,
                    solutions = progress.solutions,
                    "search limit crossed"
                );
                self.crossed = true;
            }
        }
        if self.crossed {
            Err(solver.fail())
        } else {
            Ok(())
        }
    }
}

impl SearchLimit<RegularLimit> {
    /// Builds the limit described by a [`LimitConfig`].
    pub fn from_config(config: &LimitConfig) -> Self {
        Self::new(RegularLimit::from_config(config)).with_cumulative(config.cumulative)
    }
}

impl<L: LimitCheck> SearchMonitor for SearchLimit<L> {
    fn enter_search(&mut self, solver: &mut Solver) {
        self.crossed = false;
        self.start = Some(Instant::now());
        self.baseline = SearchProgress {
            branches: solver.branches(),
            failures: solver.failures(),
            solutions: solver.total_solutions(),
            elapsed: Duration::ZERO,
        };
    }

    fn begin_next_decision(&mut self, solver: &mut Solver, _builder: &dyn DecisionBuilder) -> SearchResult<()> {
        self.check_and_fail(solver)
    }

    fn refute_decision(&mut self, solver: &mut Solver, _decision: &dyn Decision) -> SearchResult<()> {
        self.check_and_fail(solver)
    }

    fn periodic_check(&mut self, solver: &mut Solver) -> SearchResult<()> {
        self.check_and_fail(solver)
    }

    fn progress_percent(&self, solver: &Solver) -> Option<u32> {
        self.check.progress_percent(&self.progress(solver))
    }
}
