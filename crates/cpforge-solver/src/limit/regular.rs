//! The configurable limit.

use std::time::Duration;

use cpforge_config::LimitConfig;

use super::{percent_of, LimitCheck, SearchProgress};

/// Crossed when any of its set bounds is reached.
///
/// # Example
///
/// ```
/// use cpforge_config::LimitConfig;
/// use cpforge_solver::limit::RegularLimit;
///
/// let config = LimitConfig { branches: Some(500), ..LimitConfig::default() };
/// let limit = RegularLimit::from_config(&config);
/// assert_eq!(limit.branches(), Some(500));
/// assert_eq!(limit.time(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegularLimit {
    time: Option<Duration>,
    branches: Option<u64>,
    failures: Option<u64>,
    solutions: Option<u64>,
}

impl RegularLimit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LimitConfig) -> Self {
        Self {
            time: config.time_limit(),
            branches: config.branches,
            failures: config.failures,
            solutions: config.solutions,
        }
    }

    pub fn with_time(mut self, limit: Duration) -> Self {
        self.time = Some(limit);
        self
    }

    pub fn with_branches(mut self, limit: u64) -> Self {
        self.branches = Some(limit);
        self
    }

    pub fn with_failures(mut self, limit: u64) -> Self {
        self.failures = Some(limit);
        self
    }

    pub fn with_solutions(mut self, limit: u64) -> Self {
        self.solutions = Some(limit);
        self
    }

    pub fn time(&self) -> Option<Duration> {
        self.time
    }

    pub fn branches(&self) -> Option<u64> {
        self.branches
    }

    pub fn failures(&self) -> Option<u64> {
        self.failures
    }

    pub fn solutions(&self) -> Option<u64> {
        self.solutions
    }
}

impl LimitCheck for RegularLimit {
    fn is_crossed(&self, progress: &SearchProgress) -> bool {
        self.time.is_some_and(|t| progress.elapsed >= t)
            || self.branches.is_some_and(|b| progress.branches >= b)
            || self.failures.is_some_and(|f| progress.failures >= f)
            || self.solutions.is_some_and(|s| progress.solutions >= s)
    }

    fn progress_percent(&self, progress: &SearchProgress) -> Option<u32> {
        [
            self.time
                .map(|t| percent_of(progress.elapsed.as_millis() as u64, t.as_millis() as u64)),
            self.branches.map(|b| percent_of(progress.branches, b)),
            self.failures.map(|f| percent_of(progress.failures, f)),
        ]
        .into_iter()
        .flatten()
        .max()
    }
}
