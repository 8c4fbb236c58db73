//! Time-based limit.

use std::time::Duration;

use super::{LimitCheck, SearchProgress};

/// Crossed once the search has run for `limit`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cpforge_solver::limit::TimeLimit;
///
/// let limit = TimeLimit::new(Duration::from_secs(30));
/// let limit = TimeLimit::millis(500);
/// ```
#[derive(Debug, Clone)]
pub struct TimeLimit {
    limit: Duration,
}

impl TimeLimit {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn seconds(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl LimitCheck for TimeLimit {
    fn is_crossed(&self, progress: &SearchProgress) -> bool {
        progress.elapsed >= self.limit
    }

    fn progress_percent(&self, progress: &SearchProgress) -> Option<u32> {
        let limit = self.limit.as_millis() as u64;
        Some(super::percent_of(progress.elapsed.as_millis() as u64, limit))
    }
}
