//! Solver statistics.
//!
//! Counters kept by the solver for its whole lifetime, and the snapshot
//! returned by [`Solver::statistics`](crate::Solver::statistics).

use std::fmt;
use std::time::{Duration, Instant};

use crate::demon::DemonPriority;

/// Solver-level counters.
///
/// # Example
///
/// ```
/// use cpforge_solver::stats::SolverStats;
/// use cpforge_solver::DemonPriority;
///
/// let mut stats = SolverStats::default();
/// stats.start();
/// stats.record_branch();
/// stats.record_failure();
/// stats.record_demon_run(DemonPriority::Var);
///
/// assert_eq!(stats.branches, 1);
/// assert_eq!(stats.failures, 1);
/// assert_eq!(stats.demon_runs(DemonPriority::Var), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct SolverStats {
    start_time: Option<Instant>,
    /// Branches explored, left and right.
    pub branches: u64,
    /// Failures signalled.
    pub failures: u64,
    /// Decisions applied on a left branch.
    pub decisions: u64,
    /// Accepted solutions across all searches.
    pub solutions: u64,
    demon_runs: [u64; 3],
}

impl SolverStats {
    /// Marks the start of the solver's lifetime.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Returns the elapsed time since [`start`](SolverStats::start).
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn record_branch(&mut self) {
        self.branches += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn record_decision(&mut self) {
        self.decisions += 1;
    }

    pub fn record_solution(&mut self) {
        self.solutions += 1;
    }

    pub fn record_demon_run(&mut self, priority: DemonPriority) {
        self.demon_runs[priority.index()] += 1;
    }

    /// Returns the number of demon runs at `priority`.
    pub fn demon_runs(&self, priority: DemonPriority) -> u64 {
        self.demon_runs[priority.index()]
    }

    /// Returns the branch rate per second.
    pub fn branches_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.branches as f64 / secs
        } else {
            0.0
        }
    }
}

/// Snapshot of the solver counters.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverStatistics {
    pub branches: u64,
    pub failures: u64,
    pub decisions: u64,
    pub solutions: u64,
    pub var_demon_runs: u64,
    pub normal_demon_runs: u64,
    pub delayed_demon_runs: u64,
    pub trail_cells: usize,
    pub trail_packed_bytes: usize,
    pub wall_time: Duration,
}

impl fmt::Display for SolverStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "branches: {}, failures: {}, decisions: {}, solutions: {}, demon runs: {}/{}/{}, trail: {} cells ({} packed bytes), wall time: {} ms",
            self.branches,
            self.failures,
            self.decisions,
            self.solutions,
            self.var_demon_runs,
            self.normal_demon_runs,
            self.delayed_demon_runs,
            self.trail_cells,
            self.trail_packed_bytes,
            self.wall_time.as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demon_runs_by_priority() {
        let mut stats = SolverStats::default();
        stats.record_demon_run(DemonPriority::Var);
        stats.record_demon_run(DemonPriority::Delayed);
        stats.record_demon_run(DemonPriority::Delayed);
        assert_eq!(stats.demon_runs(DemonPriority::Var), 1);
        assert_eq!(stats.demon_runs(DemonPriority::Normal), 0);
        assert_eq!(stats.demon_runs(DemonPriority::Delayed), 2);
    }

    #[test]
    fn test_elapsed_is_zero_before_start() {
        let stats = SolverStats::default();
        assert_eq!(stats.elapsed(), Duration::ZERO);
        assert_eq!(stats.branches_per_second(), 0.0);
    }

    #[test]
    fn test_statistics_display() {
        let snapshot = SolverStatistics {
            branches: 4,
            failures: 2,
            decisions: 3,
            solutions: 1,
            var_demon_runs: 5,
            normal_demon_runs: 6,
            delayed_demon_runs: 7,
            trail_cells: 8,
            trail_packed_bytes: 0,
            wall_time: Duration::from_millis(12),
        };
        let text = snapshot.to_string();
        assert!(text.starts_with("branches: 4, failures: 2"));
        assert!(text.contains("demon runs: 5/6/7"));
        assert!(text.ends_with("wall time: 12 ms"));
    }
}
