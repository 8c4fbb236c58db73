//! Counter-based limits.

use super::{percent_of, LimitCheck, SearchProgress};

macro_rules! count_limit {
    ($(#[$doc:meta])* $name:ident, $field:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            limit: u64,
        }

        impl $name {
            pub fn new(limit: u64) -> Self {
                Self { limit }
            }

            pub fn limit(&self) -> u64 {
                self.limit
            }
        }

        impl LimitCheck for $name {
            fn is_crossed(&self, progress: &SearchProgress) -> bool {
                progress.$field >= self.limit
            }

            fn progress_percent(&self, progress: &SearchProgress) -> Option<u32> {
                Some(percent_of(progress.$field, self.limit))
            }
        }
    };
}

count_limit!(
    /// Crossed after `limit` branches.
    ///
    /// # Example
    ///
    /// ```
    /// use cpforge_solver::limit::BranchLimit;
    ///
    /// let limit = BranchLimit::new(1000);
    /// assert_eq!(limit.limit(), 1000);
    /// ```
    BranchLimit,
    branches
);

count_limit!(
    /// Crossed after `limit` failures.
    FailureLimit,
    failures
);

count_limit!(
    /// Crossed after `limit` accepted solutions.
    SolutionLimit,
    solutions
);
