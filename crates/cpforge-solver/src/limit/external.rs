//! External limit via a shared AtomicBool flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{LimitCheck, SearchProgress};

/// Crossed when an external flag is set.
///
/// The flag may be set from another thread; the search notices it at its
/// next decision, refutation or periodic check.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use cpforge_solver::limit::ExternalLimit;
///
/// let flag = Arc::new(AtomicBool::new(false));
/// let limit = ExternalLimit::new(Arc::clone(&flag));
///
/// // Later: flag.store(true, Ordering::SeqCst);
/// # flag.store(true, Ordering::SeqCst);
/// ```
#[derive(Debug, Clone)]
pub struct ExternalLimit {
    flag: Arc<AtomicBool>,
}

impl ExternalLimit {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

impl LimitCheck for ExternalLimit {
    fn is_crossed(&self, _progress: &SearchProgress) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
