//! Composite limits (AND/OR).
//!
//! Uses macro-generated tuple implementations.

use super::{LimitCheck, SearchProgress};

/// Crossed when ANY child limit is crossed.
///
/// # Examples
///
/// ```
/// use cpforge_solver::limit::{BranchLimit, OrLimit, TimeLimit};
///
/// // Stop after 30 seconds OR 1000 branches
/// let limit = OrLimit((TimeLimit::seconds(30), BranchLimit::new(1000)));
/// ```
#[derive(Debug, Clone)]
pub struct OrLimit<T>(pub T);

impl<T> OrLimit<T> {
    pub fn new(limits: T) -> Self {
        Self(limits)
    }
}

macro_rules! impl_or_limit {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T),+> LimitCheck for OrLimit<($($T,)+)>
        where
            $($T: LimitCheck,)+
        {
            fn is_crossed(&self, progress: &SearchProgress) -> bool {
                $((self.0).$idx.is_crossed(progress))||+
            }

            fn progress_percent(&self, progress: &SearchProgress) -> Option<u32> {
                [$((self.0).$idx.progress_percent(progress)),+].into_iter().flatten().max()
            }
        }
    };
}

impl_or_limit!(0: T0);
impl_or_limit!(0: T0, 1: T1);
impl_or_limit!(0: T0, 1: T1, 2: T2);
impl_or_limit!(0: T0, 1: T1, 2: T2, 3: T3);
impl_or_limit!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_or_limit!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);

/// Crossed when ALL child limits are crossed.
///
/// # Examples
///
/// ```
/// use cpforge_solver::limit::{AndLimit, FailureLimit, SolutionLimit};
///
/// // Stop only once 10 solutions were found AND 100 failures happened
/// let limit = AndLimit((SolutionLimit::new(10), FailureLimit::new(100)));
/// ```
#[derive(Debug, Clone)]
pub struct AndLimit<T>(pub T);

impl<T> AndLimit<T> {
    pub fn new(limits: T) -> Self {
        Self(limits)
    }
}

macro_rules! impl_and_limit {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T),+> LimitCheck for AndLimit<($($T,)+)>
        where
            $($T: LimitCheck,)+
        {
            fn is_crossed(&self, progress: &SearchProgress) -> bool {
                $((self.0).$idx.is_crossed(progress))&&+
            }

            fn progress_percent(&self, progress: &SearchProgress) -> Option<u32> {
                [$((self.0).$idx.progress_percent(progress)),+].into_iter().flatten().min()
            }
        }
    };
}

impl_and_limit!(0: T0);
impl_and_limit!(0: T0, 1: T1);
impl_and_limit!(0: T0, 1: T1, 2: T2);
impl_and_limit!(0: T0, 1: T1, 2: T2, 3: T3);
impl_and_limit!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_and_limit!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
