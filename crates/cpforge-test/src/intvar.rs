//! A small integer variable with a bitset domain.
//!
//! The domain is one reversible `u64`, so a variable spans at most 64
//! consecutive values. Demons attached with [`IntVar::when_domain`] are
//! woken whenever the domain shrinks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use cpforge_core::Rev;
use cpforge_solver::{DemonId, DemonPriority, SearchResult, Solver};
use smallvec::SmallVec;

struct IntVarInner {
    name: String,
    offset: i64,
    domain: Rev<u64>,
    watchers: RefCell<Vec<DemonId>>,
    watcher_count: Rev<usize>,
}

/// Shared handle to an integer variable.
#[derive(Clone)]
pub struct IntVar(Rc<IntVarInner>);

impl IntVar {
    /// Creates a variable with domain `min..=max`.
    ///
    /// # Panics
    ///
    /// Panics if the domain is empty or spans more than 64 values.
    pub fn new(solver: &mut Solver, name: impl Into<String>, min: i64, max: i64) -> Self {
        assert!(min <= max, "empty initial domain");
        let span = max - min + 1;
        assert!(span <= 64, "domain spans more than 64 values");
        let bits = if span == 64 { u64::MAX } else { (1u64 << span) - 1 };
        Self(Rc::new(IntVarInner {
            name: name.into(),
            offset: min,
            domain: solver.make_rev(bits),
            watchers: RefCell::new(Vec::new()),
            watcher_count: solver.make_rev(0usize),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Reversible cell holding the domain bits.
    pub fn domain(&self) -> Rev<u64> {
        self.0.domain
    }

    fn bits(&self, solver: &Solver) -> u64 {
        solver.value(self.0.domain)
    }

    fn bit(&self, value: i64) -> Option<u64> {
        let shift = value.checked_sub(self.0.offset)?;
        (0..64).contains(&shift).then(|| 1u64 << shift)
    }

    pub fn size(&self, solver: &Solver) -> u32 {
        self.bits(solver).count_ones()
    }

    pub fn is_bound(&self, solver: &Solver) -> bool {
        self.size(solver) == 1
    }

    pub fn contains(&self, solver: &Solver, value: i64) -> bool {
        self.bit(value).is_some_and(|b| self.bits(solver) & b != 0)
    }

    pub fn min(&self, solver: &Solver) -> i64 {
        self.0.offset + i64::from(self.bits(solver).trailing_zeros())
    }

    pub fn max(&self, solver: &Solver) -> i64 {
        self.0.offset + 63 - i64::from(self.bits(solver).leading_zeros())
    }

    /// Returns the value of a bound variable.
    pub fn value(&self, solver: &Solver) -> Option<i64> {
        self.is_bound(solver).then(|| self.min(solver))
    }

    /// Returns the values of the domain in increasing order.
    pub fn values(&self, solver: &Solver) -> Vec<i64> {
        let bits = self.bits(solver);
        (0..64)
            .filter(|i| bits & (1u64 << i) != 0)
            .map(|i| self.0.offset + i)
            .collect()
    }

    /// Returns the `n`-th smallest value of the domain.
    pub fn nth_value(&self, solver: &Solver, n: usize) -> Option<i64> {
        self.values(solver).get(n).copied()
    }

    pub fn set_value(&self, solver: &mut Solver, value: i64) -> SearchResult<()> {
        match self.bit(value) {
            Some(b) => self.restrict(solver, b),
            None => Err(solver.fail()),
        }
    }

    pub fn remove_value(&self, solver: &mut Solver, value: i64) -> SearchResult<()> {
        match self.bit(value) {
            Some(b) => self.restrict(solver, !b),
            None => Ok(()),
        }
    }

    /// Removes every value below `value`.
    pub fn set_min(&self, solver: &mut Solver, value: i64) -> SearchResult<()> {
        let shift = value - self.0.offset;
        if shift <= 0 {
            return Ok(());
        }
        if shift >= 64 {
            return Err(solver.fail());
        }
        self.restrict(solver, !((1u64 << shift) - 1))
    }

    /// Removes every value above `value`.
    pub fn set_max(&self, solver: &mut Solver, value: i64) -> SearchResult<()> {
        let shift = value - self.0.offset;
        if shift < 0 {
            return Err(solver.fail());
        }
        if shift >= 63 {
            return Ok(());
        }
        self.restrict(solver, (1u64 << (shift + 1)) - 1)
    }

    fn restrict(&self, solver: &mut Solver, mask: u64) -> SearchResult<()> {
        let old = self.bits(solver);
        let new = old & mask;
        if new == old {
            return Ok(());
        }
        if new == 0 {
            return Err(solver.fail());
        }
        solver.set_value(self.0.domain, new);
        self.notify(solver)
    }

    /// Attaches a demon run whenever the domain shrinks. The attachment is
    /// undone when the search backtracks past this point.
    pub fn when_domain(&self, solver: &mut Solver, demon: DemonId) {
        let count = solver.value(self.0.watcher_count);
        let mut watchers = self.0.watchers.borrow_mut();
        watchers.truncate(count);
        watchers.push(demon);
        solver.set_value(self.0.watcher_count, count + 1);
    }

    pub fn watcher_count(&self, solver: &Solver) -> usize {
        solver.value(self.0.watcher_count)
    }

    /// Wakes the watchers with the queue frozen: variable demons are queued,
    /// normal ones run now and delayed ones wait for the delayed queue.
    fn notify(&self, solver: &mut Solver) -> SearchResult<()> {
        let count = solver.value(self.0.watcher_count);
        let watchers: SmallVec<[DemonId; 8]> = self.0.watchers.borrow().iter().take(count).copied().collect();
        let mut delayed: SmallVec<[DemonId; 8]> = SmallVec::new();
        solver.freeze_queue();
        for id in watchers {
            match solver.demon_priority(id) {
                Some(DemonPriority::Var) => solver.enqueue_var(id)?,
                Some(DemonPriority::Normal) => solver.execute(id)?,
                Some(DemonPriority::Delayed) => delayed.push(id),
                None => {}
            }
        }
        solver.enqueue_all(&delayed);
        solver.unfreeze_queue()
    }
}

impl fmt::Debug for IntVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntVar")
            .field("name", &self.0.name)
            .field("offset", &self.0.offset)
            .finish_non_exhaustive()
    }
}
