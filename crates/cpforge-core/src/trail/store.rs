//! Reversible value store.
//!
//! Every reversible primitive lives in a typed column of the [`RevStore`] and
//! is addressed through a copyable [`Rev`] handle. Writes go through the
//! store so the previous value can be recorded on the [`Trail`] first.

use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Add;

use super::{Trail, TrailCell};

mod sealed {
    pub trait Sealed {}
}

/// Primitive types that can be stored reversibly.
///
/// Implemented for `i32`, `i64`, `u64`, `f64`, `usize` and `bool`. Each type
/// maps to its own trail segment and store column.
pub trait RevValue: Copy + Debug + sealed::Sealed + 'static {
    /// Bit pattern used by the trail block encoding.
    fn to_bits(self) -> u64;

    /// Inverse of [`to_bits`](RevValue::to_bits).
    fn from_bits(bits: u64) -> Self;

    #[doc(hidden)]
    fn column(store: &RevStore) -> &RevColumn<Self>;

    #[doc(hidden)]
    fn column_mut(store: &mut RevStore) -> &mut RevColumn<Self>;

    #[doc(hidden)]
    fn record(trail: &mut Trail, cell: TrailCell<Self>);

    #[doc(hidden)]
    fn restore(trail: &mut Trail, store: &mut RevStore, len: usize);

    #[doc(hidden)]
    fn recorded(trail: &Trail) -> usize;
}

macro_rules! impl_rev_value {
    ($ty:ty, $column:ident, $segment:ident, $to:expr, $from:expr) => {
        impl sealed::Sealed for $ty {}

        impl RevValue for $ty {
            #[inline]
            fn to_bits(self) -> u64 {
                let f: fn($ty) -> u64 = $to;
                f(self)
            }

            #[inline]
            fn from_bits(bits: u64) -> Self {
                let f: fn(u64) -> $ty = $from;
                f(bits)
            }

            fn column(store: &RevStore) -> &RevColumn<Self> {
                &store.$column
            }

            fn column_mut(store: &mut RevStore) -> &mut RevColumn<Self> {
                &mut store.$column
            }

            fn record(trail: &mut Trail, cell: TrailCell<Self>) {
                trail.$segment.push(cell);
            }

            fn restore(trail: &mut Trail, store: &mut RevStore, len: usize) {
                while trail.$segment.len() > len {
                    let cell = trail.$segment.pop();
                    store.$column.values[cell.index as usize] = cell.old;
                }
            }

            fn recorded(trail: &Trail) -> usize {
                trail.$segment.len()
            }
        }
    };
}

impl_rev_value!(i32, ints, rev_ints, |v| v as u32 as u64, |b| b as u32 as i32);
impl_rev_value!(i64, int64s, rev_int64s, |v| v as u64, |b| b as i64);
impl_rev_value!(u64, uint64s, rev_uint64s, |v| v, |b| b);
impl_rev_value!(f64, doubles, rev_doubles, f64::to_bits, f64::from_bits);
impl_rev_value!(usize, ptrs, rev_ptrs, |v| v as u64, |b| b as usize);

impl sealed::Sealed for bool {}

impl RevValue for bool {
    #[inline]
    fn to_bits(self) -> u64 {
        u64::from(self)
    }

    #[inline]
    fn from_bits(bits: u64) -> Self {
        bits != 0
    }

    fn column(store: &RevStore) -> &RevColumn<Self> {
        &store.bools
    }

    fn column_mut(store: &mut RevStore) -> &mut RevColumn<Self> {
        &mut store.bools
    }

    fn record(trail: &mut Trail, cell: TrailCell<Self>) {
        trail.rev_bools.push(cell);
    }

    fn restore(trail: &mut Trail, store: &mut RevStore, len: usize) {
        while trail.rev_bools.len() > len {
            let Some(cell) = trail.rev_bools.pop() else {
                break;
            };
            store.bools.values[cell.index as usize] = cell.old;
        }
    }

    fn recorded(trail: &Trail) -> usize {
        trail.rev_bools.len()
    }
}

/// Typed handle to a reversible cell.
///
/// Handles are plain indices. A handle created inside a search scope must not
/// outlive that scope: the cell is released when the scope is backtracked.
pub struct Rev<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Rev<T> {
    /// Returns the arena index of the cell.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }
}

impl<T> Clone for Rev<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Rev<T> {}

impl<T> PartialEq for Rev<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Rev<T> {}

impl<T> Hash for Rev<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Debug for Rev<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rev<{}>({})", std::any::type_name::<T>(), self.index)
    }
}

/// One typed column of the store: current values plus the stamp at which
/// each cell was last saved.
#[derive(Debug, Clone)]
pub struct RevColumn<T> {
    values: Vec<T>,
    stamps: Vec<u64>,
}

impl<T> Default for RevColumn<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            stamps: Vec::new(),
        }
    }
}

impl<T> RevColumn<T> {
    /// Returns the number of live cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the column holds no cell.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
        self.stamps.truncate(len);
    }
}

/// Column lengths of a [`RevStore`], captured by a trail mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StoreMark {
    ints: usize,
    int64s: usize,
    uint64s: usize,
    doubles: usize,
    ptrs: usize,
    bools: usize,
}

/// Arena of reversible primitive cells.
#[derive(Debug, Default)]
pub struct RevStore {
    ints: RevColumn<i32>,
    int64s: RevColumn<i64>,
    uint64s: RevColumn<u64>,
    doubles: RevColumn<f64>,
    ptrs: RevColumn<usize>,
    bools: RevColumn<bool>,
}

impl RevStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a cell holding `value`.
    pub fn make<T: RevValue>(&mut self, value: T) -> Rev<T> {
        let column = T::column_mut(self);
        let index = u32::try_from(column.values.len()).unwrap_or_else(|_| {
            panic!("reversible store column for {} is full", std::any::type_name::<T>())
        });
        column.values.push(value);
        column.stamps.push(0);
        Rev {
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the current value of a cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell was released by a backtrack.
    #[inline]
    pub fn get<T: RevValue>(&self, rev: Rev<T>) -> T {
        T::column(self).values[rev.index as usize]
    }

    /// Records the current value of `rev` on the trail unconditionally.
    pub fn save<T: RevValue>(&mut self, trail: &mut Trail, rev: Rev<T>) {
        let old = self.get(rev);
        T::record(trail, TrailCell { index: rev.index, old });
    }

    /// Writes `value` into `rev`.
    ///
    /// The previous value is recorded at most once per `stamp`, and writes of
    /// an identical bit pattern are skipped entirely.
    pub fn set<T: RevValue>(&mut self, trail: &mut Trail, rev: Rev<T>, value: T, stamp: u64) {
        let i = rev.index as usize;
        let column = T::column_mut(self);
        let old = column.values[i];
        if old.to_bits() == value.to_bits() {
            return;
        }
        if column.stamps[i] < stamp {
            column.stamps[i] = stamp;
            T::record(trail, TrailCell { index: rev.index, old });
        }
        column.values[i] = value;
    }

    /// Adds `delta` to an integer cell with the same saving policy as
    /// [`set`](RevStore::set).
    pub fn add<T>(&mut self, trail: &mut Trail, rev: Rev<T>, delta: T, stamp: u64)
    where
        T: RevValue + Add<Output = T>,
    {
        let value = self.get(rev) + delta;
        self.set(trail, rev, value, stamp);
    }

    /// Returns the column for `T`.
    pub fn column<T: RevValue>(&self) -> &RevColumn<T> {
        T::column(self)
    }

    pub(crate) fn mark(&self) -> StoreMark {
        StoreMark {
            ints: self.ints.len(),
            int64s: self.int64s.len(),
            uint64s: self.uint64s.len(),
            doubles: self.doubles.len(),
            ptrs: self.ptrs.len(),
            bools: self.bools.len(),
        }
    }

    pub(crate) fn truncate(&mut self, mark: &StoreMark) {
        self.ints.truncate(mark.ints);
        self.int64s.truncate(mark.int64s);
        self.uint64s.truncate(mark.uint64s);
        self.doubles.truncate(mark.doubles);
        self.ptrs.truncate(mark.ptrs);
        self.bools.truncate(mark.bools);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_round_trip() {
        assert_eq!(i32::from_bits((-7i32).to_bits()), -7);
        assert_eq!(i64::from_bits(i64::MIN.to_bits()), i64::MIN);
        assert_eq!(usize::from_bits(usize::MAX.to_bits()), usize::MAX);
        assert!(bool::from_bits(true.to_bits()));
        assert!(f64::from_bits(f64::NAN.to_bits()).is_nan());
        // Negative i32 must not leak sign bits into the high word.
        assert_eq!((-1i32).to_bits(), u32::MAX as u64);
    }

    #[test]
    fn test_set_saves_once_per_stamp() {
        let mut store = RevStore::new();
        let mut trail = Trail::new(16);
        let x = store.make(1i64);

        store.set(&mut trail, x, 2, 5);
        store.set(&mut trail, x, 3, 5);
        assert_eq!(store.get(x), 3);
        assert_eq!(trail.total_len(), 1);

        store.set(&mut trail, x, 4, 6);
        assert_eq!(trail.total_len(), 2);
    }

    #[test]
    fn test_set_skips_unchanged_value() {
        let mut store = RevStore::new();
        let mut trail = Trail::new(16);
        let b = store.make(false);
        store.set(&mut trail, b, false, 9);
        assert_eq!(trail.total_len(), 0);
    }

    #[test]
    fn test_save_records_unconditionally() {
        let mut store = RevStore::new();
        let mut trail = Trail::new(16);
        let p = store.make(3usize);
        store.save(&mut trail, p);
        store.save(&mut trail, p);
        assert_eq!(trail.total_len(), 2);
    }

    #[test]
    fn test_add() {
        let mut store = RevStore::new();
        let mut trail = Trail::new(16);
        let n = store.make(10i32);
        store.add(&mut trail, n, -3, 1);
        assert_eq!(store.get(n), 7);
    }

    #[test]
    fn test_handle_debug_names_type() {
        let mut store = RevStore::new();
        let d = store.make(0.5f64);
        assert_eq!(format!("{d:?}"), "Rev<f64>(0)");
        assert_eq!(store.column::<f64>().len(), 1);
    }
}
