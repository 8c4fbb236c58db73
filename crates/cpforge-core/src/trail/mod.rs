//! The trail: undo logs that let search restore reversible state.
//!
//! One segment per primitive type records `(cell index, old value)` pairs.
//! A [`TrailMark`] captures every segment length; backtracking to a mark pops
//! each segment back to its recorded length, newest entry first, writing the
//! old values into the [`RevStore`]. Cells and reversible allocations created
//! after the mark are released.

mod arena;
mod compressed;
mod packer;
mod store;


use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

pub use arena::{ArenaId, ScopedArena};
pub use compressed::CompressedTrail;
pub use packer::{NoCompressionPacker, TrailPacker, ZlibPacker};
pub use store::{Rev, RevColumn, RevStore, RevValue};

use store::StoreMark;

/// One undo record: the cell index and the value to restore.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailCell<T> {
    pub index: u32,
    pub old: T,
}

/// Snapshot of the trail and store lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrailMark {
    ints: usize,
    int64s: usize,
    uint64s: usize,
    doubles: usize,
    ptrs: usize,
    bools: usize,
    allocations: usize,
    store: StoreMark,
}

/// Handle to a value allocated with [`Trail::rev_alloc`].
pub struct RevAlloc<T> {
    id: ArenaId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RevAlloc<T> {
    pub fn id(self) -> ArenaId {
        self.id
    }
}

impl<T> Clone for RevAlloc<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RevAlloc<T> {}

impl<T> fmt::Debug for RevAlloc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevAlloc<{}>({:?})", std::any::type_name::<T>(), self.id)
    }
}

/// Typed undo logs plus the scope-owned allocation arena.
pub struct Trail {
    rev_ints: CompressedTrail<i32>,
    rev_int64s: CompressedTrail<i64>,
    rev_uint64s: CompressedTrail<u64>,
    rev_doubles: CompressedTrail<f64>,
    rev_ptrs: CompressedTrail<usize>,
    rev_bools: Vec<TrailCell<bool>>,
    allocations: ScopedArena<Box<dyn Any>>,
}

impl Trail {
    /// Creates a trail whose segments keep full blocks uncompressed.
    pub fn new(block_size: usize) -> Self {
        Self::with_packer(block_size, || Box::new(NoCompressionPacker))
    }

    /// Creates a trail whose segments each get a packer from `factory`.
    pub fn with_packer<F>(block_size: usize, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TrailPacker>,
    {
        Self {
            rev_ints: CompressedTrail::with_packer(block_size, factory()),
            rev_int64s: CompressedTrail::with_packer(block_size, factory()),
            rev_uint64s: CompressedTrail::with_packer(block_size, factory()),
            rev_doubles: CompressedTrail::with_packer(block_size, factory()),
            rev_ptrs: CompressedTrail::with_packer(block_size, factory()),
            rev_bools: Vec::new(),
            allocations: ScopedArena::new(),
        }
    }

    /// Records the old value of cell `index`.
    pub fn save<T: RevValue>(&mut self, index: u32, old: T) {
        T::record(self, TrailCell { index, old });
    }

    /// Returns the number of cells recorded in the segment for `T`.
    pub fn len_of<T: RevValue>(&self) -> usize {
        T::recorded(self)
    }

    /// Returns the number of cells recorded across all segments.
    pub fn total_len(&self) -> usize {
        self.rev_ints.len()
            + self.rev_int64s.len()
            + self.rev_uint64s.len()
            + self.rev_doubles.len()
            + self.rev_ptrs.len()
            + self.rev_bools.len()
    }

    /// Returns the bytes held by packed blocks across all segments.
    pub fn packed_bytes(&self) -> usize {
        self.rev_ints.packed_bytes()
            + self.rev_int64s.packed_bytes()
            + self.rev_uint64s.packed_bytes()
            + self.rev_doubles.packed_bytes()
            + self.rev_ptrs.packed_bytes()
    }

    /// Moves `value` into the trail-owned arena. It is dropped when the
    /// trail backtracks past the current point.
    pub fn rev_alloc<T: 'static>(&mut self, value: T) -> RevAlloc<T> {
        RevAlloc {
            id: self.allocations.alloc(Box::new(value)),
            _marker: PhantomData,
        }
    }

    /// Array form of [`rev_alloc`](Trail::rev_alloc).
    pub fn rev_alloc_array<T: 'static>(&mut self, values: Vec<T>) -> RevAlloc<Vec<T>> {
        self.rev_alloc(values)
    }

    /// Returns the allocation, or `None` if it has been released.
    pub fn rev_get<T: 'static>(&self, handle: RevAlloc<T>) -> Option<&T> {
        self.allocations.get(handle.id)?.downcast_ref()
    }

    pub fn rev_get_mut<T: 'static>(&mut self, handle: RevAlloc<T>) -> Option<&mut T> {
        self.allocations.get_mut(handle.id)?.downcast_mut()
    }

    /// Returns the number of live reversible allocations.
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    /// Captures the current lengths of the trail and of `store`.
    pub fn mark(&self, store: &RevStore) -> TrailMark {
        TrailMark {
            ints: self.rev_ints.len(),
            int64s: self.rev_int64s.len(),
            uint64s: self.rev_uint64s.len(),
            doubles: self.rev_doubles.len(),
            ptrs: self.rev_ptrs.len(),
            bools: self.rev_bools.len(),
            allocations: self.allocations.len(),
            store: store.mark(),
        }
    }

    /// Restores every cell recorded after `mark` and releases the cells and
    /// allocations created after it.
    pub fn backtrack_to(&mut self, mark: &TrailMark, store: &mut RevStore) {
        <i32 as RevValue>::restore(self, store, mark.ints);
        <i64 as RevValue>::restore(self, store, mark.int64s);
        <u64 as RevValue>::restore(self, store, mark.uint64s);
        <f64 as RevValue>::restore(self, store, mark.doubles);
        <usize as RevValue>::restore(self, store, mark.ptrs);
        <bool as RevValue>::restore(self, store, mark.bools);
        self.allocations.truncate(mark.allocations);
        store.truncate(&mark.store);
    }
}

impl fmt::Debug for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trail")
            .field("ints", &self.rev_ints)
            .field("int64s", &self.rev_int64s)
            .field("uint64s", &self.rev_uint64s)
            .field("doubles", &self.rev_doubles)
            .field("ptrs", &self.rev_ptrs)
            .field("bools", &self.rev_bools.len())
            .field("allocations", &self.allocations.len())
            .finish()
    }
}
