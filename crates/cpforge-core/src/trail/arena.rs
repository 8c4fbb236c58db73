//! Stack-shaped arena whose entries are released on backtrack.

/// Generation-checked handle into a [`ScopedArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaId {
    index: u32,
    generation: u32,
}

impl ArenaId {
    /// Returns the slot index.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }
}

/// Arena that only grows at the end and shrinks back to a recorded length.
///
/// Truncating drops entries newest first and bumps the generation of every
/// freed slot, so stale [`ArenaId`]s resolve to `None` even after the slot
/// is reused.
#[derive(Debug)]
pub struct ScopedArena<T> {
    entries: Vec<T>,
    generations: Vec<u32>,
}

impl<T> Default for ScopedArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScopedArena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            generations: Vec::new(),
        }
    }

    /// Appends `value` and returns its handle.
    pub fn alloc(&mut self, value: T) -> ArenaId {
        let slot = self.entries.len();
        let index = u32::try_from(slot).unwrap_or_else(|_| panic!("scoped arena is full"));
        if slot == self.generations.len() {
            self.generations.push(0);
        }
        self.entries.push(value);
        ArenaId {
            index,
            generation: self.generations[slot],
        }
    }

    pub fn get(&self, id: ArenaId) -> Option<&T> {
        let slot = id.index as usize;
        if self.generations.get(slot) == Some(&id.generation) {
            self.entries.get(slot)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: ArenaId) -> Option<&mut T> {
        let slot = id.index as usize;
        if self.generations.get(slot) == Some(&id.generation) {
            self.entries.get_mut(slot)
        } else {
            None
        }
    }

    /// Returns true if `id` refers to a live entry.
    pub fn contains(&self, id: ArenaId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry at or past `len`, newest first.
    pub fn truncate(&mut self, len: usize) {
        while self.entries.len() > len {
            let slot = self.entries.len() - 1;
            self.generations[slot] = self.generations[slot].wrapping_add(1);
            drop(self.entries.pop());
        }
    }

    /// Iterates over live entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}
