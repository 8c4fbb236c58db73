//! Block-compressible trail segment.
//!
//! Cells accumulate uncompressed in the current block. When it fills up it is
//! swapped with a spare buffer; the block previously held by the spare is
//! packed onto a stack of immutable blocks. Backtracking across a block
//! boundary swaps the spare back in, or unpacks the newest packed block.

use std::fmt;

use tracing::trace;

use super::packer::{NoCompressionPacker, TrailPacker};
use super::store::RevValue;
use super::TrailCell;

/// Size in bytes of one encoded cell: little-endian `u32` index followed by
/// the little-endian `u64` bit pattern of the old value.
const CELL_BYTES: usize = 12;

/// Append-only undo log for one primitive type.
pub struct CompressedTrail<T: RevValue> {
    block_size: usize,
    packer: Box<dyn TrailPacker>,
    // Packed immutable blocks, newest last.
    blocks: Vec<Vec<u8>>,
    // Recycled block allocations.
    free_blocks: Vec<Vec<u8>>,
    data: Vec<TrailCell<T>>,
    buffer: Vec<TrailCell<T>>,
    buffer_used: bool,
    len: usize,
    scratch: Vec<u8>,
}

impl<T: RevValue> CompressedTrail<T> {
    /// Creates an uncompressed segment with the given block size.
    pub fn new(block_size: usize) -> Self {
        Self::with_packer(block_size, Box::new(NoCompressionPacker))
    }

    /// Creates a segment packing full blocks with `packer`.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero.
    pub fn with_packer(block_size: usize, packer: Box<dyn TrailPacker>) -> Self {
        assert!(block_size > 0, "trail block size must be positive");
        Self {
            block_size,
            packer,
            blocks: Vec::new(),
            free_blocks: Vec::new(),
            data: Vec::with_capacity(block_size),
            buffer: Vec::with_capacity(block_size),
            buffer_used: false,
            len: 0,
            scratch: Vec::new(),
        }
    }

    /// Appends a cell.
    pub fn push(&mut self, cell: TrailCell<T>) {
        if self.data.len() >= self.block_size {
            if self.buffer_used {
                self.pack_buffer();
            }
            std::mem::swap(&mut self.data, &mut self.buffer);
            self.buffer_used = true;
            self.data.clear();
        }
        self.data.push(cell);
        self.len += 1;
    }

    /// Removes and returns the newest cell.
    ///
    /// # Panics
    ///
    /// Panics if the segment is empty.
    pub fn pop(&mut self) -> TrailCell<T> {
        let Some(cell) = self.data.pop() else {
            panic!("trail segment restored past its oldest block");
        };
        self.len -= 1;
        if self.data.is_empty() {
            if self.buffer_used {
                std::mem::swap(&mut self.data, &mut self.buffer);
                self.buffer_used = false;
            } else if let Some(block) = self.blocks.pop() {
                self.unpack_into_data(&block);
                self.recycle(block);
            }
        }
        cell
    }

    /// Returns the newest cell without removing it.
    pub fn last(&self) -> Option<&TrailCell<T>> {
        self.data.last()
    }

    /// Returns the number of cells recorded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no cell is recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of packed blocks.
    pub fn packed_block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the total size in bytes of the packed blocks.
    pub fn packed_bytes(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Returns the block size in cells.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn pack_buffer(&mut self) {
        self.scratch.clear();
        encode(&self.buffer, &mut self.scratch);
        let mut block = self.free_blocks.pop().unwrap_or_default();
        self.packer.pack(&self.scratch, &mut block);
        trace!(
            packer = self.packer.name(),
            raw_bytes = self.scratch.len(),
            packed_bytes = block.len(),
            "packed trail block"
        );
        self.blocks.push(block);
    }

    fn unpack_into_data(&mut self, block: &[u8]) {
        self.scratch.clear();
        self.packer.unpack(block, &mut self.scratch);
        assert_eq!(
            self.scratch.len(),
            self.block_size * CELL_BYTES,
            "unpacked trail block has the wrong size"
        );
        decode(&self.scratch, &mut self.data);
    }

    fn recycle(&mut self, mut block: Vec<u8>) {
        block.clear();
        self.free_blocks.push(block);
    }
}

impl<T: RevValue> fmt::Debug for CompressedTrail<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedTrail")
            .field("len", &self.len)
            .field("block_size", &self.block_size)
            .field("packed_blocks", &self.blocks.len())
            .field("buffer_used", &self.buffer_used)
            .field("packer", &self.packer)
            .finish()
    }
}

fn encode<T: RevValue>(cells: &[TrailCell<T>], out: &mut Vec<u8>) {
    out.reserve(cells.len() * CELL_BYTES);
    for cell in cells {
        out.extend_from_slice(&cell.index.to_le_bytes());
        out.extend_from_slice(&cell.old.to_bits().to_le_bytes());
    }
}

fn decode<T: RevValue>(bytes: &[u8], out: &mut Vec<TrailCell<T>>) {
    for chunk in bytes.chunks_exact(CELL_BYTES) {
        let (index, bits) = chunk.split_at(4);
        let mut index_bytes = [0u8; 4];
        index_bytes.copy_from_slice(index);
        let mut bits_bytes = [0u8; 8];
        bits_bytes.copy_from_slice(bits);
        out.push(TrailCell {
            index: u32::from_le_bytes(index_bytes),
            old: T::from_bits(u64::from_le_bytes(bits_bytes)),
        });
    }
}
