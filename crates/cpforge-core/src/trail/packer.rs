//! Block packers for the compressed trail.

use std::fmt::Debug;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Strategy used to pack full trail blocks that are no longer mutable.
///
/// `unpack(pack(raw))` must reproduce `raw` byte for byte.
pub trait TrailPacker: Debug {
    /// Packs `raw` into `packed`. `packed` is empty on entry.
    fn pack(&mut self, raw: &[u8], packed: &mut Vec<u8>);

    /// Unpacks `packed` into `raw`. `raw` is empty on entry.
    ///
    /// # Panics
    ///
    /// Panics if `packed` was not produced by this packer.
    fn unpack(&mut self, packed: &[u8], raw: &mut Vec<u8>);

    /// Returns the packer name, used in logs.
    fn name(&self) -> &'static str;
}

/// Stores blocks as plain copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompressionPacker;

impl TrailPacker for NoCompressionPacker {
    fn pack(&mut self, raw: &[u8], packed: &mut Vec<u8>) {
        packed.extend_from_slice(raw);
    }

    fn unpack(&mut self, packed: &[u8], raw: &mut Vec<u8>) {
        raw.extend_from_slice(packed);
    }

    fn name(&self) -> &'static str {
        "NoCompression"
    }
}

/// Compresses blocks with zlib. Trades CPU for memory on deep search trees.
///
/// # Example
///
/// ```
/// use cpforge_core::trail::{TrailPacker, ZlibPacker};
///
/// let mut packer = ZlibPacker::default();
/// let raw = vec![7u8; 4096];
/// let mut packed = Vec::new();
/// packer.pack(&raw, &mut packed);
/// assert!(packed.len() < raw.len());
///
/// let mut restored = Vec::new();
/// packer.unpack(&packed, &mut restored);
/// assert_eq!(restored, raw);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ZlibPacker {
    level: Compression,
}

impl ZlibPacker {
    /// Creates a packer with the given zlib level (0-9).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for ZlibPacker {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl TrailPacker for ZlibPacker {
    fn pack(&mut self, raw: &[u8], packed: &mut Vec<u8>) {
        let mut encoder = ZlibEncoder::new(packed, self.level);
        if let Err(e) = encoder.write_all(raw).and_then(|()| encoder.try_finish()) {
            panic!("zlib packing of a trail block failed: {e}");
        }
    }

    fn unpack(&mut self, packed: &[u8], raw: &mut Vec<u8>) {
        if let Err(e) = ZlibDecoder::new(packed).read_to_end(raw) {
            panic!("corrupt compressed trail block: {e}");
        }
    }

    fn name(&self) -> &'static str {
        "Zlib"
    }
}
