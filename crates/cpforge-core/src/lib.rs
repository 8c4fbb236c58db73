//! cpforge core - reversible memory for backtracking search
//!
//! This crate provides the leaf layer of the cpforge runtime:
//! - Error types for recoverable API errors
//! - The trail: typed undo logs with block compression
//! - The reversible value store addressed by [`Rev`] handles
//! - Scope-owned arenas whose contents are released on backtrack

pub mod error;
pub mod trail;

pub use error::{CpForgeError, Result};
pub use trail::{
    ArenaId, CompressedTrail, NoCompressionPacker, Rev, RevAlloc, RevColumn, RevStore, RevValue,
    ScopedArena, Trail, TrailCell, TrailMark, TrailPacker, ZlibPacker,
};
