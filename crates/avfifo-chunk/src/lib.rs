//! Shared memory chunks for avfifo.
//!
//! A [`MemoryChunk`] is an opaque, possibly-invalidatable view over a block
//! of memory shared by exactly two parties (a producer and a consumer). The
//! region may live on the heap (in-process pipes, tests) or in a file-backed
//! mapping (cross-process pipes). Validity can flip to false asynchronously
//! when the owner revokes the region, so every access re-checks it.
//!
//! This is the lowest layer of avfifo. Everything else builds on top of
//! the [`MemoryChunk`] type provided here.

pub mod chunk;
pub mod error;
pub mod heap;
pub mod mmap;

pub use chunk::{ChunkBacking, MemoryChunk};
pub use error::{ChunkError, Result};
pub use heap::HeapBacking;
pub use mmap::FileBacking;
