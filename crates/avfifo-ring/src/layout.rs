//! Control block layout at the front of the shared chunk.
//!
//! ```text
//! ┌────────────┬──────────────┬────────────┬────────────┬──────────────┐
//! │ magic (4B) │ capacity (4B)│ rd (4B)    │ wr (4B)    │ data region  │
//! │ "AVFQ"     │              │ atomic     │ atomic     │ (capacity B) │
//! └────────────┴──────────────┴────────────┴────────────┴──────────────┘
//! ```
//!
//! `rd` and `wr` are the external offsets: the only state visible across
//! the thread or process boundary. Everything else in the block is written
//! once at format time.

use std::sync::atomic::{AtomicU32, Ordering};

use avfifo_chunk::MemoryChunk;
use avfifo_message::HEADER_ALIGNMENT;
use tracing::debug;

use crate::error::{Result, RingError};

/// Ring magic: "AVFQ".
pub const RING_MAGIC: u32 = 0x4156_4651;

/// Bytes reserved for the control block before the data region.
pub const CTRL_SIZE: usize = 16;

/// Smallest useful data region.
pub const MIN_CAPACITY: usize = 64;

const MAGIC_OFFSET: usize = 0;
const CAPACITY_OFFSET: usize = 4;
const RD_OFFSET: usize = 8;
const WR_OFFSET: usize = 12;

/// One side's handle on the shared control block.
pub(crate) struct ControlBlock {
    chunk: MemoryChunk,
    capacity: u32,
}

impl ControlBlock {
    /// Format the control block: write magic and capacity, zero the offsets.
    pub(crate) fn format(chunk: MemoryChunk) -> Result<Self> {
        let capacity = Self::derived_capacity(&chunk)?;
        if !chunk.write_u32_at(MAGIC_OFFSET, RING_MAGIC)
            || !chunk.write_u32_at(CAPACITY_OFFSET, capacity)
        {
            return Err(RingError::Revoked);
        }
        let block = Self { chunk, capacity };
        block.rd().store(0, Ordering::Release);
        block.wr().store(0, Ordering::Release);
        debug!(capacity, "ring control block formatted");
        Ok(block)
    }

    /// Bind to an already formatted control block, validating magic and
    /// capacity against the mapped chunk.
    pub(crate) fn bind(chunk: MemoryChunk) -> Result<Self> {
        let derived = Self::derived_capacity(&chunk)?;
        let found = chunk.read_u32_at(MAGIC_OFFSET).ok_or(RingError::Revoked)?;
        if found != RING_MAGIC {
            return Err(RingError::BadMagic {
                found,
                expected: RING_MAGIC,
            });
        }
        let stored = chunk
            .read_u32_at(CAPACITY_OFFSET)
            .ok_or(RingError::Revoked)?;
        if stored != derived {
            return Err(RingError::CapacityMismatch { stored, derived });
        }
        Ok(Self {
            chunk,
            capacity: stored,
        })
    }

    fn derived_capacity(chunk: &MemoryChunk) -> Result<u32> {
        let len = chunk.size();
        if len < CTRL_SIZE + MIN_CAPACITY {
            return Err(RingError::ChunkTooSmall {
                len,
                min: CTRL_SIZE + MIN_CAPACITY,
            });
        }
        // Alignment of the atomic fields is checked here once; the accessors
        // below rely on it.
        if chunk.atomic_u32_at(RD_OFFSET).is_none() || chunk.atomic_u32_at(WR_OFFSET).is_none() {
            return Err(RingError::ChunkTooSmall {
                len,
                min: CTRL_SIZE + MIN_CAPACITY,
            });
        }
        let capacity = (len - CTRL_SIZE) & !(HEADER_ALIGNMENT - 1);
        Ok(capacity as u32)
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    /// External read offset (consumer publishes, producer acquires).
    pub(crate) fn rd(&self) -> &AtomicU32 {
        self.atom(RD_OFFSET)
    }

    /// External write offset (producer publishes, consumer acquires).
    pub(crate) fn wr(&self) -> &AtomicU32 {
        self.atom(WR_OFFSET)
    }

    /// View of the data region following the control block.
    pub(crate) fn data(&self) -> Result<MemoryChunk> {
        Ok(self.chunk.slice(CTRL_SIZE, self.capacity as usize)?)
    }

    fn atom(&self, offset: usize) -> &AtomicU32 {
        match self.chunk.atomic_u32_at(offset) {
            Some(atom) => atom,
            // Alignment and bounds were validated at format/bind time and
            // the chunk cannot shrink.
            None => unreachable!("control block field at {offset} validated at bind"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_bind() {
        let chunk = MemoryChunk::heap(CTRL_SIZE + 128);
        let formatted = ControlBlock::format(chunk.clone()).unwrap();
        assert_eq!(formatted.capacity(), 128);

        let bound = ControlBlock::bind(chunk).unwrap();
        assert_eq!(bound.capacity(), 128);
        assert_eq!(bound.rd().load(Ordering::Acquire), 0);
        assert_eq!(bound.wr().load(Ordering::Acquire), 0);
    }

    #[test]
    fn bind_rejects_unformatted_chunk() {
        let chunk = MemoryChunk::heap(CTRL_SIZE + 128);
        assert!(matches!(
            ControlBlock::bind(chunk),
            Err(RingError::BadMagic { found: 0, .. })
        ));
    }

    #[test]
    fn bind_rejects_capacity_mismatch() {
        let chunk = MemoryChunk::heap(CTRL_SIZE + 128);
        let _ = ControlBlock::format(chunk.clone()).unwrap();
        assert!(chunk.write_u32_at(CAPACITY_OFFSET, 64));
        assert!(matches!(
            ControlBlock::bind(chunk),
            Err(RingError::CapacityMismatch {
                stored: 64,
                derived: 128
            })
        ));
    }

    #[test]
    fn tiny_chunk_rejected() {
        let chunk = MemoryChunk::heap(32);
        assert!(matches!(
            ControlBlock::format(chunk),
            Err(RingError::ChunkTooSmall { .. })
        ));
    }

    #[test]
    fn capacity_rounds_down_to_alignment() {
        let chunk = MemoryChunk::heap(CTRL_SIZE + 70);
        let block = ControlBlock::format(chunk).unwrap();
        assert_eq!(block.capacity(), 68);
    }

    #[test]
    fn offsets_are_shared_between_sides() {
        let chunk = MemoryChunk::heap(CTRL_SIZE + 64);
        let a = ControlBlock::format(chunk.clone()).unwrap();
        let b = ControlBlock::bind(chunk).unwrap();

        a.wr().store(40, Ordering::Release);
        assert_eq!(b.wr().load(Ordering::Acquire), 40);
    }
}
