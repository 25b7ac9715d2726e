use std::sync::atomic::Ordering;
use std::sync::Arc;

use avfifo_chunk::MemoryChunk;
use avfifo_message::{
    align_up, Allocator, MessageHeader, MessageType, Reservation, HEADER_SIZE, MIN_MESSAGE_SIZE,
};
use tracing::trace;

use crate::error::Result;
use crate::layout::ControlBlock;
use crate::notify::ActivityObserver;
use crate::side::{RegionGuard, Role, SideState};

/// The writing half of a ring.
///
/// Exactly one producer exists per ring. `reserve` hands out writable
/// regions; a region becomes visible to the consumer when its reservation
/// guard drops, and never before any earlier still-held reservation.
pub struct FifoProducer {
    state: Arc<SideState>,
}

impl FifoProducer {
    /// Construct the producer half over a shared chunk.
    ///
    /// Exactly one side of a ring passes `init = true` to format the
    /// control block; the other passes `init = false` and validates it.
    pub fn new(chunk: MemoryChunk, init: bool) -> Result<Self> {
        let ctrl = if init {
            ControlBlock::format(chunk)?
        } else {
            ControlBlock::bind(chunk)?
        };
        let state = SideState::new(ctrl, Role::Producer)?;
        let wr = state.external().load(Ordering::Acquire);
        state.internal.store(wr, Ordering::Relaxed);
        Ok(Self {
            state: Arc::new(state),
        })
    }

    /// Data region capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.state.capacity() as usize
    }

    /// Largest message footprint this ring can always eventually accept.
    ///
    /// Bigger reservations may still succeed at favorable offsets, but only
    /// up to this bound is a deferred retry guaranteed to make progress on
    /// a drained ring regardless of where the offsets ended up.
    pub fn max_message_size(&self) -> usize {
        self.capacity() / 2
    }

    /// Bytes currently available for reservation.
    ///
    /// At most `capacity - 1`: one byte stays unused so empty and full
    /// states remain distinguishable.
    pub fn free_space(&self) -> usize {
        let cap = self.state.capacity();
        let rd = self.state.peer_external().load(Ordering::Acquire);
        let wr = self.state.internal.load(Ordering::Relaxed);
        (cap - 1 - ((cap + wr - rd) % cap)) as usize
    }

    /// Register the observer fired when the external write offset advances
    /// (the consumer's wakeup). One registration per producer.
    pub fn observe_write_activity(&self, observer: Arc<dyn ActivityObserver>) -> bool {
        self.state.observe(observer)
    }

    /// Reserve `total_size` bytes for one message.
    ///
    /// `None` means "no room right now" (an expected transient condition,
    /// retried after a read-activity notification) or that the in-flight
    /// arena is full. Wraparound is handled here: a trailing gap too small
    /// for the reservation is consumed by a synthesized padding message, or
    /// skipped outright when it cannot even hold a header (only with no
    /// reservation in flight, so no publication horizon is crossed).
    pub fn reserve(&mut self, total_size: usize) -> Option<Reservation> {
        let cap = self.state.capacity();
        let n = align_up(total_size.max(MIN_MESSAGE_SIZE)) as u32;
        if n >= cap {
            return None;
        }
        if !self.state.flags.has_free_slot() {
            return None;
        }

        let free = self.free_space() as u32;
        if n > free {
            return None;
        }

        let mut wr = self.state.internal.load(Ordering::Relaxed);
        let trailing = cap - wr;
        if trailing < n {
            if trailing + n > free {
                return None;
            }
            if trailing as usize >= MIN_MESSAGE_SIZE {
                let mut header = MessageHeader::new(MessageType::Padding.as_u32(), trailing);
                header.content_size = trailing - HEADER_SIZE as u32;
                let gap = self.state.data.slice(wr as usize, trailing as usize).ok()?;
                if !header.write_to(&gap) {
                    return None;
                }
                trace!(offset = wr, gap = trailing, "padding message before wraparound");
            } else if self.state.flags.any_live() {
                return None;
            } else {
                trace!(offset = wr, gap = trailing, "skipping short trailing gap");
            }
            wr = 0;
            // Release pairs with the acquire load in publish: a guard
            // dropping on another thread either sees the wrapped offset
            // together with the padding header bytes, or does not advance
            // past the padding region at all.
            self.state.internal.store(0, Ordering::Release);
        }

        let chunk = self.state.data.slice(wr as usize, n as usize).ok()?;
        // Cannot fail: a free slot was checked above and this thread is the
        // only acquirer on the producer side.
        let token = self.state.flags.acquire(wr)?;
        self.state
            .internal
            .store((wr + n) % cap, Ordering::Release);
        trace!(offset = wr, size = n, "region reserved");

        Some(Reservation {
            chunk,
            guard: Box::new(RegionGuard::new(Arc::clone(&self.state), token)),
        })
    }
}

impl Allocator for FifoProducer {
    fn reserve(&mut self, total_size: usize) -> Option<Reservation> {
        FifoProducer::reserve(self, total_size)
    }
}

impl std::fmt::Debug for FifoProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoProducer")
            .field("capacity", &self.capacity())
            .field("free_space", &self.free_space())
            .finish()
    }
}
