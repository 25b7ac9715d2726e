use std::sync::atomic::Ordering;
use std::sync::Arc;

use avfifo_chunk::MemoryChunk;
use avfifo_message::{MessageHeader, MessageReader, MIN_MESSAGE_SIZE};
use tracing::{debug, trace};

use crate::error::{Result, RingError};
use crate::layout::ControlBlock;
use crate::notify::ActivityObserver;
use crate::side::{RegionGuard, Role, SideState};

/// The reading half of a ring.
///
/// Exactly one consumer exists per ring. `pop` maps messages in place
/// without copying, and the mapped region is not reclaimed until the
/// returned reader drops. `flush` is the only cancellation primitive.
pub struct FifoConsumer {
    state: Arc<SideState>,
}

impl FifoConsumer {
    /// Construct the consumer half over a shared chunk.
    ///
    /// Exactly one side of a ring passes `init = true` to format the
    /// control block; the other passes `init = false` and validates it.
    pub fn new(chunk: MemoryChunk, init: bool) -> Result<Self> {
        let ctrl = if init {
            ControlBlock::format(chunk)?
        } else {
            ControlBlock::bind(chunk)?
        };
        let state = SideState::new(ctrl, Role::Consumer)?;
        let rd = state.external().load(Ordering::Acquire);
        state.internal.store(rd, Ordering::Relaxed);
        Ok(Self {
            state: Arc::new(state),
        })
    }

    /// Data region capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.state.capacity() as usize
    }

    /// Bytes currently published and not yet consumed by this side.
    pub fn allocated_bytes(&self) -> usize {
        let cap = self.state.capacity();
        let wr = self.state.peer_external().load(Ordering::Acquire);
        let rd = self.state.internal.load(Ordering::Relaxed);
        ((cap + wr - rd) % cap) as usize
    }

    /// Register the observer fired when the external read offset advances
    /// (the producer's wakeup). One registration per consumer.
    pub fn observe_read_activity(&self, observer: Arc<dyn ActivityObserver>) -> bool {
        self.state.observe(observer)
    }

    /// Map the next message in place.
    ///
    /// `Ok(None)` when less than one minimum-sized message is published or
    /// the in-flight arena is full. `Err` when the next header violates the
    /// framing invariants; on a cross-trust-domain ring the caller
    /// escalates that to a process abort.
    ///
    /// Padding messages are returned like any other; layers above discard
    /// them. Short trailing gaps (smaller than a header) are skipped here,
    /// mirroring the producer's wraparound rule.
    pub fn pop(&mut self) -> Result<Option<MessageReader>> {
        let cap = self.state.capacity();
        loop {
            let wr = self.state.peer_external().load(Ordering::Acquire);
            let rd = self.state.internal.load(Ordering::Relaxed);
            let avail = (cap + wr - rd) % cap;
            if (avail as usize) < MIN_MESSAGE_SIZE {
                return Ok(None);
            }

            let trailing = cap - rd;
            if (trailing as usize) < MIN_MESSAGE_SIZE {
                // Data continues past the physical end; the producer never
                // frames a message in a gap this small.
                trace!(offset = rd, gap = trailing, "skipping short trailing gap");
                self.state.internal.store(0, Ordering::Relaxed);
                continue;
            }

            let head_view = self.state.data.slice(rd as usize, MIN_MESSAGE_SIZE)?;
            let header = MessageHeader::read_from(&head_view)
                .map_err(|source| RingError::Corrupt { offset: rd, source })?;

            // Bound the declared sizes by what is physically present:
            // published bytes, and the span before the buffer end.
            let window = avail.min(trailing) as usize;
            header
                .validate(window)
                .map_err(|source| RingError::Corrupt { offset: rd, source })?;

            if !self.state.flags.has_free_slot() {
                debug!("in-flight arena full; pop deferred");
                return Ok(None);
            }

            let total = header.total_size;
            let chunk = self.state.data.slice(rd as usize, total as usize)?;
            // Cannot fail: a free slot was checked above and this thread is
            // the only acquirer on the consumer side.
            let token = match self.state.flags.acquire(rd) {
                Some(token) => token,
                None => return Ok(None),
            };
            self.state
                .internal
                .store((rd + total) % cap, Ordering::Relaxed);
            trace!(offset = rd, size = total, ty = header.msg_type, "message popped");

            let guard = RegionGuard::new(Arc::clone(&self.state), token);
            let reader = MessageReader::map_with_guard(chunk, Some(Box::new(guard)))
                .map_err(|source| RingError::Corrupt { offset: rd, source })?;
            return Ok(Some(reader));
        }
    }

    /// Drop all unread content.
    ///
    /// Revokes every outstanding read flag, so live zero-copy readers
    /// observe `is_backing_available() == false`, then jumps both read
    /// offsets to the current external write offset. A no-op on an empty
    /// ring. The producer is unaffected and may keep reserving.
    pub fn flush(&mut self) {
        self.state.flags.revoke_all();
        let wr = self.state.peer_external().load(Ordering::Acquire);
        let rd = self.state.internal.load(Ordering::Relaxed);
        self.state.internal.store(wr, Ordering::Relaxed);
        if rd != wr {
            debug!(dropped = (self.state.capacity() + wr - rd) % self.state.capacity(), "fifo flushed");
        }
        self.state.publish();
    }
}

impl std::fmt::Debug for FifoConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoConsumer")
            .field("capacity", &self.capacity())
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}
