use avfifo_chunk::MemoryChunk;
use tracing::trace;

use crate::header::{align_up, MessageHeader, HEADER_SIZE};
use crate::sink::PayloadSink;
use crate::types::MessageType;

/// Opaque token protecting a reserved ring region.
///
/// Dropping the guard releases the region's in-flight flag, which lets the
/// ring publish the corresponding external offset. `is_live` turns false if
/// the flag was forcibly revoked (consumer-side flush).
pub trait ReleaseGuard: Send {
    fn is_live(&self) -> bool {
        true
    }
}

/// A reserved, writable region handed out by an [`Allocator`].
pub struct Reservation {
    /// Writable view sized to exactly the reserved footprint.
    pub chunk: MemoryChunk,
    /// Release guard; dropped once the message is fully written.
    pub guard: Box<dyn ReleaseGuard>,
}

/// Allocator capability supplied by the ring bound to a producer.
///
/// `reserve` never blocks: `None` means the ring has no room right now and
/// the caller should retry after a read-activity notification.
pub trait Allocator {
    fn reserve(&mut self, total_size: usize) -> Option<Reservation>;
}

/// Sequential writer over a freshly reserved message region.
///
/// The header is written up front with `content_size = 0`; the final content
/// size lands in the buffer when the writer is dropped, before the release
/// guard publishes the region. Overflowing writes clamp and fail; an
/// overflowed message is wholly invalid and must be discarded by the caller.
pub struct MessageWriter {
    chunk: MemoryChunk,
    header: MessageHeader,
    cursor: usize,
    overflowed: bool,
    _guard: Box<dyn ReleaseGuard>,
}

impl MessageWriter {
    /// Reserve space for a message of up to `content_capacity` payload bytes
    /// and initialize its header.
    ///
    /// Returns `None` when the allocator has no room; that is an expected
    /// transient condition, not an error.
    pub fn create(
        msg_type: MessageType,
        allocator: &mut dyn Allocator,
        content_capacity: usize,
    ) -> Option<MessageWriter> {
        let total = align_up(HEADER_SIZE + content_capacity);
        let reservation = allocator.reserve(total)?;
        debug_assert_eq!(reservation.chunk.size(), total);

        let header = MessageHeader::new(msg_type.as_u32(), total as u32);
        if !header.write_to(&reservation.chunk) {
            // Backing revoked between reservation and first write; the guard
            // still releases the region on drop.
            return None;
        }
        trace!(ty = msg_type.name(), total, "message reserved");

        Some(MessageWriter {
            chunk: reservation.chunk,
            header,
            cursor: 0,
            overflowed: false,
            _guard: reservation.guard,
        })
    }

    /// Bytes of payload written so far.
    pub fn content_size(&self) -> usize {
        self.cursor
    }

    /// Maximum payload this message can hold. May exceed the capacity hint
    /// passed to [`MessageWriter::create`] by up to the alignment slack.
    pub fn capacity(&self) -> usize {
        self.header.capacity()
    }

    /// Whether a previous write failed to fit.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// True while the backing chunk is still accessible.
    pub fn is_backing_available(&self) -> bool {
        self.chunk.valid()
    }

    /// Append payload bytes.
    ///
    /// On overflow, writes the prefix that fits, clamps the content size at
    /// the maximum, and returns false. Nothing is ever written past the
    /// reserved chunk.
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        let avail = self.capacity() - self.cursor;
        let fit = avail.min(bytes.len());
        if fit > 0 && !self.chunk.write_at(HEADER_SIZE + self.cursor, &bytes[..fit]) {
            self.overflowed = true;
            return false;
        }
        self.cursor += fit;
        if fit < bytes.len() {
            self.overflowed = true;
            return false;
        }
        true
    }
}

impl PayloadSink for MessageWriter {
    fn put(&mut self, bytes: &[u8]) -> bool {
        self.write(bytes)
    }
}

impl Drop for MessageWriter {
    fn drop(&mut self) {
        self.header.content_size = self.cursor as u32;
        // A revoked backing makes this a no-op; the guard release still runs.
        self.header.write_to(&self.chunk);
    }
}
