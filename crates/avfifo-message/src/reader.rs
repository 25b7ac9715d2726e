use avfifo_chunk::MemoryChunk;

use crate::error::{MessageError, Result};
use crate::header::{MessageHeader, HEADER_SIZE};
use crate::types::MessageType;
use crate::writer::ReleaseGuard;

/// Sequential reader over a message mapped in place.
///
/// The header is read and validated once at map time and cached; every
/// subsequent bounds check uses the cached copy, so a peer overwriting the
/// live buffer after mapping cannot widen the readable range. On a read
/// shorter than requested the cursor clamps to the content size and the
/// message should be treated as malformed for that field.
pub struct MessageReader {
    chunk: MemoryChunk,
    header: MessageHeader,
    cursor: usize,
    guard: Option<Box<dyn ReleaseGuard>>,
}

impl MessageReader {
    /// Interpret an existing chunk as a message.
    ///
    /// Errors are protocol violations: the chunk is too small for a header,
    /// or the header's sizes do not fit the chunk. When the chunk crosses a
    /// trust boundary the caller escalates these to a process abort.
    pub fn map(chunk: MemoryChunk) -> Result<MessageReader> {
        Self::map_with_guard(chunk, None)
    }

    /// Map with a release guard protecting the region (ring pop path).
    pub fn map_with_guard(
        chunk: MemoryChunk,
        guard: Option<Box<dyn ReleaseGuard>>,
    ) -> Result<MessageReader> {
        let header = MessageHeader::read_from(&chunk)?;
        header.validate(chunk.size())?;
        Ok(MessageReader {
            chunk,
            header,
            cursor: 0,
            guard,
        })
    }

    /// Raw type discriminant from the cached header.
    pub fn msg_type_raw(&self) -> u32 {
        self.header.msg_type
    }

    /// Decoded message type; `Err` is a protocol violation.
    pub fn msg_type(&self) -> Result<MessageType> {
        MessageType::from_u32(self.header.msg_type).ok_or(MessageError::UnknownType {
            raw: self.header.msg_type,
        })
    }

    /// Total footprint of the message, header included.
    pub fn total_size(&self) -> usize {
        self.header.total_size as usize
    }

    /// Payload bytes this message carries.
    pub fn content_size(&self) -> usize {
        self.header.content_size as usize
    }

    /// Payload bytes not yet consumed by the cursor.
    pub fn remaining(&self) -> usize {
        self.content_size() - self.cursor
    }

    /// True only while the backing chunk is valid and the protecting flag
    /// has not been revoked. Callers must re-check before any zero-copy
    /// access; a consumer-side flush revokes outstanding readers.
    pub fn is_backing_available(&self) -> bool {
        self.chunk.valid() && self.guard.as_ref().map_or(true, |g| g.is_live())
    }

    /// Copy the next `out.len()` bytes of payload into `out`.
    ///
    /// Returns false if fewer bytes remain (the cursor clamps to the end)
    /// or the backing is gone; `out` must not be trusted in that case.
    pub fn read(&mut self, out: &mut [u8]) -> bool {
        if out.len() > self.remaining() {
            self.cursor = self.content_size();
            return false;
        }
        if !self.is_backing_available()
            || !self.chunk.read_at(HEADER_SIZE + self.cursor, out)
        {
            self.cursor = self.content_size();
            return false;
        }
        self.cursor += out.len();
        true
    }

    /// Borrow the next `len` payload bytes without copying or advancing.
    ///
    /// `None` on underflow (cursor clamps, mirroring [`MessageReader::read`])
    /// or when the backing is gone.
    pub fn peek(&mut self, len: usize) -> Option<&[u8]> {
        if len > self.remaining() || !self.is_backing_available() {
            self.cursor = self.content_size();
            return None;
        }
        // SAFETY: within the validated content range, and the in-flight flag
        // held by `guard` keeps the region from being recycled while this
        // borrow (tied to `&self`) is alive.
        Some(unsafe { self.chunk.bytes_unchecked(HEADER_SIZE + self.cursor, len) })
    }

    /// Advance the cursor by `len` bytes. False on underflow (cursor clamps).
    pub fn skip(&mut self, len: usize) -> bool {
        if len > self.remaining() {
            self.cursor = self.content_size();
            return false;
        }
        self.cursor += len;
        true
    }

    /// Read a single byte.
    pub fn get_u8(&mut self) -> Option<u8> {
        let mut raw = [0u8; 1];
        self.read(&mut raw).then(|| raw[0])
    }

    /// Read a little-endian u32.
    pub fn get_u32(&mut self) -> Option<u32> {
        let mut raw = [0u8; 4];
        self.read(&mut raw).then(|| u32::from_le_bytes(raw))
    }

    /// Read a little-endian i64.
    pub fn get_i64(&mut self) -> Option<i64> {
        let mut raw = [0u8; 8];
        self.read(&mut raw).then(|| i64::from_le_bytes(raw))
    }
}

impl std::fmt::Debug for MessageReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageReader")
            .field("header", &self.header)
            .field("cursor", &self.cursor)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
