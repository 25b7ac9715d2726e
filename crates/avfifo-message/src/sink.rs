//! The two-phase sizing seam.
//!
//! Marshal routines are written once against [`PayloadSink`] and run twice:
//! first against a [`MessageSizer`] to learn the exact serialized size, then
//! against a real [`crate::MessageWriter`] over a reservation of exactly
//! that size.

/// Sequential byte sink used by payload marshal routines.
///
/// `put` returns false when the sink cannot accept the full slice; callers
/// must treat the message attempt as failed, not append further.
pub trait PayloadSink {
    /// Append raw bytes.
    fn put(&mut self, bytes: &[u8]) -> bool;

    /// Append a single byte.
    fn put_u8(&mut self, value: u8) -> bool {
        self.put(&[value])
    }

    /// Append a little-endian u32.
    fn put_u32(&mut self, value: u32) -> bool {
        self.put(&value.to_le_bytes())
    }

    /// Append a little-endian i64.
    fn put_i64(&mut self, value: i64) -> bool {
        self.put(&value.to_le_bytes())
    }
}

/// Counts bytes without storing them.
///
/// Statically distinct from the writing role: a sizer has no backing memory
/// and never fails, so a marshal routine probing its size cannot touch the
/// ring by accident.
#[derive(Debug, Default)]
pub struct MessageSizer {
    content: usize,
}

impl MessageSizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes the marshal routine produced so far.
    pub fn content_size(&self) -> usize {
        self.content
    }

    /// Allocation footprint of a message carrying this content: header plus
    /// content, rounded to the header alignment.
    pub fn total_size(&self) -> usize {
        crate::header::align_up(crate::header::HEADER_SIZE + self.content)
    }
}

impl PayloadSink for MessageSizer {
    fn put(&mut self, bytes: &[u8]) -> bool {
        self.content += bytes.len();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_SIZE;

    #[test]
    fn counts_without_storing() {
        let mut sizer = MessageSizer::new();
        assert!(sizer.put(b"hello"));
        assert!(sizer.put_u32(7));
        assert!(sizer.put_i64(-1));
        assert_eq!(sizer.content_size(), 5 + 4 + 8);
    }

    #[test]
    fn total_size_is_aligned() {
        let mut sizer = MessageSizer::new();
        assert!(sizer.put(b"abc"));
        assert_eq!(sizer.total_size(), crate::align_up(HEADER_SIZE + 3));
        assert_eq!(sizer.total_size() % 4, 0);
    }

    #[test]
    fn empty_payload_is_a_bare_header() {
        let sizer = MessageSizer::new();
        assert_eq!(sizer.total_size(), HEADER_SIZE);
    }
}
