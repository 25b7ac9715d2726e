use avfifo_chunk::MemoryChunk;

use crate::error::{MessageError, Result};

/// Message header: total size (4) + type (4) + content size (4) = 12 bytes.
pub const HEADER_SIZE: usize = 12;

/// Natural alignment of the header fields. Total sizes and allocations are
/// rounded up to this so messages can be laid end to end.
pub const HEADER_ALIGNMENT: usize = 4;

/// Smallest representable message: a bare header.
pub const MIN_MESSAGE_SIZE: usize = HEADER_SIZE;

/// Round `n` up to the header alignment.
pub const fn align_up(n: usize) -> usize {
    (n + HEADER_ALIGNMENT - 1) & !(HEADER_ALIGNMENT - 1)
}

/// The fixed wire header preceding every message payload.
///
/// Wire format (all fields little-endian):
/// ```text
/// ┌──────────────┬──────────────┬──────────────┬────────────────────────┐
/// │ total_size   │ msg_type     │ content_size │ Payload + zero padding │
/// │ (4B LE)      │ (4B LE)      │ (4B LE)      │ (total_size - 12 B)    │
/// └──────────────┴──────────────┴──────────────┴────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Full footprint of the message including this header and padding.
    pub total_size: u32,
    /// Raw message type discriminant.
    pub msg_type: u32,
    /// Bytes of meaningful payload following the header.
    pub content_size: u32,
}

impl MessageHeader {
    /// Header for a fresh message of `total_size` bytes with no content yet.
    pub fn new(msg_type: u32, total_size: u32) -> Self {
        Self {
            total_size,
            msg_type,
            content_size: 0,
        }
    }

    /// Maximum content this message can carry.
    pub fn capacity(&self) -> usize {
        self.total_size as usize - HEADER_SIZE
    }

    /// Encode into the wire layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(&self.total_size.to_le_bytes());
        raw[4..8].copy_from_slice(&self.msg_type.to_le_bytes());
        raw[8..12].copy_from_slice(&self.content_size.to_le_bytes());
        raw
    }

    /// Decode from the wire layout.
    pub fn decode(raw: &[u8; HEADER_SIZE]) -> Self {
        Self {
            total_size: u32::from_le_bytes(raw[0..4].try_into().unwrap()),
            msg_type: u32::from_le_bytes(raw[4..8].try_into().unwrap()),
            content_size: u32::from_le_bytes(raw[8..12].try_into().unwrap()),
        }
    }

    /// Read and decode a header from the front of `chunk`.
    pub fn read_from(chunk: &MemoryChunk) -> Result<Self> {
        let mut raw = [0u8; HEADER_SIZE];
        if chunk.size() < HEADER_SIZE {
            return Err(MessageError::HeaderTruncated {
                len: chunk.size(),
                min: HEADER_SIZE,
            });
        }
        if !chunk.read_at(0, &mut raw) {
            return Err(MessageError::BackingRevoked);
        }
        Ok(Self::decode(&raw))
    }

    /// Write this header to the front of `chunk`.
    pub fn write_to(&self, chunk: &MemoryChunk) -> bool {
        chunk.write_at(0, &self.encode())
    }

    /// Check the size invariants against the chunk the header was read from.
    ///
    /// This is the trust boundary: all later accesses bound themselves by
    /// the values validated here, so a peer overwriting the live buffer
    /// afterwards cannot widen what the reader will touch.
    pub fn validate(&self, chunk_size: usize) -> Result<()> {
        if (self.total_size as usize) < MIN_MESSAGE_SIZE {
            return Err(MessageError::HeaderTruncated {
                len: self.total_size as usize,
                min: MIN_MESSAGE_SIZE,
            });
        }
        if self.total_size as usize % HEADER_ALIGNMENT != 0 {
            return Err(MessageError::UnalignedTotal {
                total_size: self.total_size,
            });
        }
        if self.total_size as usize > chunk_size {
            return Err(MessageError::TotalOverrun {
                total_size: self.total_size,
                chunk_size,
            });
        }
        let max = self.total_size as usize - HEADER_SIZE;
        if self.content_size as usize > max {
            return Err(MessageError::ContentOverrun {
                content_size: self.content_size,
                max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let header = MessageHeader {
            total_size: 64,
            msg_type: 2,
            content_size: 40,
        };
        assert_eq!(MessageHeader::decode(&header.encode()), header);
    }

    #[test]
    fn align_up_rounds_to_four() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 4);
        assert_eq!(align_up(4), 4);
        assert_eq!(align_up(13), 16);
    }

    #[test]
    fn validate_accepts_well_formed() {
        let header = MessageHeader {
            total_size: 24,
            msg_type: 2,
            content_size: 12,
        };
        assert!(header.validate(24).is_ok());
    }

    #[test]
    fn validate_rejects_short_total() {
        let header = MessageHeader {
            total_size: 8,
            msg_type: 1,
            content_size: 0,
        };
        assert!(matches!(
            header.validate(64),
            Err(MessageError::HeaderTruncated { .. })
        ));
    }

    #[test]
    fn validate_rejects_unaligned_total() {
        let header = MessageHeader {
            total_size: 21,
            msg_type: 2,
            content_size: 4,
        };
        assert!(matches!(
            header.validate(64),
            Err(MessageError::UnalignedTotal { .. })
        ));
    }

    #[test]
    fn validate_rejects_total_past_chunk() {
        let header = MessageHeader {
            total_size: 128,
            msg_type: 2,
            content_size: 4,
        };
        assert!(matches!(
            header.validate(64),
            Err(MessageError::TotalOverrun { .. })
        ));
    }

    #[test]
    fn validate_rejects_oversized_content() {
        let header = MessageHeader {
            total_size: 16,
            msg_type: 2,
            content_size: 5,
        };
        assert!(matches!(
            header.validate(16),
            Err(MessageError::ContentOverrun { .. })
        ));
    }

    #[test]
    fn chunk_roundtrip() {
        let chunk = avfifo_chunk::MemoryChunk::heap(32);
        let header = MessageHeader {
            total_size: 32,
            msg_type: 3,
            content_size: 20,
        };
        assert!(header.write_to(&chunk));
        assert_eq!(MessageHeader::read_from(&chunk).unwrap(), header);
    }
}
