/// Errors raised while mapping or parsing a message.
///
/// These all denote protocol violations when the chunk originates from the
/// other side of a trust boundary; consuming layers escalate them to a
/// process abort rather than continuing in an undefined state.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The chunk cannot hold even a message header.
    #[error("chunk too small for a message header ({len} bytes, need {min})")]
    HeaderTruncated { len: usize, min: usize },

    /// The header's total size is not a multiple of the header alignment.
    #[error("unaligned total_size {total_size}")]
    UnalignedTotal { total_size: u32 },

    /// The header's total size does not fit in the backing chunk.
    #[error("total_size {total_size} exceeds chunk size {chunk_size}")]
    TotalOverrun { total_size: u32, chunk_size: usize },

    /// The header's content size exceeds what the message could hold.
    #[error("content_size {content_size} exceeds maximum {max}")]
    ContentOverrun { content_size: u32, max: usize },

    /// The message type is outside the closed enumeration.
    #[error("unknown message type {raw}")]
    UnknownType { raw: u32 },

    /// The backing region was revoked mid-access.
    #[error("message backing revoked")]
    BackingRevoked,
}

pub type Result<T> = std::result::Result<T, MessageError>;
