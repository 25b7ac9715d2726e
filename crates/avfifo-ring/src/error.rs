use avfifo_chunk::ChunkError;
use avfifo_message::MessageError;

/// Errors raised while binding or operating a ring.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// The shared chunk cannot hold the control block plus a useful ring.
    #[error("chunk too small for a ring ({len} bytes, need at least {min})")]
    ChunkTooSmall { len: usize, min: usize },

    /// The control block does not carry the ring magic. Either the chunk
    /// was never formatted or the two sides disagree about its layout.
    #[error("bad ring magic {found:#010x} (expected {expected:#010x})")]
    BadMagic { found: u32, expected: u32 },

    /// The stored capacity does not match the mapped chunk.
    #[error("ring capacity mismatch (stored {stored}, derived {derived})")]
    CapacityMismatch { stored: u32, derived: u32 },

    /// The next message's header violates the framing invariants. On a
    /// cross-trust-domain ring this is escalated to a process abort by the
    /// consuming layer.
    #[error("corrupt message at offset {offset}: {source}")]
    Corrupt {
        offset: u32,
        #[source]
        source: MessageError,
    },

    /// The shared chunk was revoked.
    #[error("ring backing revoked")]
    Revoked,

    /// Error from the chunk layer.
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

pub type Result<T> = std::result::Result<T, RingError>;
