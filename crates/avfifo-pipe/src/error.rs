/// Errors raised on the streaming side of the pipe.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// The serialized batch can never fit the ring, no matter how drained
    /// it is. The caller must grow the ring or shrink its frames.
    #[error("frame batch of {batch} bytes can never fit a {capacity}-byte fifo")]
    FrameTooLarge { batch: usize, capacity: usize },

    /// The shared backing was revoked while a batch was being written.
    /// Whatever part of the batch already landed is unreadable, so the
    /// stream cannot continue over this ring.
    #[error("shared memory revoked mid-batch")]
    BackingRevoked,
}

pub type Result<T> = std::result::Result<T, PipeError>;
