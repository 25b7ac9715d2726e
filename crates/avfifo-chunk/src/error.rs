use std::path::PathBuf;

/// Errors that can occur when creating or slicing memory chunks.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The requested region is smaller than the caller's minimum.
    #[error("chunk too small ({len} bytes, need at least {min})")]
    TooSmall { len: usize, min: usize },

    /// A sub-view exceeds the bounds of its parent chunk.
    #[error("slice out of bounds (offset {offset} + len {len} > size {size})")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Failed to create or map the backing file.
    #[error("failed to map {path}: {source}")]
    Map {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred while preparing a backing region.
    #[error("chunk I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChunkError>;
