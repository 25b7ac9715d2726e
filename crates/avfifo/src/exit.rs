use std::fmt;
use std::io;

use avfifo_chunk::ChunkError;
use avfifo_pipe::PipeError;
use avfifo_ring::RingError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
#[allow(dead_code)]
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn chunk_error(context: &str, err: ChunkError) -> CliError {
    match err {
        ChunkError::Io(source) => io_error(context, source),
        ChunkError::Map { source, .. } => io_error(context, source),
        ChunkError::TooSmall { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn ring_error(context: &str, err: RingError) -> CliError {
    match err {
        RingError::Chunk(source) => chunk_error(context, source),
        RingError::ChunkTooSmall { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        RingError::BadMagic { .. }
        | RingError::CapacityMismatch { .. }
        | RingError::Corrupt { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn pipe_error(context: &str, err: PipeError) -> CliError {
    match err {
        PipeError::FrameTooLarge { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        PipeError::BackingRevoked => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
