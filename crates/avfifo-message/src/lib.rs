//! Self-describing message framing for avfifo rings.
//!
//! Every message is framed with a fixed 12-byte header:
//! - A 4-byte little-endian total size (multiple of the header alignment)
//! - A 4-byte little-endian message type
//! - A 4-byte little-endian content size
//!
//! `content_size` bytes of payload follow the header, then zero padding up
//! to `total_size`, so a message can be followed immediately by another
//! message of the same alignment.
//!
//! Writing is two-phase: a [`MessageSizer`] runs the marshal routine once to
//! learn the serialized size, then a [`MessageWriter`] over a freshly
//! reserved chunk runs it again for real. Reading is sequential through a
//! [`MessageReader`] mapped over an existing chunk; the header is cached at
//! map time and every later bounds check uses the cached copy, never the
//! live buffer.

pub mod error;
pub mod header;
pub mod reader;
pub mod sink;
pub mod types;
pub mod writer;

pub use error::{MessageError, Result};
pub use header::{align_up, MessageHeader, HEADER_ALIGNMENT, HEADER_SIZE, MIN_MESSAGE_SIZE};
pub use reader::MessageReader;
pub use sink::{MessageSizer, PayloadSink};
pub use types::MessageType;
pub use writer::{Allocator, MessageWriter, ReleaseGuard, Reservation};
