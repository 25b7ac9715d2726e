//! Lock-free single-producer/single-consumer fifo for framed media
//! messages over shared memory.
//!
//! # Crate Structure
//!
//! - [`chunk`] — Shared memory regions (heap and file-backed) with
//!   revocable access
//! - [`message`] — Message framing: sized writes, validated zero-copy reads
//! - [`ring`] — The circular buffer engine: reserve, pop, padding, flush
//! - [`pipe`] — Typed audio-video pipe with backpressure notifications

/// Re-export chunk types.
pub mod chunk {
    pub use avfifo_chunk::*;
}

/// Re-export message framing types.
pub mod message {
    pub use avfifo_message::*;
}

/// Re-export ring types.
pub mod ring {
    pub use avfifo_ring::*;
}

/// Re-export pipe types.
pub mod pipe {
    pub use avfifo_pipe::*;
}
