//! Lock-free single-producer/single-consumer ring of framed messages.
//!
//! A ring lives inside one shared [`avfifo_chunk::MemoryChunk`]: a 16-byte
//! control block (magic, capacity, and the two externally visible offsets)
//! followed by the data region. Each side constructs its own half over the
//! same chunk: [`FifoProducer`] with `init = true` formats the control
//! block, [`FifoConsumer`] with `init = false` validates it (or the other
//! way around; exactly one side initializes).
//!
//! Correctness rests on three rules:
//! - Allocated bytes never exceed `capacity - 1`, so empty and full states
//!   stay distinguishable.
//! - Each side advances only its own internal offset and *publishes* it
//!   through the external atomic with a release-store, never past the
//!   oldest still-referenced in-flight region.
//! - Messages never straddle the physical end of the data region; trailing
//!   gaps are filled by a padding message or skipped outright.
//!
//! Nothing blocks. `reserve` and `pop` either complete or report "try again
//! later"; callers wait for an out-of-band [`ActivityObserver`] signal.

pub mod consumer;
pub mod error;
pub mod flags;
pub mod layout;
pub mod notify;
pub mod producer;
mod side;

pub use consumer::FifoConsumer;
pub use error::{Result, RingError};
pub use layout::{CTRL_SIZE, MIN_CAPACITY, RING_MAGIC};
pub use notify::ActivityObserver;
pub use producer::FifoProducer;
