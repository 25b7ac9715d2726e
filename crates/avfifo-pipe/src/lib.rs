//! Typed audio-video pipe over an [`avfifo_ring`] ring.
//!
//! Two halves, one per side of the ring:
//! - [`StreamerProxy`] (producer side) pulls [`FrameEvent`]s from a
//!   [`FrameSource`] and serializes them into the ring, deferring whole
//!   batches when the ring is full.
//! - [`ProviderHost`] (consumer side) drains the ring, caches config
//!   messages, and delivers each frame with the configs that preceded it.
//!
//! Backpressure travels through the ring's activity observers: the host's
//! reads wake the proxy (`on_read_activity`), the proxy's writes wake the
//! host (`on_write_activity`).
//!
//! The two halves trust each other's framing but not each other's payloads;
//! a malformed message on the consumer side is treated as a compromised
//! peer and aborts the process.

pub mod error;
pub mod payload;
pub mod provider;
pub mod source;
pub mod streamer;

pub use error::{PipeError, Result};
pub use payload::{AudioConfig, FrameData, VideoConfig};
pub use provider::{DeliveredFrame, ProviderHost};
pub use source::{FrameEvent, FrameSource, ScriptedSource};
pub use streamer::StreamerProxy;
