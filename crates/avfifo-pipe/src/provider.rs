use std::sync::Arc;

use avfifo_message::{MessageReader, MessageType};
use avfifo_ring::{ActivityObserver, FifoConsumer};
use tracing::{debug, error, trace};

use crate::payload::{AudioConfig, FrameData, VideoConfig};

/// A frame handed to the host's read callback, together with any configs
/// that arrived since the last delivered frame.
#[derive(Debug, Clone)]
pub struct DeliveredFrame {
    pub frame: FrameData,
    pub audio_config: Option<AudioConfig>,
    pub video_config: Option<VideoConfig>,
}

type ReadCallback = Box<dyn FnOnce(DeliveredFrame) + Send>;
type FlushCallback = Box<dyn FnOnce() + Send>;

/// Consumer side of the pipe: drains the ring and delivers frames.
///
/// At most one `read` may be outstanding; issuing a second before the first
/// completes is a caller bug and panics. Config messages are not delivered
/// on their own but cached and attached to the next frame.
///
/// The producer side is untrusted here. A message that fails framing
/// validation or carries an unknown type aborts the process rather than
/// resynchronizing on a possibly hostile stream.
pub struct ProviderHost {
    fifo: FifoConsumer,
    pending_read: Option<ReadCallback>,
    cached_audio: Option<AudioConfig>,
    cached_video: Option<VideoConfig>,
    flushing: bool,
    flush_waiters: Vec<FlushCallback>,
}

impl ProviderHost {
    pub fn new(fifo: FifoConsumer) -> Self {
        Self {
            fifo,
            pending_read: None,
            cached_audio: None,
            cached_video: None,
            flushing: false,
            flush_waiters: Vec::new(),
        }
    }

    /// Register the observer fired when consumed space is reclaimed (the
    /// producer side's wakeup).
    pub fn observe_read_activity(&self, observer: Arc<dyn ActivityObserver>) -> bool {
        self.fifo.observe_read_activity(observer)
    }

    /// A read was requested and no frame has arrived yet.
    pub fn has_pending_read(&self) -> bool {
        self.pending_read.is_some()
    }

    /// Request the next frame. The callback fires from whichever call
    /// surfaces the frame: this one, a later `on_write_activity`, or a
    /// later `read`.
    ///
    /// # Panics
    ///
    /// If a read is already outstanding.
    pub fn read(&mut self, callback: impl FnOnce(DeliveredFrame) + Send + 'static) {
        assert!(
            self.pending_read.is_none(),
            "read issued while a previous read is still pending"
        );
        self.pending_read = Some(Box::new(callback));
        self.drain();
    }

    /// The producer published new messages; try to satisfy a pending read.
    pub fn on_write_activity(&mut self) {
        self.drain();
    }

    /// Discard everything in flight and buffered.
    ///
    /// Exactly one fifo flush runs per completion: requests arriving while
    /// a flush is in progress ride on it, and every completion callback
    /// fires before this returns to the outermost caller. Cached configs
    /// are dropped; a pending read stays pending across the flush.
    pub fn stop_and_flush(&mut self, done: impl FnOnce() + Send + 'static) {
        self.flush_waiters.push(Box::new(done));
        if self.flushing {
            return;
        }
        self.flushing = true;
        self.fifo.flush();
        self.cached_audio = None;
        self.cached_video = None;
        debug!("pipe flushed");
        // Completion callbacks may request another stop; those ride on this
        // completion instead of starting a second flush.
        while !self.flush_waiters.is_empty() {
            for waiter in std::mem::take(&mut self.flush_waiters) {
                waiter();
            }
        }
        self.flushing = false;
    }

    fn drain(&mut self) {
        while self.pending_read.is_some() {
            match self.fifo.pop() {
                Ok(Some(reader)) => self.dispatch(reader),
                Ok(None) => return,
                Err(err) => {
                    error!(error = %err, "protocol violation on media fifo");
                    panic!("protocol violation on media fifo: {err}");
                }
            }
        }
    }

    fn dispatch(&mut self, mut reader: MessageReader) {
        let msg_type = match reader.msg_type() {
            Ok(msg_type) => msg_type,
            Err(err) => {
                error!(error = %err, "protocol violation on media fifo");
                panic!("protocol violation on media fifo: {err}");
            }
        };
        match msg_type {
            MessageType::Padding => {}
            MessageType::AudioConfig => {
                let config = Self::unmarshal(AudioConfig::unmarshal(&mut reader), msg_type);
                debug!(
                    sample_rate = config.sample_rate,
                    channels = config.channels,
                    "audio config received"
                );
                self.cached_audio = Some(config);
            }
            MessageType::VideoConfig => {
                let config = Self::unmarshal(VideoConfig::unmarshal(&mut reader), msg_type);
                debug!(width = config.width, height = config.height, "video config received");
                self.cached_video = Some(config);
            }
            MessageType::Frame => {
                let frame = Self::unmarshal(FrameData::unmarshal(&mut reader), msg_type);
                trace!(pts = frame.pts_micros, eos = frame.end_of_stream, "frame received");
                let delivered = DeliveredFrame {
                    frame,
                    audio_config: self.cached_audio.take(),
                    video_config: self.cached_video.take(),
                };
                if let Some(callback) = self.pending_read.take() {
                    callback(delivered);
                }
            }
        }
    }

    fn unmarshal<T>(result: Option<T>, msg_type: MessageType) -> T {
        match result {
            Some(value) => value,
            None => {
                error!(msg_type = msg_type.name(), "truncated payload on media fifo");
                panic!("truncated {} payload on media fifo", msg_type.name());
            }
        }
    }
}
