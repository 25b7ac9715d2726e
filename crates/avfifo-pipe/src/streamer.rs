use std::sync::Arc;

use avfifo_message::{
    align_up, MessageType, MessageWriter, PayloadSink, HEADER_ALIGNMENT, HEADER_SIZE,
};
use avfifo_ring::{ActivityObserver, FifoProducer};
use tracing::{debug, error, trace};

use crate::error::{PipeError, Result};
use crate::payload::content_len;
use crate::source::{FrameEvent, FrameSource};

/// Producer side of the pipe: serializes frames from a [`FrameSource`] into
/// the ring.
///
/// Each event becomes an all-or-nothing batch of up to three messages
/// (audio config, video config, frame, in that order). A batch that does
/// not fit right now is held back whole and retried on the next
/// read-activity notification; partial batches are never emitted, so the
/// consumer can rely on configs landing before the frame they describe.
pub struct StreamerProxy<S> {
    fifo: FifoProducer,
    source: S,
    pending: Option<FrameEvent>,
}

impl<S: FrameSource> StreamerProxy<S> {
    pub fn new(fifo: FifoProducer, source: S) -> Self {
        Self {
            fifo,
            source,
            pending: None,
        }
    }

    /// Register the observer fired when frames land in the ring (the
    /// consumer side's wakeup).
    pub fn observe_write_activity(&self, observer: Arc<dyn ActivityObserver>) -> bool {
        self.fifo.observe_write_activity(observer)
    }

    /// A batch is held back waiting for the consumer to free space.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The consumer freed space; retry the held batch and keep pumping.
    pub fn on_read_activity(&mut self) -> Result<()> {
        self.pump()
    }

    /// Pull and serialize events until the source runs dry or the ring
    /// fills. Never blocks.
    pub fn pump(&mut self) -> Result<()> {
        loop {
            let event = match self.pending.take() {
                Some(event) => event,
                None => match self.source.poll_frame() {
                    Some(event) => event,
                    None => return Ok(()),
                },
            };
            if !self.try_emit(event)? {
                return Ok(());
            }
        }
    }

    /// Emit one event as a batch, or park it. `Ok(false)` means parked.
    fn try_emit(&mut self, event: FrameEvent) -> Result<bool> {
        let audio_len = event
            .audio_config
            .as_ref()
            .map(|config| content_len(|sizer| config.marshal(sizer)));
        let video_len = event
            .video_config
            .as_ref()
            .map(|config| content_len(|sizer| config.marshal(sizer)));
        let frame_len = content_len(|sizer| event.frame.marshal(sizer));

        let total = |len: usize| align_up(HEADER_SIZE + len);
        let mut batch = total(frame_len);
        let mut largest = total(frame_len);
        for len in [audio_len, video_len].into_iter().flatten() {
            batch += total(len);
            largest = largest.max(total(len));
        }

        // At most one wraparound gap can appear mid-batch. The gap is
        // strictly smaller than the message that triggers it and both are
        // aligned, so it costs at most `largest - HEADER_ALIGNMENT` bytes.
        let needed = batch + largest - HEADER_ALIGNMENT;
        if largest > self.fifo.max_message_size() || needed > self.fifo.capacity() - 1 {
            return Err(PipeError::FrameTooLarge {
                batch,
                capacity: self.fifo.capacity(),
            });
        }
        if self.fifo.free_space() < needed {
            trace!(batch, free = self.fifo.free_space(), "batch deferred");
            self.pending = Some(event);
            return Ok(false);
        }

        if let (Some(config), Some(len)) = (&event.audio_config, audio_len) {
            self.emit(MessageType::AudioConfig, len, |sink| config.marshal(sink))?;
            debug!(
                sample_rate = config.sample_rate,
                channels = config.channels,
                "audio config sent"
            );
        }
        if let (Some(config), Some(len)) = (&event.video_config, video_len) {
            self.emit(MessageType::VideoConfig, len, |sink| config.marshal(sink))?;
            debug!(width = config.width, height = config.height, "video config sent");
        }
        self.emit(MessageType::Frame, frame_len, |sink| event.frame.marshal(sink))?;
        trace!(
            pts = event.frame.pts_micros,
            bytes = frame_len,
            eos = event.frame.end_of_stream,
            "frame sent"
        );
        Ok(true)
    }

    fn emit(
        &mut self,
        msg_type: MessageType,
        content_len: usize,
        marshal: impl FnOnce(&mut dyn PayloadSink) -> bool,
    ) -> Result<()> {
        // Space was checked for the whole batch and no other reservation is
        // held between messages, so the only way creation fails here is a
        // revoked backing. That tears the batch and must stop the stream.
        match MessageWriter::create(msg_type, &mut self.fifo, content_len) {
            Some(mut writer) => {
                marshal(&mut writer);
                Ok(())
            }
            None => {
                error!(ty = msg_type.name(), "backing revoked mid-batch");
                Err(PipeError::BackingRevoked)
            }
        }
    }
}
