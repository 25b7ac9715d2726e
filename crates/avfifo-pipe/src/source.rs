use crate::payload::{AudioConfig, FrameData, VideoConfig};

/// One frame pulled from a source, with any config changes that take effect
/// at this frame. Configs are serialized ahead of the frame so the consumer
/// sees them first.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub frame: FrameData,
    pub audio_config: Option<AudioConfig>,
    pub video_config: Option<VideoConfig>,
}

impl FrameEvent {
    pub fn frame(frame: FrameData) -> Self {
        Self {
            frame,
            audio_config: None,
            video_config: None,
        }
    }
}

/// Where the streamer pulls frames from: a demuxer, a test script, a
/// synthetic generator.
///
/// `poll_frame` must not block. `None` means no frame right now; the
/// streamer simply pumps again later. Sources signal the true end of the
/// stream with a frame whose `end_of_stream` flag is set.
pub trait FrameSource {
    fn poll_frame(&mut self) -> Option<FrameEvent>;
}

/// A scripted source for tests and demos: yields a fixed sequence.
pub struct ScriptedSource {
    events: std::collections::VecDeque<FrameEvent>,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = FrameEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl FrameSource for ScriptedSource {
    fn poll_frame(&mut self) -> Option<FrameEvent> {
        self.events.pop_front()
    }
}
