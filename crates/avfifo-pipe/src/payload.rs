//! Marshallable payload types.
//!
//! Each type writes itself through the [`PayloadSink`] seam, so the same
//! `marshal` both sizes a message (against a [`MessageSizer`]) and fills it
//! (against a `MessageWriter`). Fixed-width fields go first, variable-length
//! tails last and implicitly sized by the message's content length.

use avfifo_message::{MessageReader, MessageSizer, PayloadSink};
use bytes::{Bytes, BytesMut};

/// One demuxed media frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    /// Presentation timestamp in microseconds.
    pub pts_micros: i64,
    pub key_frame: bool,
    pub end_of_stream: bool,
    /// Elementary stream bytes. Empty for an end-of-stream marker.
    pub data: Bytes,
}

const FRAME_KEY: u8 = 1 << 0;
const FRAME_EOS: u8 = 1 << 1;

impl FrameData {
    /// End-of-stream marker frame.
    pub fn end_of_stream() -> Self {
        Self {
            pts_micros: 0,
            key_frame: false,
            end_of_stream: true,
            data: Bytes::new(),
        }
    }

    pub fn marshal(&self, sink: &mut dyn PayloadSink) -> bool {
        let mut flags = 0u8;
        if self.key_frame {
            flags |= FRAME_KEY;
        }
        if self.end_of_stream {
            flags |= FRAME_EOS;
        }
        sink.put_i64(self.pts_micros) && sink.put_u8(flags) && sink.put(&self.data)
    }

    pub fn unmarshal(reader: &mut MessageReader) -> Option<Self> {
        let pts_micros = reader.get_i64()?;
        let flags = reader.get_u8()?;
        let data = read_tail(reader)?;
        Some(Self {
            pts_micros,
            key_frame: flags & FRAME_KEY != 0,
            end_of_stream: flags & FRAME_EOS != 0,
            data,
        })
    }
}

/// Audio decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    pub codec: u32,
    pub sample_rate: u32,
    pub channels: u32,
    /// Codec-specific initialization bytes.
    pub extra_data: Bytes,
}

impl AudioConfig {
    pub fn marshal(&self, sink: &mut dyn PayloadSink) -> bool {
        sink.put_u32(self.codec)
            && sink.put_u32(self.sample_rate)
            && sink.put_u32(self.channels)
            && sink.put(&self.extra_data)
    }

    pub fn unmarshal(reader: &mut MessageReader) -> Option<Self> {
        Some(Self {
            codec: reader.get_u32()?,
            sample_rate: reader.get_u32()?,
            channels: reader.get_u32()?,
            extra_data: read_tail(reader)?,
        })
    }
}

/// Video decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConfig {
    pub codec: u32,
    pub width: u32,
    pub height: u32,
    /// Codec-specific initialization bytes.
    pub extra_data: Bytes,
}

impl VideoConfig {
    pub fn marshal(&self, sink: &mut dyn PayloadSink) -> bool {
        sink.put_u32(self.codec)
            && sink.put_u32(self.width)
            && sink.put_u32(self.height)
            && sink.put(&self.extra_data)
    }

    pub fn unmarshal(reader: &mut MessageReader) -> Option<Self> {
        Some(Self {
            codec: reader.get_u32()?,
            width: reader.get_u32()?,
            height: reader.get_u32()?,
            extra_data: read_tail(reader)?,
        })
    }
}

/// Content bytes a payload needs, measured by a dry-run marshal.
pub(crate) fn content_len(marshal: impl FnOnce(&mut MessageSizer) -> bool) -> usize {
    let mut sizer = MessageSizer::new();
    marshal(&mut sizer);
    sizer.content_size()
}

fn read_tail(reader: &mut MessageReader) -> Option<Bytes> {
    let len = reader.remaining();
    let mut buf = BytesMut::zeroed(len);
    if !reader.read(&mut buf) {
        return None;
    }
    Some(buf.freeze())
}
