//! The closed message type enumeration.
//!
//! Both sides of a pipe know this set. A consumer observing any other value
//! treats it as a protocol violation, not as a skippable unknown.

/// Message type discriminants as stored in the wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    /// Synthetic filler inserted before a buffer wraparound. Consumers skip
    /// these transparently.
    Padding = 1,
    /// A coded audio/video frame.
    Frame = 2,
    /// Audio decoder configuration, applied to the next frame.
    AudioConfig = 3,
    /// Video decoder configuration, applied to the next frame.
    VideoConfig = 4,
}

impl MessageType {
    /// Decode a raw header value. `None` means protocol violation.
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Padding),
            2 => Some(Self::Frame),
            3 => Some(Self::AudioConfig),
            4 => Some(Self::VideoConfig),
            _ => None,
        }
    }

    /// Raw header value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Human-readable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Padding => "PADDING",
            Self::Frame => "FRAME",
            Self::AudioConfig => "AUDIO_CONFIG",
            Self::VideoConfig => "VIDEO_CONFIG",
        }
    }
}
