//! Media acquisition errors.

use std::fmt;
use thiserror::Error;

/// What was being acquired when the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    /// A single sampled frame of an already-opened video.
    Frame,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Frame => "frame",
        })
    }
}

#[derive(Error, Debug)]
pub enum MediaError {
    /// Transport failure, timeout or non-success status.
    #[error("{kind} download failed: {cause}")]
    Fetch { kind: MediaKind, cause: String },
    /// Payload could not be decoded or opened.
    #[error("{kind} decode failed: {cause}")]
    Decode { kind: MediaKind, cause: String },
    /// The host cannot run its video tooling. Not the client's fault.
    #[error("video decoder unavailable: {cause}")]
    Decoder { cause: String },
}

impl MediaError {
    pub fn fetch(kind: MediaKind, cause: impl fmt::Display) -> Self {
        Self::Fetch { kind, cause: cause.to_string() }
    }

    pub fn decode(kind: MediaKind, cause: impl fmt::Display) -> Self {
        Self::Decode { kind, cause: cause.to_string() }
    }

    /// True when the failure lies with this service rather than the media.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Decoder { .. })
    }

    /// Short client-facing message. The cause stays in the logs.
    pub fn detail(&self) -> &'static str {
        match self {
            Self::Fetch { kind: MediaKind::Image, .. } => "cannot download image",
            Self::Fetch { .. } => "cannot download video",
            Self::Decode { kind: MediaKind::Image, .. } => "cannot decode image",
            Self::Decode { kind: MediaKind::Video, .. } => "cannot open video",
            Self::Decode { kind: MediaKind::Frame, .. } => "cannot read frames",
            Self::Decoder { .. } => "internal error",
        }
    }
}
