//! passguard-media — Media acquisition for verification requests.
//!
//! Downloads document, selfie and video payloads over HTTP, decodes them
//! into size-capped RGB frames and samples two frames from videos through
//! an ffmpeg-backed decoder.

pub mod error;
pub mod fetch;
pub mod video;

pub use error::{MediaError, MediaKind};
pub use fetch::{decode_image, MediaClient, MediaSettings};
pub use video::{extract_frame_pair, sample_indices, FfmpegDecoder, VideoDecoder, VideoError};
