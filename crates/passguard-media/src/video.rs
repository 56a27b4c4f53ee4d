//! Video frame sampling.
//!
//! The payload is written to a scoped temporary file, its frame count is
//! read from stream metadata, and two frames are read: one early in the clip and one in the
//! middle. The temporary file is removed when the guard drops, on every
//! exit path.

use crate::error::{MediaError, MediaKind};
use image::{DynamicImage, ImageFormat};
use passguard_core::frame::{self, FramePair};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Frame count assumed when the container does not report one.
const FALLBACK_FRAME_COUNT: u64 = 2;

const TEMP_PREFIX: &str = "passguard-video-";

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed { tool: String, status: String, stderr: String },
    #[error("no video stream")]
    NoVideoStream,
    #[error("frame {0} not available")]
    FrameUnavailable(u64),
    #[error("frame decode: {0}")]
    Image(#[from] image::ImageError),
}

/// Decodes frames from a video file on disk.
pub trait VideoDecoder: Send + Sync {
    /// Frame count from container metadata; `None` when unknown.
    /// An error means the file could not be opened as a video.
    fn frame_count(&self, path: &Path) -> Result<Option<u64>, VideoError>;

    /// Read the frame at a zero-based index.
    fn read_frame(&self, path: &Path, index: u64) -> Result<DynamicImage, VideoError>;
}

/// Frame indices to sample: `max(1, total/10)` and `total/2`.
/// A total of zero is treated as two frames.
pub fn sample_indices(total: u64) -> (u64, u64) {
    let total = if total == 0 { FALLBACK_FRAME_COUNT } else { total };
    ((total / 10).max(1), total / 2)
}

/// `ffprobe` / `ffmpeg` driven through the command line.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffprobe", "ffmpeg")
    }
}

impl FfmpegDecoder {
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self { ffprobe: ffprobe.into(), ffmpeg: ffmpeg.into() }
    }

    fn run(mut command: Command) -> Result<Vec<u8>, VideoError> {
        let tool = command.get_program().to_string_lossy().into_owned();
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|source| VideoError::Spawn { tool: tool.clone(), source })?;

        if !output.status.success() {
            return Err(VideoError::ToolFailed {
                tool,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// `num/den` frame rate as printed by ffprobe. `0/0` means unknown.
fn parse_rate(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/')?;
    let (num, den) = (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?);
    (num > 0.0 && den > 0.0).then(|| num / den)
}

/// Frame count from ffprobe `key=value` stream and format metadata.
///
/// `nb_frames` wins when the container records it. Otherwise the count is
/// estimated as frame rate times duration, preferring the stream duration
/// over the container one. WebM and fragmented MP4 usually land here.
/// No stream keys at all means the file has no video stream.
fn parse_frame_count(stdout: &str) -> Result<Option<u64>, VideoError> {
    let mut has_stream = false;
    let mut nb_frames = None;
    let mut rate = None;
    let mut duration = None;

    for (key, value) in stdout.lines().filter_map(|l| l.trim().split_once('=')) {
        match key {
            "nb_frames" => {
                has_stream = true;
                nb_frames = value.parse::<u64>().ok().filter(|n| *n > 0);
            }
            "r_frame_rate" => {
                has_stream = true;
                rate = parse_rate(value);
            }
            "duration" if duration.is_none() => {
                duration = value.parse::<f64>().ok().filter(|d| d.is_finite() && *d > 0.0);
            }
            _ => {}
        }
    }

    if !has_stream {
        return Err(VideoError::NoVideoStream);
    }
    if nb_frames.is_some() {
        return Ok(nb_frames);
    }
    let estimate = rate.zip(duration).map(|(fps, secs)| (fps * secs).round() as u64);
    Ok(estimate.filter(|n| *n > 0))
}

/// Map a decoder failure to a media error. A tool that cannot be started
/// is a host problem, everything else blames the payload.
fn media_error(kind: MediaKind, err: VideoError) -> MediaError {
    match err {
        VideoError::Spawn { .. } => MediaError::Decoder { cause: err.to_string() },
        other => MediaError::decode(kind, other),
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn frame_count(&self, path: &Path) -> Result<Option<u64>, VideoError> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=nb_frames,r_frame_rate,duration:format=duration"])
            .args(["-of", "default=noprint_wrappers=1"])
            .arg(path);
        let stdout = Self::run(command)?;
        parse_frame_count(&String::from_utf8_lossy(&stdout))
    }

    fn read_frame(&self, path: &Path, index: u64) -> Result<DynamicImage, VideoError> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-v", "error", "-i"])
            .arg(path)
            .arg("-vf")
            .arg(format!("select=eq(n\\,{index})"))
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"]);
        let stdout = Self::run(command)?;
        if stdout.is_empty() {
            return Err(VideoError::FrameUnavailable(index));
        }
        Ok(image::load_from_memory_with_format(&stdout, ImageFormat::Png)?)
    }
}

/// Sample the frame pair from an encoded video payload. Blocking.
pub fn extract_frame_pair(
    bytes: &[u8],
    decoder: &dyn VideoDecoder,
    max_dim: u32,
) -> Result<FramePair, MediaError> {
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".mp4")
        .tempfile()
        .map_err(|e| MediaError::decode(MediaKind::Video, e))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| MediaError::decode(MediaKind::Video, e))?;
    let path = file.path();

    let total = decoder
        .frame_count(path)
        .map_err(|e| media_error(MediaKind::Video, e))?
        .unwrap_or(0);
    let (a, b) = sample_indices(total);

    let read = |index| {
        decoder
            .read_frame(path, index)
            .map(|img| frame::normalize(img, max_dim))
            .map_err(|e| media_error(MediaKind::Frame, e))
    };
    let first = read(a)?;
    let second = read(b)?;

    tracing::debug!(total, first = a, second = b, bytes = bytes.len(), "video frames sampled");
    Ok(FramePair::new(first, second))
}
