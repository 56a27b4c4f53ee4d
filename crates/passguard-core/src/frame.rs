//! Frame types and image normalization shared by every pipeline stage.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};

/// Longer-side cap applied to every decoded frame.
pub const DEFAULT_MAX_FRAME_DIM: u32 = 720;

/// A decoded, size-normalized RGB frame.
pub type Frame = RgbImage;

/// Two frames from the same media source.
///
/// Either two video frames sampled at different offsets, or one still image
/// duplicated into both slots. Heuristics consume both shapes the same way.
#[derive(Debug, Clone)]
pub struct FramePair {
    pub first: Frame,
    pub second: Frame,
}

impl FramePair {
    pub fn new(first: Frame, second: Frame) -> Self {
        Self { first, second }
    }

    /// Degenerate pair for still selfies: the same image in both slots.
    pub fn from_still(frame: Frame) -> Self {
        Self { second: frame.clone(), first: frame }
    }

    /// The frame used for face matching and image liveness.
    pub fn primary(&self) -> &Frame {
        &self.first
    }
}

/// Downscale so that the longer side does not exceed `max_dim`.
///
/// Aspect ratio is preserved and images already within the cap are returned
/// untouched. The longer side of a resized image is exactly `max_dim`.
pub fn downscale(frame: Frame, max_dim: u32) -> Frame {
    let (w, h) = frame.dimensions();
    let longer = w.max(h);
    if longer <= max_dim || max_dim == 0 {
        return frame;
    }

    let scale = max_dim as f64 / longer as f64;
    let (new_w, new_h) = if w >= h {
        (max_dim, ((h as f64 * scale).round() as u32).max(1))
    } else {
        (((w as f64 * scale).round() as u32).max(1), max_dim)
    };

    imageops::resize(&frame, new_w, new_h, FilterType::Triangle)
}

/// Decode-side helper: convert any decoded image to an RGB frame and cap it.
pub fn normalize(image: DynamicImage, max_dim: u32) -> Frame {
    downscale(image.into_rgb8(), max_dim)
}

/// Central face region of a selfie frame.
///
/// Keeps rows `h/8..7h/8` and columns `w/6..5w/6`, where a selfie face
/// normally sits; trims background before matching and anti-spoofing.
pub fn face_crop(frame: &Frame) -> Frame {
    let (w, h) = frame.dimensions();
    let (x0, x1) = (w / 6, w * 5 / 6);
    let (y0, y1) = (h / 8, h * 7 / 8);
    if x1 <= x0 || y1 <= y0 {
        return frame.clone();
    }
    imageops::crop_imm(frame, x0, y0, x1 - x0, y1 - y0).to_image()
}

/// Single-channel intensity using BT.601 luma weights.
pub fn intensity(frame: &Frame) -> GrayImage {
    let (w, h) = frame.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        image::Luma([luma.min(255) as u8])
    })
}
