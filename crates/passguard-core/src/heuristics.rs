//! Liveness heuristics over a frame pair.
//!
//! A replayed photo is static: the two sampled frames barely differ, the eyes
//! do not close between them and the head does not move. Each sub-signal is
//! computed independently; a frame without a detectable face makes the
//! landmark-based signals fail instead of raising.
//!
//! The composite verdict is a strict AND of the anti-spoof model verdict,
//! motion, blink and head movement. There is no weighting.

use crate::anti_spoof::ImageLiveness;
use crate::frame::{self, FramePair};
use crate::landmarks::{FaceMesh, LandmarkDetector, LandmarkError, LEFT_EYE, NOSE_TIP, RIGHT_EYE};
use crate::thresholds::Thresholds;
use crate::types::CheckResult;
use image::imageops::{self, FilterType};

/// Reason reported on the liveness check when any sub-signal fails.
pub const LIVENESS_FAILED_REASON: &str = "blink/motion/head failed";

/// Mean absolute intensity difference between the two frames (0–255 scale).
pub fn motion_score(pair: &FramePair) -> f32 {
    let first = frame::intensity(&pair.first);
    let mut second = frame::intensity(&pair.second);
    if second.dimensions() != first.dimensions() {
        second = imageops::resize(&second, first.width(), first.height(), FilterType::Triangle);
    }

    let pixels = first.as_raw().len();
    if pixels == 0 {
        return 0.0;
    }

    let total: u64 = first
        .as_raw()
        .iter()
        .zip(second.as_raw().iter())
        .map(|(&a, &b)| a.abs_diff(b) as u64)
        .sum();

    (total as f64 / pixels as f64) as f32
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Eye-aspect-ratio of six eye contour points `[p0..p5]`:
/// `(|p1-p5| + |p2-p4|) / (2 |p0-p3|)`.
pub fn eye_aspect_ratio(points: &[(f32, f32); 6]) -> f32 {
    let vertical = distance(points[1], points[5]) + distance(points[2], points[4]);
    let horizontal = distance(points[0], points[3]);
    vertical / (2.0 * horizontal + 1e-6)
}

/// Mean EAR of both eyes, in pixel coordinates.
pub fn mesh_ear(mesh: &FaceMesh) -> f32 {
    let left = LEFT_EYE.map(|i| mesh.pixel(i));
    let right = RIGHT_EYE.map(|i| mesh.pixel(i));
    (eye_aspect_ratio(&left) + eye_aspect_ratio(&right)) / 2.0
}

/// Nose-tip displacement between frames in normalized coordinates.
/// 0.0 when either frame has no face.
pub fn head_displacement(first: Option<&FaceMesh>, second: Option<&FaceMesh>) -> f32 {
    match (first, second) {
        (Some(a), Some(b)) => distance(a.normalized(NOSE_TIP), b.normalized(NOSE_TIP)),
        _ => 0.0,
    }
}

/// All liveness sub-signals for one request.
#[derive(Debug, Clone)]
pub struct LivenessReport {
    pub image: ImageLiveness,
    pub motion_score: f32,
    pub motion_ok: bool,
    pub ear_first: Option<f32>,
    pub ear_second: Option<f32>,
    pub blink_ok: bool,
    pub head_displacement: f32,
    pub head_ok: bool,
}

impl LivenessReport {
    /// Assemble the report from raw signals and apply the thresholds.
    pub fn from_signals(
        image: ImageLiveness,
        motion_score: f32,
        first: Option<&FaceMesh>,
        second: Option<&FaceMesh>,
        thresholds: &Thresholds,
    ) -> Self {
        let ear_first = first.map(mesh_ear);
        let ear_second = second.map(mesh_ear);
        let blink_ok = match (ear_first, ear_second) {
            (Some(a), Some(b)) => a - b > thresholds.blink_delta,
            _ => false,
        };
        let head_displacement = head_displacement(first, second);

        Self {
            image,
            motion_score,
            motion_ok: motion_score > thresholds.motion,
            ear_first,
            ear_second,
            blink_ok,
            head_displacement,
            head_ok: head_displacement > thresholds.head_movement,
        }
    }

    pub fn is_live(&self) -> bool {
        self.image.ok && self.motion_ok && self.blink_ok && self.head_ok
    }

    /// The externally visible liveness check; its score is the motion score.
    pub fn to_check(&self) -> CheckResult {
        if self.is_live() {
            CheckResult::passed(Some(self.motion_score))
        } else {
            CheckResult::failed(Some(self.motion_score), LIVENESS_FAILED_REASON)
        }
    }
}

/// Run landmark detection once per frame and evaluate every heuristic.
pub fn evaluate(
    pair: &FramePair,
    image: ImageLiveness,
    landmarks: &mut dyn LandmarkDetector,
    thresholds: &Thresholds,
) -> Result<LivenessReport, LandmarkError> {
    let motion = motion_score(pair);
    let first = landmarks.detect(&pair.first)?;
    let second = landmarks.detect(&pair.second)?;

    let report = LivenessReport::from_signals(image, motion, first.as_ref(), second.as_ref(), thresholds);

    tracing::debug!(
        motion_score = report.motion_score,
        motion_ok = report.motion_ok,
        ear_first = ?report.ear_first,
        ear_second = ?report.ear_second,
        blink_ok = report.blink_ok,
        head_displacement = report.head_displacement,
        head_ok = report.head_ok,
        image_ok = report.image.ok,
        "liveness heuristics evaluated"
    );

    Ok(report)
}
