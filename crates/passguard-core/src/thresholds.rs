//! Decision thresholds.
//!
//! Defaults reproduce the production accept/reject behavior exactly. A
//! calibration file may override any subset of them (see `passguard-ml`).

use serde::{Deserialize, Serialize};

/// Mean absolute grayscale difference (0–255 intensity units) between the two
/// frames above which the subject is considered to be moving.
pub const MOTION_THRESHOLD: f32 = 1.2;

/// Minimum drop in eye-aspect-ratio from the first to the second frame that
/// counts as an eye closure. EAR is unitless.
pub const BLINK_DELTA_THRESHOLD: f32 = 0.12;

/// Minimum nose-tip displacement, in normalized image coordinates, that counts
/// as head movement.
pub const HEAD_MOVEMENT_THRESHOLD: f32 = 0.01;

/// Cosine similarity of face embeddings at or above which two faces match.
pub const FACE_MATCH_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub motion: f32,
    pub blink_delta: f32,
    pub head_movement: f32,
    pub face_match: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            motion: MOTION_THRESHOLD,
            blink_delta: BLINK_DELTA_THRESHOLD,
            head_movement: HEAD_MOVEMENT_THRESHOLD,
            face_match: FACE_MATCH_THRESHOLD,
        }
    }
}
