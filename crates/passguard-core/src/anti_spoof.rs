//! Single-image anti-spoofing (presentation attack) estimation.

use crate::frame::Frame;
use thiserror::Error;

/// Score above which the anti-spoof verdict is "live".
pub const LIVENESS_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum LivenessError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Verdict of the per-image anti-spoof model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLiveness {
    pub ok: bool,
    pub score: f32,
    pub reason: Option<String>,
    /// Name of the model that produced the verdict.
    pub model: String,
}

/// Scores whether a face crop shows a live subject rather than a replay.
pub trait LivenessEstimator {
    fn estimate(&mut self, face: &Frame) -> Result<ImageLiveness, LivenessError>;
}

/// Fixed-score estimator used until a trained anti-spoof model is wired in.
///
/// The motion, blink and head heuristics still gate liveness on their own.
pub struct StaticLivenessEstimator {
    score: f32,
}

impl StaticLivenessEstimator {
    pub const MODEL_NAME: &'static str = "stub_liveness";

    pub fn new(score: f32) -> Self {
        Self { score }
    }
}

impl Default for StaticLivenessEstimator {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl LivenessEstimator for StaticLivenessEstimator {
    fn estimate(&mut self, _face: &Frame) -> Result<ImageLiveness, LivenessError> {
        Ok(ImageLiveness {
            ok: self.score > LIVENESS_SCORE_THRESHOLD,
            score: self.score,
            reason: None,
            model: Self::MODEL_NAME.to_string(),
        })
    }
}
