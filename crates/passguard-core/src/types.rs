use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// L2-normalized face embedding (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Cosine similarity in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

/// Outcome of a single check, as reported to the caller.
///
/// `reason` is only set when the check failed or ran in a degraded mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub ok: bool,
    pub score: Option<f32>,
    pub reason: Option<String>,
}

impl CheckResult {
    pub fn passed(score: Option<f32>) -> Self {
        Self { ok: true, score, reason: None }
    }

    pub fn failed(score: Option<f32>, reason: impl Into<String>) -> Self {
        Self { ok: false, score, reason: Some(reason.into()) }
    }
}

/// Final verdict of a verification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Approved,
    Rejected,
    ManualReview,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Approved => "approved",
            Status::Rejected => "rejected",
            Status::ManualReview => "manual_review",
        }
    }
}

/// The named checks exposed in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checks {
    pub face_match: CheckResult,
    pub liveness: CheckResult,
    pub document_quality: CheckResult,
    pub document_expired: CheckResult,
}

/// Document attributes read by OCR. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_number: Option<String>,
    pub birthday: Option<String>,
    pub expiry_date: Option<String>,
    pub raw_text: Option<String>,
}

/// Which media pathway produced the selfie frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaMode {
    Video,
    Selfie,
}

const MODE_PREFIX: &str = "passguard-advanced";

impl MediaMode {
    /// Mode descriptor echoed in the response, e.g. `passguard-advanced+video`.
    pub fn descriptor(&self) -> String {
        let suffix = match self {
            MediaMode::Video => "+video",
            MediaMode::Selfie => "+selfie",
        };
        format!("{MODE_PREFIX}{suffix}")
    }
}

/// Complete response for one verification session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub status: Status,
    pub checks: Checks,
    pub fields: Fields,
    pub mode: String,
}
