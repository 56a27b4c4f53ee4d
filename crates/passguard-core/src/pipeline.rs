//! The verification pipeline: document → face match → liveness → OCR →
//! decision → response.
//!
//! Every model-backed stage is an injected collaborator, so the pipeline is
//! exercised in tests with stubs and in production with ONNX models.

use crate::anti_spoof::{LivenessError, LivenessEstimator};
use crate::assemble::assemble;
use crate::decision::{self, MissingDocumentPolicy};
use crate::document::{region_or_passthrough, DocumentRegionDetector};
use crate::frame::{face_crop, Frame, FramePair};
use crate::heuristics;
use crate::landmarks::{LandmarkDetector, LandmarkError};
use crate::matcher::{FaceMatcher, MatcherError};
use crate::ocr::{FieldExtractor, OcrError};
use crate::thresholds::Thresholds;
use crate::types::{Fields, MediaMode, VerificationResult};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("face match: {0}")]
    FaceMatch(#[from] MatcherError),
    #[error("landmarks: {0}")]
    Landmarks(#[from] LandmarkError),
    #[error("image liveness: {0}")]
    Liveness(#[from] LivenessError),
    #[error("ocr: {0}")]
    Ocr(#[from] OcrError),
}

/// Decoded media for one session.
pub struct VerificationInput {
    pub session_id: String,
    pub document: Option<Frame>,
    pub frames: FramePair,
    pub mode: MediaMode,
}

/// Model-backed stages, built once by the composition root.
pub struct Collaborators {
    pub face_matcher: Box<dyn FaceMatcher + Send>,
    pub landmarks: Box<dyn LandmarkDetector + Send>,
    pub liveness: Box<dyn LivenessEstimator + Send>,
    pub document_detector: Box<dyn DocumentRegionDetector + Send>,
    pub fields: FieldExtractor,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VerifierSettings {
    pub thresholds: Thresholds,
    pub missing_document: MissingDocumentPolicy,
}

pub struct Verifier {
    collaborators: Collaborators,
    settings: VerifierSettings,
}

impl Verifier {
    pub fn new(collaborators: Collaborators, settings: VerifierSettings) -> Self {
        Self { collaborators, settings }
    }

    /// Run every stage in order and assemble the response.
    pub fn verify(&mut self, input: VerificationInput) -> Result<VerificationResult, PipelineError> {
        let VerificationInput { session_id, document, frames, mode } = input;
        let c = &mut self.collaborators;
        let thresholds = &self.settings.thresholds;

        let document = document.map(|doc| region_or_passthrough(c.document_detector.as_mut(), doc));

        let face = face_crop(frames.primary());

        let face_check = match &document {
            Some(doc) => {
                let result = c.face_matcher.compare(doc, &face, thresholds.face_match)?;
                decision::face_check(&result)
            }
            None => decision::missing_document_face_check(self.settings.missing_document),
        };

        let image_liveness = c.liveness.estimate(&face)?;
        let report = heuristics::evaluate(&frames, image_liveness, c.landmarks.as_mut(), thresholds)?;
        let liveness_check = report.to_check();

        let fields = match &document {
            Some(doc) => c.fields.extract(doc)?,
            None => Fields::default(),
        };

        let result = assemble(session_id, mode, face_check, liveness_check, fields);

        tracing::info!(
            session_id = %result.session_id,
            status = result.status.as_str(),
            mode = %result.mode,
            face_ok = result.checks.face_match.ok,
            face_score = ?result.checks.face_match.score,
            liveness_ok = result.checks.liveness.ok,
            motion_score = report.motion_score,
            blink_ok = report.blink_ok,
            head_ok = report.head_ok,
            "verification decided"
        );

        Ok(result)
    }
}
