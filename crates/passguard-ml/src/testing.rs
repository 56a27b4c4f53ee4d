//! Stub collaborators for service tests.

use passguard_core::anti_spoof::StaticLivenessEstimator;
use passguard_core::document::PassThroughDetector;
use passguard_core::landmarks::{FaceMesh, LandmarkDetector, LandmarkError};
use passguard_core::matcher::{FaceMatch, FaceMatcher, MatcherError};
use passguard_core::ocr::{FieldExtractor, NullRecognizer};
use passguard_core::{Collaborators, Frame, Verifier, VerifierSettings};

pub struct FixedMatcher(pub bool);

impl FaceMatcher for FixedMatcher {
    fn compare(&mut self, _document: &Frame, _selfie: &Frame, threshold: f32) -> Result<FaceMatch, MatcherError> {
        let similarity = if self.0 { 0.9 } else { 0.1 };
        Ok(FaceMatch { matched: similarity >= threshold, similarity, error: None })
    }
}

pub struct NoLandmarks;

impl LandmarkDetector for NoLandmarks {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<FaceMesh>, LandmarkError> {
        Ok(None)
    }
}

pub struct BrokenLandmarks;

impl LandmarkDetector for BrokenLandmarks {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<FaceMesh>, LandmarkError> {
        Err(LandmarkError::InferenceFailed("no output tensor".into()))
    }
}

pub fn solid_frame(value: u8) -> Frame {
    Frame::from_pixel(64, 48, image::Rgb([value, value, value]))
}

fn verifier(face_ok: bool, landmarks: Box<dyn LandmarkDetector + Send>) -> Verifier {
    Verifier::new(
        Collaborators {
            face_matcher: Box::new(FixedMatcher(face_ok)),
            landmarks,
            liveness: Box::new(StaticLivenessEstimator::default()),
            document_detector: Box::new(PassThroughDetector),
            fields: FieldExtractor::new(Box::new(NullRecognizer)),
        },
        VerifierSettings::default(),
    )
}

pub fn stub_verifier(face_ok: bool) -> Verifier {
    verifier(face_ok, Box::new(NoLandmarks))
}

pub fn failing_verifier() -> Verifier {
    verifier(true, Box::new(BrokenLandmarks))
}
