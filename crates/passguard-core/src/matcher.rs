//! Document-to-selfie face matching.

use crate::detector::{DetectorError, FaceDetector};
use crate::frame::Frame;
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Embedding;
use thiserror::Error;

/// Error code reported when either image yields no usable face.
pub const FACE_NOT_FOUND: &str = "face_not_found";

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Outcome of comparing the document face with the selfie face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub matched: bool,
    pub similarity: f32,
    /// Soft failure code, e.g. [`FACE_NOT_FOUND`]. Not an inference error.
    pub error: Option<String>,
}

impl FaceMatch {
    pub fn face_not_found() -> Self {
        Self { matched: false, similarity: 0.0, error: Some(FACE_NOT_FOUND.to_string()) }
    }

    pub fn from_embeddings(document: &Embedding, selfie: &Embedding, threshold: f32) -> Self {
        let similarity = document.similarity(selfie);
        Self { matched: similarity >= threshold, similarity, error: None }
    }
}

/// Compares the face on an identity document with a selfie face.
pub trait FaceMatcher {
    fn compare(&mut self, document: &Frame, selfie: &Frame, threshold: f32) -> Result<FaceMatch, MatcherError>;
}

/// SCRFD detection + ArcFace embeddings, cosine similarity of the first
/// (most confident) face in each image.
pub struct ArcFaceMatcher {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl ArcFaceMatcher {
    pub fn new(detector: FaceDetector, recognizer: FaceRecognizer) -> Self {
        Self { detector, recognizer }
    }

    pub fn load(scrfd_path: &str, arcface_path: &str) -> Result<Self, MatcherError> {
        Ok(Self::new(FaceDetector::load(scrfd_path)?, FaceRecognizer::load(arcface_path)?))
    }

    fn embed(&mut self, frame: &Frame) -> Result<Option<Embedding>, MatcherError> {
        let faces = self.detector.detect(frame)?;
        let Some(face) = faces.first() else {
            return Ok(None);
        };
        if face.landmarks.is_none() {
            return Ok(None);
        }
        Ok(Some(self.recognizer.extract(frame, face)?))
    }
}

impl FaceMatcher for ArcFaceMatcher {
    fn compare(&mut self, document: &Frame, selfie: &Frame, threshold: f32) -> Result<FaceMatch, MatcherError> {
        let doc_embedding = self.embed(document)?;
        let selfie_embedding = self.embed(selfie)?;

        match (doc_embedding, selfie_embedding) {
            (Some(doc), Some(selfie)) => {
                let result = FaceMatch::from_embeddings(&doc, &selfie, threshold);
                tracing::debug!(similarity = result.similarity, matched = result.matched, "face match computed");
                Ok(result)
            }
            (doc, selfie) => {
                tracing::debug!(
                    document_face = doc.is_some(),
                    selfie_face = selfie.is_some(),
                    "face match skipped: face not found"
                );
                Ok(FaceMatch::face_not_found())
            }
        }
    }
}
