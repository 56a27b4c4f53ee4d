//! Document region detection with an explicit pass-through fallback.

use crate::frame::Frame;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentDetectorError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Locates the identity document inside a photo and returns the cropped region.
pub trait DocumentRegionDetector {
    fn detect(&mut self, image: &Frame) -> Result<Frame, DocumentDetectorError>;
}

/// Returns the photo unchanged. Used while no document model is deployed.
#[derive(Debug, Default)]
pub struct PassThroughDetector;

impl DocumentRegionDetector for PassThroughDetector {
    fn detect(&mut self, image: &Frame) -> Result<Frame, DocumentDetectorError> {
        Ok(image.clone())
    }
}

/// Crop the document region, or keep the full image if the detector fails.
///
/// Detector failures never fail the request; they are logged and the
/// verification continues on the uncropped photo.
pub fn region_or_passthrough(detector: &mut dyn DocumentRegionDetector, image: Frame) -> Frame {
    match detector.detect(&image) {
        Ok(region) => region,
        Err(err) => {
            tracing::warn!(error = %err, "document detector failed; using full image");
            image
        }
    }
}
