//! Dense facial landmarks (468-point face mesh) for blink and head tracking.
//!
//! The mesh follows the MediaPipe face-mesh topology, so eye and nose indices
//! below are fixed by the model, not by this crate.

use crate::detector::{DetectorError, FaceDetector};
use crate::frame::Frame;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

/// Points produced by the face-mesh model (without iris refinement).
pub const MESH_POINTS: usize = 468;

/// Left eye contour: outer corner, two upper lid points, inner corner, two lower lid points.
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
/// Right eye contour, same ordering as [`LEFT_EYE`].
pub const RIGHT_EYE: [usize; 6] = [263, 387, 385, 362, 380, 373];
/// Nose tip; stable under expression changes.
pub const NOSE_TIP: usize = 1;

const MESH_INPUT_SIZE: u32 = 192;
const MESH_CROP_SCALE: f32 = 1.5;
const MESH_PRESENCE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Face-mesh landmarks for one face, stored in normalized [0, 1] coordinates.
#[derive(Debug, Clone)]
pub struct FaceMesh {
    points: Vec<(f32, f32)>,
    width: u32,
    height: u32,
}

impl FaceMesh {
    /// Build a mesh from normalized points. `None` if the mesh is incomplete.
    pub fn new(points: Vec<(f32, f32)>, width: u32, height: u32) -> Option<Self> {
        (points.len() >= MESH_POINTS).then_some(Self { points, width, height })
    }

    pub fn normalized(&self, index: usize) -> (f32, f32) {
        self.points[index]
    }

    /// Point in pixel coordinates of the source frame.
    pub fn pixel(&self, index: usize) -> (f32, f32) {
        let (x, y) = self.points[index];
        (x * self.width as f32, y * self.height as f32)
    }
}

/// Single-face landmark detection. `Ok(None)` means no face was found.
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceMesh>, LandmarkError>;
}

/// SCRFD finds the face, the MediaPipe face-landmark model (192×192 NHWC,
/// inputs in [0, 1]) refines it into the 468-point mesh.
pub struct FaceMeshLandmarker {
    detector: FaceDetector,
    session: Session,
    output_count: usize,
}

impl FaceMeshLandmarker {
    pub fn load(scrfd_path: &str, mesh_path: &str) -> Result<Self, LandmarkError> {
        let detector = FaceDetector::load(scrfd_path)?;

        if !Path::new(mesh_path).exists() {
            return Err(LandmarkError::ModelNotFound(mesh_path.to_string()));
        }
        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(mesh_path)?;

        let output_count = session.outputs().len();
        tracing::info!(path = mesh_path, outputs = output_count, "loaded face-mesh model");

        Ok(Self { detector, session, output_count })
    }
}

impl LandmarkDetector for FaceMeshLandmarker {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceMesh>, LandmarkError> {
        let faces = self.detector.detect(frame)?;
        let Some(face) = faces.first() else {
            return Ok(None);
        };

        let region = CropRegion::around(face.x, face.y, face.width, face.height);
        let crop = region.extract(frame);
        let input = preprocess(&crop);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut raw_points: Option<Vec<f32>> = None;
        let mut presence_logit: Option<f32> = None;
        for index in 0..self.output_count {
            let (_, data) = outputs[index]
                .try_extract_tensor::<f32>()
                .map_err(|e| LandmarkError::InferenceFailed(format!("mesh output: {e}")))?;
            match data.len() {
                n if n >= MESH_POINTS * 3 && raw_points.is_none() => raw_points = Some(data.to_vec()),
                1 if presence_logit.is_none() => presence_logit = Some(data[0]),
                _ => {}
            }
        }

        let raw_points = raw_points
            .ok_or_else(|| LandmarkError::InferenceFailed("no landmark tensor in model outputs".into()))?;

        if let Some(logit) = presence_logit {
            let presence = 1.0 / (1.0 + (-logit).exp());
            if presence < MESH_PRESENCE_THRESHOLD {
                tracing::debug!(presence, "face-mesh presence below threshold");
                return Ok(None);
            }
        }

        let (width, height) = frame.dimensions();
        let points = region.to_normalized(&raw_points, width, height);
        Ok(FaceMesh::new(points, width, height))
    }
}

/// Square crop around a face box, expanded so the whole head is visible.
#[derive(Debug, Clone, Copy)]
struct CropRegion {
    x0: f32,
    y0: f32,
    side: f32,
}

impl CropRegion {
    fn around(x: f32, y: f32, width: f32, height: f32) -> Self {
        let side = (width.max(height) * MESH_CROP_SCALE).max(1.0);
        let cx = x + width / 2.0;
        let cy = y + height / 2.0;
        Self { x0: cx - side / 2.0, y0: cy - side / 2.0, side }
    }

    /// Copy the region (black outside the frame) and resize to the model input.
    fn extract(&self, frame: &Frame) -> RgbImage {
        let side = self.side.round().max(1.0) as u32;
        let (fw, fh) = (frame.width() as i64, frame.height() as i64);
        let (ox, oy) = (self.x0.round() as i64, self.y0.round() as i64);

        let square = RgbImage::from_fn(side, side, |x, y| {
            let sx = ox + x as i64;
            let sy = oy + y as i64;
            if sx >= 0 && sx < fw && sy >= 0 && sy < fh {
                *frame.get_pixel(sx as u32, sy as u32)
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        imageops::resize(&square, MESH_INPUT_SIZE, MESH_INPUT_SIZE, FilterType::Triangle)
    }

    /// Model-space (x, y, z) triples → normalized frame coordinates.
    fn to_normalized(&self, raw: &[f32], width: u32, height: u32) -> Vec<(f32, f32)> {
        let scale = self.side / MESH_INPUT_SIZE as f32;
        raw.chunks_exact(3)
            .take(MESH_POINTS)
            .map(|p| {
                let px = self.x0 + p[0] * scale;
                let py = self.y0 + p[1] * scale;
                (px / width as f32, py / height as f32)
            })
            .collect()
    }
}

fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let size = MESH_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in crop.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = pixel.0[c] as f32 / 255.0;
        }
    }
    tensor
}
