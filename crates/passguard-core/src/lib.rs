//! passguard-core — KYC verification engine.
//!
//! Face matching runs SCRFD detection and ArcFace embeddings through ONNX
//! Runtime. Liveness combines an image-level anti-spoof verdict with motion,
//! blink and head-movement heuristics over two sampled frames. The decision
//! engine maps both verdicts to `approved`, `manual_review` or `rejected`.

pub mod alignment;
pub mod anti_spoof;
pub mod assemble;
pub mod decision;
pub mod detector;
pub mod document;
pub mod frame;
pub mod heuristics;
pub mod landmarks;
pub mod matcher;
pub mod ocr;
pub mod pipeline;
pub mod recognizer;
pub mod thresholds;
pub mod types;

pub use decision::MissingDocumentPolicy;
pub use frame::{Frame, FramePair};
pub use pipeline::{Collaborators, PipelineError, VerificationInput, Verifier, VerifierSettings};
pub use thresholds::Thresholds;
pub use types::{BoundingBox, CheckResult, Checks, Embedding, Fields, MediaMode, Status, VerificationResult};

/// Model directory used when none is configured.
pub fn default_model_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("/var/lib/passguard/models")
}
