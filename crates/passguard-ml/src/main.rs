use anyhow::{Context, Result};
use passguard_core::anti_spoof::StaticLivenessEstimator;
use passguard_core::document::PassThroughDetector;
use passguard_core::landmarks::FaceMeshLandmarker;
use passguard_core::matcher::ArcFaceMatcher;
use passguard_core::ocr::{FieldExtractor, NullRecognizer, TextRecognizer};
use passguard_core::{Collaborators, Verifier, VerifierSettings};
use passguard_media::{FfmpegDecoder, MediaClient};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod engine;
#[cfg(test)]
mod testing;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        bind = %config.bind_addr,
        model_dir = %config.model_dir.display(),
        missing_document = ?config.missing_document,
        "passguard-ml starting"
    );

    // Load every model up front so a bad deployment fails at startup.
    let verifier = build_verifier(&config)?;
    let engine = engine::spawn_engine(verifier).context("spawning engine thread")?;

    let decoder = Arc::new(FfmpegDecoder::new(&config.ffprobe, &config.ffmpeg));
    let media = MediaClient::new(config.media_settings(), decoder);
    let app = api::router(api::AppState { engine, media });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "passguard-ml ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("passguard-ml shutting down");
    Ok(())
}

fn build_verifier(config: &Config) -> Result<Verifier> {
    let thresholds = config.thresholds()?;
    tracing::info!(
        motion = thresholds.motion,
        blink_delta = thresholds.blink_delta,
        head_movement = thresholds.head_movement,
        face_match = thresholds.face_match,
        "thresholds loaded"
    );

    let scrfd = config.scrfd_model_path();
    let arcface = config.arcface_model_path();
    let face_matcher = ArcFaceMatcher::load(&scrfd, &arcface).context("loading face matcher")?;
    tracing::info!(scrfd = %scrfd, arcface = %arcface, "face matcher loaded");

    let mesh = config.landmark_model_path();
    let landmarks = FaceMeshLandmarker::load(&scrfd, &mesh).context("loading face mesh")?;
    tracing::info!(path = %mesh, "face mesh landmarker loaded");

    let collaborators = Collaborators {
        face_matcher: Box::new(face_matcher),
        landmarks: Box::new(landmarks),
        liveness: Box::new(StaticLivenessEstimator::default()),
        document_detector: Box::new(PassThroughDetector),
        fields: FieldExtractor::new(text_recognizer(config)),
    };
    let settings = VerifierSettings {
        thresholds,
        missing_document: config.missing_document,
    };
    Ok(Verifier::new(collaborators, settings))
}

fn text_recognizer(config: &Config) -> Box<dyn TextRecognizer + Send> {
    #[cfg(feature = "tesseract")]
    {
        if let Some(langs) = &config.ocr_langs {
            tracing::info!(languages = %langs, "tesseract OCR enabled");
            return Box::new(passguard_core::ocr::TesseractRecognizer::new(langs.clone()));
        }
    }
    #[cfg(not(feature = "tesseract"))]
    {
        if config.ocr_langs.is_some() {
            tracing::warn!("PASSGUARD_OCR_LANGS is set but the tesseract feature is not compiled in");
        }
    }
    tracing::info!("OCR disabled; document fields will be empty");
    Box::new(NullRecognizer)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
