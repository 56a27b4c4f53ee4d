//! HTTP surface: `GET /` health and `POST /verify`.

use crate::engine::{EngineError, EngineHandle};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use passguard_core::{FramePair, MediaMode, VerificationInput, VerificationResult};
use passguard_media::{MediaClient, MediaError};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "passguard-ml";

const MEDIA_REQUIRED: &str = "either videoUrl or selfieUrl required";

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub media: MediaClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub session_id: String,
    pub document_url: Option<String>,
    pub selfie_url: Option<String>,
    pub video_url: Option<String>,
    pub country: String,
    pub document_type: String,
}

/// Where the live face comes from. Video wins when both are given.
enum FaceSource<'a> {
    Video(&'a str),
    Selfie(&'a str),
}

/// Empty strings count as absent.
fn given(url: &Option<String>) -> Option<&str> {
    url.as_deref().filter(|u| !u.is_empty())
}

impl VerifyRequest {
    fn face_source(&self) -> Result<FaceSource<'_>, ApiError> {
        match (given(&self.video_url), given(&self.selfie_url)) {
            (Some(url), _) => Ok(FaceSource::Video(url)),
            (None, Some(url)) => Ok(FaceSource::Selfie(url)),
            (None, None) => Err(ApiError::Validation(MEDIA_REQUIRED.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::Media(err) if err.is_internal() => {
                tracing::error!(error = %err, "media decoder unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, err.detail().to_string())
            }
            ApiError::Media(err) => {
                tracing::warn!(error = %err, "media acquisition failed");
                (StatusCode::UNPROCESSABLE_ENTITY, err.detail().to_string())
            }
            ApiError::Engine(err) => {
                tracing::error!(error = %err, "verification engine failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/verify", post(verify))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "http",
                request_id = %uuid::Uuid::new_v4(),
                method = %req.method(),
                path = %req.uri().path(),
            )
        }))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerificationResult>, ApiError> {
    let Json(req) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let source = req.face_source()?;

    tracing::info!(
        session_id = %req.session_id,
        country = %req.country,
        document_type = %req.document_type,
        document = given(&req.document_url).is_some(),
        video = matches!(source, FaceSource::Video(_)),
        "verification requested"
    );

    let document = match given(&req.document_url) {
        Some(url) => Some(state.media.fetch_image(url).await?),
        None => None,
    };

    let (frames, mode) = match source {
        FaceSource::Video(url) => (state.media.fetch_video_frames(url).await?, MediaMode::Video),
        FaceSource::Selfie(url) => (FramePair::from_still(state.media.fetch_image(url).await?), MediaMode::Selfie),
    };

    let input = VerificationInput {
        session_id: req.session_id.clone(),
        document,
        frames,
        mode,
    };
    let result = state.engine.verify(input).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spawn_engine;
    use crate::testing;
    use http_body_util::BodyExt;
    use passguard_core::Verifier;
    use passguard_media::{FfmpegDecoder, MediaSettings};
    use std::io::Cursor;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn png() -> Vec<u8> {
        let img = image::RgbImage::from_fn(320, 240, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 80]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Local media server: `/face.png`, `/doc.png`, everything else 404.
    async fn media_server() -> String {
        let app = Router::new()
            .route("/face.png", get(|| async { png() }))
            .route("/doc.png", get(|| async { png() }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request(video_url: Option<&str>, selfie_url: Option<&str>) -> VerifyRequest {
        VerifyRequest {
            session_id: "s".into(),
            document_url: None,
            selfie_url: selfie_url.map(str::to_string),
            video_url: video_url.map(str::to_string),
            country: "KZ".into(),
            document_type: "id_card".into(),
        }
    }

    fn app(verifier: Verifier) -> Router {
        let state = AppState {
            engine: spawn_engine(verifier).unwrap(),
            media: MediaClient::new(MediaSettings::default(), Arc::new(FfmpegDecoder::default())),
        };
        router(state)
    }

    async fn post_verify(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/verify")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_face_source_precedence() {
        let video = |req: &VerifyRequest| matches!(req.face_source(), Ok(FaceSource::Video(u)) if u == "v.mp4");
        let selfie = |req: &VerifyRequest| matches!(req.face_source(), Ok(FaceSource::Selfie(u)) if u == "f.png");

        assert!(video(&request(Some("v.mp4"), None)));
        assert!(selfie(&request(None, Some("f.png"))));
        assert!(video(&request(Some("v.mp4"), Some("f.png"))));
        assert!(selfie(&request(Some(""), Some("f.png"))));
        assert!(video(&request(Some("v.mp4"), Some(""))));
        assert!(matches!(request(Some(""), Some("")).face_source(), Err(ApiError::Validation(_))));
        assert!(matches!(request(None, None).face_source(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_decoder_unavailable_is_500() {
        let err = ApiError::Media(MediaError::Decoder { cause: "failed to run ffprobe".into() });
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::Media(MediaError::decode(passguard_media::MediaKind::Video, "no stream"));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_health() {
        let resp = app(testing::stub_verifier(true))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "status": "ok", "service": "passguard-ml" }));
    }

    #[tokio::test]
    async fn test_missing_media_is_422() {
        let (status, body) = post_verify(
            app(testing::stub_verifier(true)),
            json!({ "sessionId": "s1", "country": "KZ", "documentType": "id_card" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], MEDIA_REQUIRED);
    }

    #[tokio::test]
    async fn test_empty_urls_count_as_missing() {
        let (status, body) = post_verify(
            app(testing::stub_verifier(true)),
            json!({ "sessionId": "s1", "selfieUrl": "", "videoUrl": "", "country": "KZ", "documentType": "id_card" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], MEDIA_REQUIRED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_422() {
        let (status, body) = post_verify(
            app(testing::stub_verifier(true)),
            json!({ "sessionId": "s1", "selfieUrl": "http://x/face.png" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("country"));
    }

    #[tokio::test]
    async fn test_selfie_flow_end_to_end() {
        let base = media_server().await;
        let (status, body) = post_verify(
            app(testing::stub_verifier(true)),
            json!({
                "sessionId": "Sess-XYZ",
                "documentUrl": format!("{base}/doc.png"),
                "selfieUrl": format!("{base}/face.png"),
                "country": "KZ",
                "documentType": "passport"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "Sess-XYZ");
        assert_eq!(body["mode"], "passguard-advanced+selfie");
        assert_eq!(body["checks"]["face_match"]["ok"], true);
        // A still selfie has no motion, so liveness fails and a human reviews.
        assert_eq!(body["checks"]["liveness"]["ok"], false);
        assert_eq!(body["checks"]["liveness"]["score"], 0.0);
        assert_eq!(body["checks"]["liveness"]["reason"], "blink/motion/head failed");
        assert_eq!(body["checks"]["document_quality"]["score"].as_f64().map(|v| (v * 10.0).round()), Some(9.0));
        assert_eq!(body["status"], "manual_review");
        assert_eq!(body["fields"]["raw_text"], "");
    }

    #[tokio::test]
    async fn test_without_document_face_check_passes() {
        let base = media_server().await;
        let (status, body) = post_verify(
            app(testing::stub_verifier(false)),
            json!({
                "sessionId": "s2",
                "selfieUrl": format!("{base}/face.png"),
                "country": "KZ",
                "documentType": "passport"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["checks"]["face_match"],
            json!({ "ok": true, "score": 1.0, "reason": "document_not_provided" })
        );
        assert!(body["fields"].as_object().unwrap().values().all(|v| v.is_null()));
    }

    #[tokio::test]
    async fn test_document_download_failure_is_422() {
        let base = media_server().await;
        let (status, body) = post_verify(
            app(testing::stub_verifier(true)),
            json!({
                "sessionId": "s3",
                "documentUrl": format!("{base}/missing.png"),
                "selfieUrl": format!("{base}/face.png"),
                "country": "KZ",
                "documentType": "passport"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "cannot download image");
    }

    #[tokio::test]
    async fn test_video_download_failure_is_422() {
        let base = media_server().await;
        let (status, body) = post_verify(
            app(testing::stub_verifier(true)),
            json!({
                "sessionId": "s5",
                "videoUrl": format!("{base}/missing.mp4"),
                "selfieUrl": format!("{base}/face.png"),
                "country": "KZ",
                "documentType": "passport"
            }),
        )
        .await;
        // Video wins over the selfie, so its 404 fails the request.
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({ "detail": "cannot download video" }));
    }

    #[tokio::test]
    async fn test_engine_failure_is_500() {
        let base = media_server().await;
        let (status, body) = post_verify(
            app(testing::failing_verifier()),
            json!({
                "sessionId": "s4",
                "selfieUrl": format!("{base}/face.png"),
                "country": "KZ",
                "documentType": "passport"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "internal error" }));
    }
}
