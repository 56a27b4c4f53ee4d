//! HTTP media download and decoding.

use crate::error::{MediaError, MediaKind};
use crate::video::{self, VideoDecoder};
use passguard_core::frame::{self, Frame, FramePair, DEFAULT_MAX_FRAME_DIM};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_VIDEO_TIMEOUT: Duration = Duration::from_secs(40);

#[derive(Debug, Clone, Copy)]
pub struct MediaSettings {
    pub image_timeout: Duration,
    pub video_timeout: Duration,
    /// Cap on the longer side of every decoded frame.
    pub max_frame_dim: u32,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            video_timeout: DEFAULT_VIDEO_TIMEOUT,
            max_frame_dim: DEFAULT_MAX_FRAME_DIM,
        }
    }
}

/// Decode an encoded still image and cap its size.
pub fn decode_image(bytes: &[u8], max_dim: u32) -> Result<Frame, MediaError> {
    let image = image::load_from_memory(bytes).map_err(|e| MediaError::decode(MediaKind::Image, e))?;
    Ok(frame::normalize(image, max_dim))
}

/// Downloads request media and turns it into frames.
#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    decoder: Arc<dyn VideoDecoder>,
    settings: MediaSettings,
}

impl MediaClient {
    pub fn new(settings: MediaSettings, decoder: Arc<dyn VideoDecoder>) -> Self {
        Self { http: reqwest::Client::new(), decoder, settings }
    }

    async fn download(&self, url: &str, kind: MediaKind, timeout: Duration) -> Result<Vec<u8>, MediaError> {
        let resp = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| MediaError::fetch(kind, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MediaError::fetch(kind, format!("status {status}")));
        }

        let body = resp.bytes().await.map_err(|e| MediaError::fetch(kind, e))?;
        tracing::debug!(kind = %kind, bytes = body.len(), "media downloaded");
        Ok(body.to_vec())
    }

    /// Download and decode a still image.
    pub async fn fetch_image(&self, url: &str) -> Result<Frame, MediaError> {
        let bytes = self.download(url, MediaKind::Image, self.settings.image_timeout).await?;
        let max_dim = self.settings.max_frame_dim;
        tokio::task::spawn_blocking(move || decode_image(&bytes, max_dim))
            .await
            .map_err(|e| MediaError::decode(MediaKind::Image, e))?
    }

    /// Download a video and sample its frame pair.
    pub async fn fetch_video_frames(&self, url: &str) -> Result<FramePair, MediaError> {
        let bytes = self.download(url, MediaKind::Video, self.settings.video_timeout).await?;
        let decoder = Arc::clone(&self.decoder);
        let max_dim = self.settings.max_frame_dim;
        tokio::task::spawn_blocking(move || video::extract_frame_pair(&bytes, decoder.as_ref(), max_dim))
            .await
            .map_err(|e| MediaError::decode(MediaKind::Video, e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::FfmpegDecoder;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([20, 40, 60]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/big.png", get(|| async { png(1600, 900) }))
            .route("/garbage.png", get(|| async { "definitely not an image" }))
            .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client() -> MediaClient {
        MediaClient::new(MediaSettings::default(), Arc::new(FfmpegDecoder::default()))
    }

    #[test]
    fn test_decode_image_caps_size() {
        let frame = decode_image(&png(1600, 900), 720).unwrap();
        assert_eq!(frame.dimensions(), (720, 405));
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        let err = decode_image(b"\x00\x01\x02", 720).unwrap_err();
        assert_eq!(err.detail(), "cannot decode image");
    }

    #[tokio::test]
    async fn test_fetch_image_downscales() {
        let base = serve().await;
        let frame = client().fetch_image(&format!("{base}/big.png")).await.unwrap();
        assert_eq!(frame.dimensions(), (720, 405));
    }

    #[tokio::test]
    async fn test_fetch_image_not_found() {
        let base = serve().await;
        let err = client().fetch_image(&format!("{base}/missing.png")).await.unwrap_err();
        assert_eq!(err.detail(), "cannot download image");
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_image_undecodable() {
        let base = serve().await;
        let err = client().fetch_image(&format!("{base}/garbage.png")).await.unwrap_err();
        assert_eq!(err.detail(), "cannot decode image");
    }

    #[tokio::test]
    async fn test_fetch_video_not_found() {
        let base = serve().await;
        let err = client().fetch_video_frames(&format!("{base}/missing.png")).await.unwrap_err();
        assert_eq!(err.detail(), "cannot download video");
    }
}
