use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use passguard_core::frame::{self, FramePair, DEFAULT_MAX_FRAME_DIM};
use passguard_core::heuristics;
use passguard_core::thresholds::MOTION_THRESHOLD;
use passguard_media::{FfmpegDecoder, VideoDecoder};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "passguard", about = "PassGuard verification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the verification service is up
    Health {
        #[arg(long, env = "PASSGUARD_URL", default_value = DEFAULT_SERVICE_URL)]
        url: String,
    },
    /// Submit a verification request and print the result
    Verify {
        #[arg(long, env = "PASSGUARD_URL", default_value = DEFAULT_SERVICE_URL)]
        url: String,
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        document_url: Option<String>,
        #[arg(long)]
        selfie_url: Option<String>,
        #[arg(long)]
        video_url: Option<String>,
        #[arg(long, default_value = "KZ")]
        country: String,
        #[arg(long, default_value = "id_card")]
        document_type: String,
    },
    /// Sample the two liveness frames from a local video
    Frames {
        video: PathBuf,
        /// Directory for frame_a.png and frame_b.png
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long, default_value = "ffprobe")]
        ffprobe: String,
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: String,
    },
    /// Motion score between two local images
    Motion { first: PathBuf, second: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Health { url } => {
            let body: Value = reqwest::get(format!("{}/", url.trim_end_matches('/')))
                .await
                .with_context(|| format!("connecting to {url}"))?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Verify {
            url,
            session_id,
            document_url,
            selfie_url,
            video_url,
            country,
            document_type,
        } => {
            if selfie_url.is_none() && video_url.is_none() {
                bail!("pass --selfie-url or --video-url");
            }
            let request = verify_body(
                &session_id,
                document_url.as_deref(),
                selfie_url.as_deref(),
                video_url.as_deref(),
                &country,
                &document_type,
            );
            let resp = reqwest::Client::new()
                .post(format!("{}/verify", url.trim_end_matches('/')))
                .json(&request)
                .send()
                .await
                .with_context(|| format!("connecting to {url}"))?;
            let status = resp.status();
            let body: Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            if !status.is_success() {
                bail!("service returned {status}");
            }
        }
        Commands::Frames { video, out_dir, ffprobe, ffmpeg } => {
            let decoder = FfmpegDecoder::new(ffprobe, ffmpeg);
            let total = decoder
                .frame_count(&video)
                .with_context(|| format!("reading frame count of {}", video.display()))?;
            let (a, b) = passguard_media::sample_indices(total.unwrap_or(0));
            tracing::info!(video = %video.display(), total = ?total, first = a, second = b, "sampling frames");
            println!("frames: {} (sampling {a} and {b})", total.map_or("unknown".into(), |n| n.to_string()));

            let bytes = std::fs::read(&video).with_context(|| format!("reading {}", video.display()))?;
            let pair = tokio::task::spawn_blocking(move || {
                passguard_media::extract_frame_pair(&bytes, &decoder, DEFAULT_MAX_FRAME_DIM)
            })
            .await??;

            std::fs::create_dir_all(&out_dir)?;
            for (name, img) in [("frame_a.png", &pair.first), ("frame_b.png", &pair.second)] {
                let path = out_dir.join(name);
                img.save(&path).with_context(|| format!("writing {}", path.display()))?;
                println!("{} {}x{}", path.display(), img.width(), img.height());
            }
            println!("motion: {:.3}", heuristics::motion_score(&pair));
        }
        Commands::Motion { first, second } => {
            let pair = FramePair::new(load_frame(&first)?, load_frame(&second)?);
            let score = heuristics::motion_score(&pair);
            println!("motion: {score:.3} (threshold {MOTION_THRESHOLD}, ok: {})", score > MOTION_THRESHOLD);
        }
    }

    Ok(())
}

fn load_frame(path: &Path) -> Result<frame::Frame> {
    let img = image::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(frame::normalize(img, DEFAULT_MAX_FRAME_DIM))
}

/// Request body for `POST /verify`; absent URLs are omitted.
fn verify_body(
    session_id: &str,
    document_url: Option<&str>,
    selfie_url: Option<&str>,
    video_url: Option<&str>,
    country: &str,
    document_type: &str,
) -> Value {
    let mut body = json!({
        "sessionId": session_id,
        "country": country,
        "documentType": document_type,
    });
    for (key, value) in [("documentUrl", document_url), ("selfieUrl", selfie_url), ("videoUrl", video_url)] {
        if let Some(v) = value {
            body[key] = Value::String(v.to_string());
        }
    }
    body
}
