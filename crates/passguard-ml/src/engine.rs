use passguard_core::{PipelineError, VerificationInput, VerificationResult, Verifier};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Requests queued ahead of the engine before senders start waiting.
const QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Verify {
        input: VerificationInput,
        reply: oneshot::Sender<Result<VerificationResult, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run the full verification pipeline on already-decoded media.
    pub async fn verify(&self, input: VerificationInput) -> Result<VerificationResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Verify { input, reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread owns the verifier and with it every ONNX session, so
/// inference never runs concurrently and never blocks the async runtime.
pub fn spawn_engine(mut verifier: Verifier) -> std::io::Result<EngineHandle> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("passguard-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Verify { input, reply } => {
                        let session_id = input.session_id.clone();
                        let result = verifier.verify(input).map_err(EngineError::from);
                        if let Err(err) = &result {
                            tracing::error!(session_id = %session_id, error = %err, "verification failed");
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use passguard_core::{FramePair, MediaMode, Status};

    fn input(session_id: &str) -> VerificationInput {
        VerificationInput {
            session_id: session_id.into(),
            document: Some(testing::solid_frame(90)),
            frames: FramePair::from_still(testing::solid_frame(120)),
            mode: MediaMode::Selfie,
        }
    }

    #[tokio::test]
    async fn test_verify_through_engine_thread() {
        let handle = spawn_engine(testing::stub_verifier(true)).unwrap();
        let result = handle.verify(input("engine-1")).await.unwrap();
        assert_eq!(result.session_id, "engine-1");
        assert!(result.checks.face_match.ok);
        assert_eq!(result.status, Status::ManualReview);
    }

    #[tokio::test]
    async fn test_handles_share_one_engine() {
        let handle = spawn_engine(testing::stub_verifier(false)).unwrap();
        let other = handle.clone();
        let (a, b) = tokio::join!(handle.verify(input("a")), other.verify(input("b")));
        assert_eq!(a.unwrap().status, Status::Rejected);
        assert_eq!(b.unwrap().session_id, "b");
    }

    #[tokio::test]
    async fn test_pipeline_error_is_reported() {
        let handle = spawn_engine(testing::failing_verifier()).unwrap();
        let err = handle.verify(input("boom")).await.unwrap_err();
        assert!(matches!(err, EngineError::Pipeline(_)));
    }
}
