//! Response assembly: computed checks and fields → [`VerificationResult`].

use crate::decision::{self, decide};
use crate::types::{CheckResult, Checks, Fields, MediaMode, VerificationResult};

/// Build the response. The session id is echoed verbatim and the status is
/// derived from the face and liveness checks only.
pub fn assemble(
    session_id: String,
    mode: MediaMode,
    face_match: CheckResult,
    liveness: CheckResult,
    fields: Fields,
) -> VerificationResult {
    let status = decide(face_match.ok, liveness.ok);
    VerificationResult {
        session_id,
        status,
        checks: Checks {
            face_match,
            liveness,
            document_quality: decision::document_quality_check(),
            document_expired: decision::document_expired_check(),
        },
        fields,
        mode: mode.descriptor(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    #[test]
    fn test_assemble_json_shape() {
        let result = assemble(
            "  Session-42 ".into(),
            MediaMode::Video,
            CheckResult::passed(Some(0.8)),
            CheckResult::failed(Some(0.4), "blink/motion/head failed"),
            Fields::default(),
        );
        assert_eq!(result.status, Status::ManualReview);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sessionId"], "  Session-42 ");
        assert_eq!(json["status"], "manual_review");
        assert_eq!(json["mode"], "passguard-advanced+video");
        assert_eq!(json["checks"]["face_match"]["ok"], true);
        assert_eq!(json["checks"]["liveness"]["reason"], "blink/motion/head failed");
        assert_eq!(json["checks"]["document_quality"]["ok"], true);
        assert!(json["checks"]["document_expired"]["score"].is_null());
        assert!(json["fields"]["raw_text"].is_null());
    }

    #[test]
    fn test_assemble_status_follows_checks() {
        let pass = || CheckResult::passed(Some(1.0));
        let fail = || CheckResult::failed(Some(0.0), "x");
        let cases = [
            (pass(), pass(), Status::Approved),
            (pass(), fail(), Status::ManualReview),
            (fail(), pass(), Status::ManualReview),
            (fail(), fail(), Status::Rejected),
        ];
        for (face, live, expected) in cases {
            let result = assemble("s".into(), MediaMode::Selfie, face, live, Fields::default());
            assert_eq!(result.status, expected);
            assert_eq!(result.mode, "passguard-advanced+selfie");
        }
    }
}
