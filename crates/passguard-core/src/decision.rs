//! Final status from the face-match and liveness verdicts.
//!
//! Approve only when both pass, reject only when both fail; a single failing
//! signal routes the session to a human. No other check affects the status.

use crate::matcher::FaceMatch;
use crate::types::{CheckResult, Status};

/// Reason attached to the face check when no document image was supplied.
pub const DOCUMENT_NOT_PROVIDED: &str = "document_not_provided";

/// Static document quality score until a quality model exists.
const DOCUMENT_QUALITY_PLACEHOLDER: f32 = 0.9;

/// How to report the face check when the request carries no document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingDocumentPolicy {
    /// Face match counts as passed with score 1.0.
    #[default]
    Pass,
    /// Face match counts as failed, so the session can never auto-approve.
    Review,
}

impl std::str::FromStr for MissingDocumentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" => Ok(Self::Pass),
            "review" => Ok(Self::Review),
            other => Err(format!("unknown missing-document policy: {other}")),
        }
    }
}

pub fn decide(face_ok: bool, liveness_ok: bool) -> Status {
    match (face_ok, liveness_ok) {
        (true, true) => Status::Approved,
        (false, false) => Status::Rejected,
        _ => Status::ManualReview,
    }
}

pub fn face_check(result: &FaceMatch) -> CheckResult {
    CheckResult {
        ok: result.matched,
        score: Some(result.similarity),
        reason: result.error.clone(),
    }
}

pub fn missing_document_face_check(policy: MissingDocumentPolicy) -> CheckResult {
    match policy {
        MissingDocumentPolicy::Pass => CheckResult {
            ok: true,
            score: Some(1.0),
            reason: Some(DOCUMENT_NOT_PROVIDED.to_string()),
        },
        MissingDocumentPolicy::Review => CheckResult::failed(None, DOCUMENT_NOT_PROVIDED),
    }
}

pub fn document_quality_check() -> CheckResult {
    CheckResult::passed(Some(DOCUMENT_QUALITY_PLACEHOLDER))
}

pub fn document_expired_check() -> CheckResult {
    CheckResult::passed(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_table() {
        assert_eq!(decide(true, true), Status::Approved);
        assert_eq!(decide(true, false), Status::ManualReview);
        assert_eq!(decide(false, true), Status::ManualReview);
        assert_eq!(decide(false, false), Status::Rejected);
    }

    #[test]
    fn test_face_check_carries_error_code() {
        let check = face_check(&FaceMatch::face_not_found());
        assert!(!check.ok);
        assert_eq!(check.score, Some(0.0));
        assert_eq!(check.reason.as_deref(), Some("face_not_found"));
    }

    #[test]
    fn test_missing_document_pass_policy() {
        let check = missing_document_face_check(MissingDocumentPolicy::Pass);
        assert_eq!(
            check,
            CheckResult { ok: true, score: Some(1.0), reason: Some("document_not_provided".into()) }
        );
    }

    #[test]
    fn test_missing_document_review_policy() {
        let check = missing_document_face_check(MissingDocumentPolicy::Review);
        assert!(!check.ok);
        assert!(check.score.is_none());
        assert_eq!(check.reason.as_deref(), Some(DOCUMENT_NOT_PROVIDED));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("PASS".parse::<MissingDocumentPolicy>(), Ok(MissingDocumentPolicy::Pass));
        assert_eq!(" review ".parse::<MissingDocumentPolicy>(), Ok(MissingDocumentPolicy::Review));
        assert!("deny".parse::<MissingDocumentPolicy>().is_err());
    }

    #[test]
    fn test_placeholder_document_checks() {
        assert_eq!(document_quality_check(), CheckResult { ok: true, score: Some(0.9), reason: None });
        assert_eq!(document_expired_check(), CheckResult { ok: true, score: None, reason: None });
    }
}
