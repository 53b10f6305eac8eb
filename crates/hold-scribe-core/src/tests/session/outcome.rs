use crate::{
    permissions::Capability,
    session::{CancelReason, SessionOutcome},
};

/// WHAT: A focus change is a silent success
/// WHY: Moving focus is usually intentional; the transcript is just dropped
#[test]
fn given_target_mismatch_when_classifying_then_success_without_notice() {
    let outcome = SessionOutcome::TargetMismatch;
    assert!(outcome.is_success());
    assert!(outcome.notice().is_none());
    assert_eq!(outcome.kind(), "target_mismatch");
}

/// WHAT: Failures carry a notice with remediation
/// WHY: The user needs to know why nothing was typed
#[test]
#[allow(clippy::unwrap_used)]
fn given_failures_when_classifying_then_notice_explains() {
    // Given/When: A denied microphone
    let denied = SessionOutcome::PermissionDenied {
        capability: Capability::Microphone,
    };

    // Then: Failed with the capability's remediation text
    assert!(!denied.is_success());
    let notice = denied.notice().unwrap();
    assert_eq!(notice.body, Capability::Microphone.remediation());

    // Given/When: Upload failure
    let failed = SessionOutcome::UploadFailed {
        message: "service unreachable".to_string(),
    };

    // Then: Message included
    assert!(failed.notice().unwrap().body.contains("service unreachable"));
}

/// WHAT: Shutdown cancellation is quiet, timeout and revocation cancellations are not
/// WHY: Quitting the app should not pop up errors
#[test]
fn given_cancellations_when_classifying_then_only_shutdown_is_quiet() {
    let shutdown = SessionOutcome::Cancelled {
        reason: CancelReason::Shutdown,
    };
    let timeout = SessionOutcome::Cancelled {
        reason: CancelReason::RecordingTimeout,
    };
    let revoked = SessionOutcome::Cancelled {
        reason: CancelReason::PermissionRevoked,
    };
    assert!(shutdown.notice().is_none());
    assert!(timeout.notice().is_some());
    assert!(revoked.notice().is_some());
    assert!(!shutdown.is_success());
}
