use crate::permissions::Capability;

/// Why a session was cancelled rather than finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Still recording after the configured maximum.
    RecordingTimeout,
    /// The process is shutting down.
    Shutdown,
    /// A capability was revoked while the session was in flight.
    PermissionRevoked,
}

/// How a press session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Transcript written into the original target.
    Inserted {
        /// Characters inserted.
        chars: usize,
        /// Whether the text came from the short-clip fallback.
        via_fallback: bool,
    },
    /// Focus moved; the transcript was discarded.
    TargetMismatch,
    /// Both passes returned no usable text.
    NoSpeech,
    /// A capability was refused or revoked.
    PermissionDenied {
        /// The capability concerned.
        capability: Capability,
    },
    /// The microphone was missing, busy or failed to flush.
    CaptureUnavailable {
        /// Device failure.
        reason: String,
    },
    /// The transcription service could not produce a result.
    UploadFailed {
        /// Failure shown to the user.
        message: String,
    },
    /// Writing the text failed after the target matched.
    InsertionFailed {
        /// Failure shown to the user.
        message: String,
    },
    /// Abandoned before finishing.
    Cancelled {
        /// What cancelled it.
        reason: CancelReason,
    },
}

impl SessionOutcome {
    /// Outcomes that leave the session `succeeded`; everything else is `failed`.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SessionOutcome::Inserted { .. } | SessionOutcome::TargetMismatch | SessionOutcome::NoSpeech
        )
    }

    /// Short machine-readable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionOutcome::Inserted { .. } => "inserted",
            SessionOutcome::TargetMismatch => "target_mismatch",
            SessionOutcome::NoSpeech => "empty_or_low_confidence_result",
            SessionOutcome::PermissionDenied { .. } => "permission_denied",
            SessionOutcome::CaptureUnavailable { .. } => "capture_unavailable",
            SessionOutcome::UploadFailed { .. } => "upload_network_failure",
            SessionOutcome::InsertionFailed { .. } => "insertion_failed",
            SessionOutcome::Cancelled { .. } => "cancelled",
        }
    }

    /// Notice to show the user, if any.
    ///
    /// `TargetMismatch` is deliberately silent: a changed focus is usually
    /// intentional and the transcript is simply dropped.
    pub fn notice(&self) -> Option<UserNotice> {
        let (title, body) = match self {
            SessionOutcome::Inserted { .. }
            | SessionOutcome::TargetMismatch
            | SessionOutcome::Cancelled {
                reason: CancelReason::Shutdown,
            } => return None,
            SessionOutcome::NoSpeech => (
                "No speech detected",
                "Nothing was transcribed. Hold the shortcut a little longer and speak clearly."
                    .to_string(),
            ),
            SessionOutcome::PermissionDenied { capability } => {
                ("Permission needed", capability.remediation().to_string())
            }
            SessionOutcome::CaptureUnavailable { reason } => (
                "Microphone unavailable",
                format!("Recording could not start: {}", reason),
            ),
            SessionOutcome::UploadFailed { message } => (
                "Transcription failed",
                format!("No text was inserted. {}", message),
            ),
            SessionOutcome::InsertionFailed { message } => (
                "Could not insert text",
                format!("The transcript could not be typed: {}", message),
            ),
            SessionOutcome::Cancelled {
                reason: CancelReason::RecordingTimeout,
            } => (
                "Recording stopped",
                "The shortcut was held past the maximum recording length.".to_string(),
            ),
            SessionOutcome::Cancelled {
                reason: CancelReason::PermissionRevoked,
            } => (
                "Recording stopped",
                "A permission was revoked while dictating; nothing was inserted.".to_string(),
            ),
        };
        Some(UserNotice {
            title: title.to_string(),
            body,
        })
    }
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    /// Headline.
    pub title: String,
    /// Explanation and remediation.
    pub body: String,
}

/// Presents notices to the user, e.g. as desktop notifications.
pub trait UserNotifier: Send + Sync {
    /// Show `notice`. Must not block for long.
    fn notify(&self, notice: &UserNotice);
}
