use crate::permissions::Capability;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;
use uuid::Uuid;

/// Dictation lifecycle errors with source location tracking.
#[derive(Error, Debug)]
pub enum DictationError {
    /// An OS capability required for dictation is not authorized.
    #[error("Permission denied for {capability} {location}")]
    PermissionDenied {
        /// The capability that was refused.
        capability: Capability,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The microphone is missing, busy, or failed to start or flush.
    #[error("Capture unavailable: {reason} {location}")]
    CaptureUnavailable {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Every upload attempt failed with a network or timeout error.
    #[error("Upload failed after {attempts} attempt(s): {reason} {location}")]
    UploadNetworkFailure {
        /// Number of attempts made, never above the configured cap.
        attempts: u32,
        /// Last transport error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The transcription service refused the snippet. Never retried.
    #[error("Upload rejected: {message} {location}")]
    UploadRejected {
        /// Message reported by the service.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A bus frame could not be decoded into a valid envelope.
    #[error("Malformed event envelope: {reason} {location}")]
    MalformedEnvelope {
        /// Why decoding failed.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The short-clip fallback queue did not accept a job.
    #[error("Fallback enqueue failed: {message} {location}")]
    FallbackEnqueueFailed {
        /// Human-readable reason shown to the user.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Text could not be written into the focused target.
    #[error("Insertion failed for {request_id}: {reason} {location}")]
    InsertionFailed {
        /// Session the insertion belonged to.
        request_id: Uuid,
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A shortcut definition could not be parsed.
    #[error("Invalid shortcut '{combo}': {reason} {location}")]
    InvalidShortcut {
        /// The offending definition.
        combo: String,
        /// Why it was rejected.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The other side of a channel has gone away.
    #[error("Channel closed: {channel} {location}")]
    ChannelClosed {
        /// Name of the channel.
        channel: &'static str,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The session was cancelled while the operation was in flight.
    #[error("Cancelled: {request_id} {location}")]
    Cancelled {
        /// Session that was cancelled.
        request_id: Uuid,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// IO error from clip persistence.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl DictationError {
    /// Shorthand for a [`DictationError::ChannelClosed`] at the caller's location.
    #[track_caller]
    pub fn channel_closed(channel: &'static str) -> Self {
        DictationError::ChannelClosed {
            channel,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Shorthand for a [`DictationError::CaptureUnavailable`] at the caller's location.
    #[track_caller]
    pub fn capture_unavailable(reason: impl Into<String>) -> Self {
        DictationError::CaptureUnavailable {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Shorthand for a [`DictationError::Cancelled`] at the caller's location.
    #[track_caller]
    pub fn cancelled(request_id: Uuid) -> Self {
        DictationError::Cancelled {
            request_id,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for DictationError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        DictationError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`DictationError`].
pub type Result<T> = StdResult<T, DictationError>;
