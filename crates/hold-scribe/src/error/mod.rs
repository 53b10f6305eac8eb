use hold_scribe_core::DictationError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the hold-scribe binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from the dictation core.
    #[error("Dictation error: {source} {location}")]
    Dictation {
        /// The underlying core error.
        #[source]
        source: DictationError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// The global key hook could not be installed or stopped unexpectedly.
    #[error("Key hook failed: {reason} {location}")]
    KeyHookFailed {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Failed to read or write the clipboard.
    #[error("Clipboard error: {reason} {location}")]
    ClipboardError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Failed to simulate keystrokes.
    #[error("Keystroke injection failed: {reason} {location}")]
    InjectionFailed {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading, saving, or validation error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From<DictationError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<DictationError> for AppError {
    #[track_caller]
    fn from(source: DictationError) -> Self {
        AppError::Dictation {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl AppError {
    /// Keystroke injection failure recorded at the caller.
    #[track_caller]
    pub(crate) fn injection(reason: impl Into<String>) -> Self {
        AppError::InjectionFailed {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Clipboard failure recorded at the caller.
    #[track_caller]
    pub(crate) fn clipboard(reason: impl Into<String>) -> Self {
        AppError::ClipboardError {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
