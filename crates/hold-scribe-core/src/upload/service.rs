use crate::{CoreResult, audio::AudioSnippet, audio::wav::WAV_MEDIA_TYPE, upload::normalize_media_type};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JSON metadata sent alongside the audio bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    /// Stable across retries.
    pub request_id: Uuid,
    /// Normalized MIME type of `audio`.
    pub media_type: String,
    /// Recorded length.
    pub duration_ms: u64,
    /// Language hint; the service auto-detects when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One submission to the transcription service.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Encoded audio.
    pub audio: Vec<u8>,
    /// Correlation and format details.
    pub metadata: UploadMetadata,
}

impl UploadRequest {
    /// Build a request, normalizing `media_type`.
    pub fn new(request_id: Uuid, audio: Vec<u8>, media_type: &str, duration_ms: u64) -> Self {
        Self {
            audio,
            metadata: UploadMetadata {
                request_id,
                media_type: normalize_media_type(media_type),
                duration_ms,
                language: None,
            },
        }
    }

    /// Attach a language hint.
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.metadata.language = language;
        self
    }

    /// WAV-encode a finalized snippet.
    ///
    /// # Errors
    ///
    /// Fails if the snippet cannot be encoded.
    pub fn from_snippet(snippet: &AudioSnippet) -> CoreResult<Self> {
        Ok(Self::new(
            snippet.request_id(),
            snippet.to_wav()?,
            WAV_MEDIA_TYPE,
            snippet.duration_ms(),
        ))
    }

    /// Correlation id.
    pub fn request_id(&self) -> Uuid {
        self.metadata.request_id
    }
}

/// Body returned by the transcription service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Whether the service accepted and processed the audio.
    pub ok: bool,
    /// Recognized text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Recognizer confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Reason when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl UploadResponse {
    /// Successful response carrying `transcript`.
    pub fn transcript(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            ok: true,
            transcript: Some(text.into()),
            confidence,
            error_message: None,
        }
    }
}

/// Why a single attempt did not produce a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The service could not be reached. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The attempt exceeded its time budget. Retryable.
    #[error("request timed out")]
    Timeout,

    /// The service answered with an error status or unusable body. Terminal.
    #[error("rejected ({status:?}): {message}")]
    Rejected {
        /// HTTP status, when there was one.
        status: Option<u16>,
        /// Service or client message.
        message: String,
    },
}

impl TransportError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Network(_) | TransportError::Timeout)
    }
}

/// The external transcription backend.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Submit one request. Implementations must not retry internally.
    async fn transcribe(&self, request: &UploadRequest) -> Result<UploadResponse, TransportError>;
}
