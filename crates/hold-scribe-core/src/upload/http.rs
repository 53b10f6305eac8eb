use crate::{
    CoreResult, DictationError,
    upload::{TranscriptionService, TransportError, UploadRequest, UploadResponse},
};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument};

const ERROR_PREVIEW_CHARS: usize = 240;

/// Multipart HTTP client for the transcription service.
///
/// Sends part `audio` (the encoded bytes with their normalized MIME type)
/// and part `metadata` (JSON [`crate::upload::UploadMetadata`]). Timeouts are
/// applied per attempt by the uploader, not by the client.
pub struct HttpTranscriptionService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTranscriptionService {
    /// Client posting to `endpoint`, with an optional bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::UploadNetworkFailure`] if the HTTP client
    /// cannot be initialized (for example, no TLS backend).
    #[track_caller]
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DictationError::UploadNetworkFailure {
                attempts: 0,
                reason: format!("Could not create HTTP client: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    fn truncate(text: &str) -> String {
        let mut preview: String = text.chars().take(ERROR_PREVIEW_CHARS).collect();
        if text.chars().count() > ERROR_PREVIEW_CHARS {
            preview.push('…');
        }
        preview
    }
}

#[async_trait]
impl TranscriptionService for HttpTranscriptionService {
    #[instrument(skip(self, request), fields(request_id = %request.request_id()))]
    async fn transcribe(&self, request: &UploadRequest) -> Result<UploadResponse, TransportError> {
        let rejected = |message: String| TransportError::Rejected {
            status: None,
            message,
        };

        let metadata =
            serde_json::to_string(&request.metadata).map_err(|e| rejected(e.to_string()))?;

        let audio_part = Part::bytes(request.audio.clone())
            .file_name(format!("{}.wav", request.request_id()))
            .mime_str(&request.metadata.media_type)
            .map_err(|e| rejected(format!("Invalid media type: {}", e)))?;
        let metadata_part = Part::text(metadata)
            .mime_str("application/json")
            .map_err(|e| rejected(e.to_string()))?;

        let form = Form::new()
            .part("audio", audio_part)
            .part("metadata", metadata_part);

        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(status = %status, "Transcription service responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the service's own message when the body follows the response shape.
            let message = serde_json::from_str::<UploadResponse>(&body)
                .ok()
                .and_then(|r| r.error_message)
                .unwrap_or_else(|| Self::truncate(&body));
            return Err(TransportError::Rejected {
                status: Some(status.as_u16()),
                message,
            });
        }

        response.json::<UploadResponse>().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Rejected {
                    status: Some(status.as_u16()),
                    message: format!("Unreadable response: {}", e),
                }
            }
        })
    }
}
