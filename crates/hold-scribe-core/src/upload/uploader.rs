use crate::{
    CoreResult, DictationError,
    upload::{TranscriptionService, TransportError, UploadJob, UploadRequest, UploadResponse},
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Attempt cap, per-attempt timeout and first backoff delay.
///
/// The backoff doubles after each failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least one is always made.
    pub max_attempts: u32,
    /// Budget for a single attempt.
    pub attempt_timeout: Duration,
    /// Delay before the second attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(15),
            backoff: Duration::from_millis(250),
        }
    }
}

/// A successful upload, classified for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Usable text.
    Transcript {
        /// Trimmed transcript.
        text: String,
        /// Confidence reported by the service.
        confidence: Option<f32>,
    },
    /// Empty transcript or confidence under the threshold. Not an error;
    /// the caller routes it to the short-clip fallback.
    EmptyOrLowConfidence {
        /// Confidence reported by the service.
        confidence: Option<f32>,
    },
}

/// Uploads snippets with bounded retry on network and timeout errors.
#[derive(Clone)]
pub struct SnippetUploader {
    service: Arc<dyn TranscriptionService>,
    policy: RetryPolicy,
    min_confidence: f32,
}

impl SnippetUploader {
    /// Create an uploader. Responses below `min_confidence` are treated as
    /// low-confidence.
    pub fn new(service: Arc<dyn TranscriptionService>, policy: RetryPolicy, min_confidence: f32) -> Self {
        Self {
            service,
            policy,
            min_confidence,
        }
    }

    /// Retry policy in effect.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submit `request`, retrying transient failures with the same request id.
    ///
    /// `job` tracks status and attempts for the caller.
    ///
    /// # Errors
    ///
    /// - [`DictationError::UploadRejected`] on the first terminal response.
    /// - [`DictationError::UploadNetworkFailure`] once the attempt cap is used up.
    /// - [`DictationError::Cancelled`] if `cancel` fires first.
    #[instrument(skip(self, job, request, cancel), fields(request_id = %request.request_id()))]
    pub async fn upload(
        &self,
        job: &mut UploadJob,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> CoreResult<UploadOutcome> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.policy.backoff;

        loop {
            job.begin_attempt();
            let attempt = job.attempt();

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    job.fail("cancelled");
                    return Err(DictationError::cancelled(job.request_id()));
                }
                result = tokio::time::timeout(self.policy.attempt_timeout, self.service.transcribe(request)) => {
                    result.unwrap_or(Err(TransportError::Timeout))
                }
            };

            match result {
                Ok(response) if response.ok => {
                    job.succeed();
                    info!(attempt, "Upload succeeded");
                    return Ok(self.classify(response));
                }
                Ok(response) => {
                    let message = response
                        .error_message
                        .unwrap_or_else(|| "Transcription service returned ok=false".to_string());
                    job.fail(message.clone());
                    warn!(attempt, message = %message, "Upload rejected");
                    return Err(DictationError::UploadRejected {
                        message,
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                Err(e) if !e.is_retryable() => {
                    let message = match e {
                        TransportError::Rejected { message, .. } => message,
                        other => other.to_string(),
                    };
                    job.fail(message.clone());
                    warn!(attempt, message = %message, "Upload rejected");
                    return Err(DictationError::UploadRejected {
                        message,
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                Err(e) => {
                    job.record_error(e.to_string());
                    if attempt >= max_attempts {
                        job.fail(e.to_string());
                        warn!(attempts = attempt, error = %e, "Upload attempts exhausted");
                        return Err(DictationError::UploadNetworkFailure {
                            attempts: attempt,
                            reason: e.to_string(),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }

                    warn!(attempt, error = %e, backoff_ms = backoff.as_millis(), "Upload attempt failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            job.fail("cancelled");
                            return Err(DictationError::cancelled(job.request_id()));
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }

    fn classify(&self, response: UploadResponse) -> UploadOutcome {
        let confidence = response.confidence;
        let text = response.transcript.unwrap_or_default().trim().to_string();

        let low_confidence = confidence.is_some_and(|c| c < self.min_confidence);
        if text.is_empty() || low_confidence {
            UploadOutcome::EmptyOrLowConfidence { confidence }
        } else {
            UploadOutcome::Transcript { text, confidence }
        }
    }
}
