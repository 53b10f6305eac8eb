use crate::{
    DictationError,
    audio::{ActiveRecording, AudioSnippet},
    fallback::{FallbackJobStatus, FallbackRequest, FallbackStatus, ShortClipFallbackCoordinator},
    focus::FocusSnapshot,
    insertion::{InsertionOutcome, TextInsertionExecutor},
    session::{SessionCancel, SessionOutcome},
    upload::{SnippetUploader, UploadJob, UploadOutcome, UploadRequest},
};

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const FALLBACK_REQUESTER: &str = "dictation-session";

/// Everything a session needs after the key is released.
#[derive(Clone)]
pub struct SessionServices {
    /// First-pass uploader.
    pub uploader: SnippetUploader,
    /// Short-clip fallback; `None` turns empty results straight into `NoSpeech`.
    pub fallback: Option<ShortClipFallbackCoordinator>,
    /// Writes the final transcript.
    pub executor: Arc<TextInsertionExecutor>,
    /// RMS below which a snippet counts as near-silent.
    pub silence_threshold: f32,
    /// Confidence a near-silent snippet's first-pass transcript must reach
    /// to be inserted; anything less, or no confidence at all, falls back.
    pub silent_min_confidence: f32,
}

/// What the post-release pipeline produced for one session.
#[derive(Debug, Clone)]
pub(crate) struct PipelineResult {
    pub(crate) outcome: SessionOutcome,
    pub(crate) upload_attempts: u32,
    pub(crate) near_silent: bool,
    pub(crate) fallback: Option<FallbackStatus>,
}

impl PipelineResult {
    fn new(outcome: SessionOutcome) -> Self {
        Self {
            outcome,
            upload_attempts: 0,
            near_silent: false,
            fallback: None,
        }
    }
}

enum Transcript {
    Text { text: String, via_fallback: bool },
    Empty,
}

impl SessionServices {
    /// Finalize, upload, fall back if needed, then insert.
    #[instrument(skip_all, fields(request_id = %recording.request_id()))]
    pub(crate) async fn run(
        &self,
        recording: ActiveRecording,
        snapshot: Option<FocusSnapshot>,
        cancel: SessionCancel,
    ) -> PipelineResult {
        let request_id = recording.request_id();

        // Dropping the recording on cancel releases the device.
        let snippet = tokio::select! {
            _ = cancel.token().cancelled() => return PipelineResult::new(cancel.outcome()),
            snippet = recording.finish() => snippet,
        };
        let snippet = match snippet {
            Ok(snippet) => snippet,
            Err(e) => {
                return PipelineResult::new(SessionOutcome::CaptureUnavailable {
                    reason: describe(&e),
                });
            }
        };

        let near_silent = snippet.is_near_silent(self.silence_threshold);
        debug!(
            duration_ms = snippet.duration_ms(),
            rms = snippet.rms(),
            near_silent,
            "Snippet ready for upload"
        );

        let mut result = PipelineResult::new(SessionOutcome::NoSpeech);
        result.near_silent = near_silent;

        let request = match UploadRequest::from_snippet(&snippet) {
            Ok(request) => request,
            Err(e) => {
                result.outcome = SessionOutcome::CaptureUnavailable {
                    reason: describe(&e),
                };
                return result;
            }
        };
        let mut job = UploadJob::new(request_id);
        let first_pass = self.uploader.upload(&mut job, &request, cancel.token()).await;
        result.upload_attempts = job.attempt();

        let transcript = match first_pass {
            Ok(UploadOutcome::Transcript { confidence, .. })
                if near_silent && !confidence.is_some_and(|c| c >= self.silent_min_confidence) =>
            {
                info!(?confidence, "Transcript of a near-silent snippet not trusted");
                match self.fall_back(&snippet, &cancel, &mut result).await {
                    Ok(transcript) => transcript,
                    Err(outcome) => {
                        result.outcome = outcome;
                        return result;
                    }
                }
            }
            Ok(UploadOutcome::Transcript { text, .. }) => Transcript::Text {
                text,
                via_fallback: false,
            },
            Ok(UploadOutcome::EmptyOrLowConfidence { confidence }) => {
                info!(?confidence, near_silent, "First pass empty or low confidence");
                match self.fall_back(&snippet, &cancel, &mut result).await {
                    Ok(transcript) => transcript,
                    Err(outcome) => {
                        result.outcome = outcome;
                        return result;
                    }
                }
            }
            Err(DictationError::Cancelled { .. }) => {
                result.outcome = cancel.outcome();
                return result;
            }
            Err(e) => {
                result.outcome = SessionOutcome::UploadFailed {
                    message: describe(&e),
                };
                return result;
            }
        };

        let (text, via_fallback) = match transcript {
            Transcript::Text { text, via_fallback } => (text, via_fallback),
            Transcript::Empty => {
                result.outcome = SessionOutcome::NoSpeech;
                return result;
            }
        };

        if cancel.is_cancelled() {
            result.outcome = cancel.outcome();
            return result;
        }

        result.outcome = match self
            .executor
            .insert(request_id, &text, snapshot.as_ref())
            .await
        {
            Ok(InsertionOutcome::Inserted) => SessionOutcome::Inserted {
                chars: text.chars().count(),
                via_fallback,
            },
            Ok(InsertionOutcome::TargetMismatch) => SessionOutcome::TargetMismatch,
            Err(e) => SessionOutcome::InsertionFailed {
                message: describe(&e),
            },
        };
        result
    }

    async fn fall_back(
        &self,
        snippet: &AudioSnippet,
        cancel: &SessionCancel,
        result: &mut PipelineResult,
    ) -> Result<Transcript, SessionOutcome> {
        let Some(fallback) = &self.fallback else {
            return Ok(Transcript::Empty);
        };
        let clip_id = snippet.request_id();

        let source_path = fallback
            .persist_clip(snippet)
            .await
            .map_err(|e| SessionOutcome::UploadFailed {
                message: format!("Could not save the recording for a retry: {}", describe(&e)),
            })?;

        let mut updates = fallback.subscribe(clip_id);
        let request = FallbackRequest {
            clip_id,
            source_path: source_path.clone(),
            forced_language: None,
            requested_by: FALLBACK_REQUESTER.to_string(),
        };

        let finished = match fallback.enqueue(request, cancel.token().clone()).await {
            Ok(ack) => {
                debug!(job_id = %ack.job_id, "Short-clip fallback queued");
                tokio::select! {
                    _ = cancel.token().cancelled() => None,
                    finished = updates.finished() => finished,
                }
            }
            Err(e) => {
                remove_clip(clip_id, &source_path).await;
                return Err(SessionOutcome::UploadFailed {
                    message: describe(&e),
                });
            }
        };
        remove_clip(clip_id, &source_path).await;

        let Some(status) = finished else {
            return Err(cancel.outcome());
        };
        result.fallback = Some(status.clone());

        match status.status {
            FallbackJobStatus::Succeeded => {
                let text = status.transcript.unwrap_or_default();
                if text.trim().is_empty() {
                    Ok(Transcript::Empty)
                } else {
                    Ok(Transcript::Text {
                        text,
                        via_fallback: true,
                    })
                }
            }
            _ if cancel.is_cancelled() => Err(cancel.outcome()),
            _ => Err(SessionOutcome::UploadFailed {
                message: status
                    .error_message
                    .unwrap_or_else(|| "The retry did not complete".to_string()),
            }),
        }
    }
}

/// User-facing text for an error, without the source location.
fn describe(error: &DictationError) -> String {
    match error {
        DictationError::CaptureUnavailable { reason, .. } => reason.clone(),
        DictationError::UploadNetworkFailure { attempts, reason, .. } => format!(
            "The transcription service could not be reached after {} attempt(s) ({})",
            attempts, reason
        ),
        DictationError::UploadRejected { message, .. } => {
            format!("The transcription service rejected the recording: {}", message)
        }
        DictationError::FallbackEnqueueFailed { message, .. } => message.clone(),
        DictationError::InsertionFailed { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

async fn remove_clip(clip_id: Uuid, path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(clip_id = %clip_id, error = %e, "Failed to remove fallback clip");
    }
}
