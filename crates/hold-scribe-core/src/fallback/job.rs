use crate::clock::Timestamp;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fallback job lifecycle: `queued → processing → succeeded | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackJobStatus {
    /// Accepted, waiting for the worker.
    Queued,
    /// The worker is replaying the clip.
    Processing,
    /// Replay finished; the transcript may still be empty.
    Succeeded,
    /// Replay or enqueue failed, see `errorMessage`.
    Failed,
}

impl FallbackJobStatus {
    /// Whether no further transitions will follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, FallbackJobStatus::Succeeded | FallbackJobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: FallbackJobStatus) -> bool {
        use FallbackJobStatus::*;
        matches!(
            (self, next),
            (Queued, Processing) | (Queued, Failed) | (Processing, Succeeded) | (Processing, Failed)
        )
    }
}

/// Request to re-process a persisted clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackRequest {
    /// Identity of the clip; the originating session's request id.
    pub clip_id: Uuid,
    /// WAV file to replay.
    pub source_path: PathBuf,
    /// Language hint passed through to the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_language: Option<String>,
    /// Who asked, for logs.
    pub requested_by: String,
}

/// Acknowledgment and push-stream message. Every state change is published
/// in this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackStatus {
    /// False only when the job failed.
    pub ok: bool,
    /// Job identifier handed out at enqueue.
    pub job_id: Uuid,
    /// Clip this job replays.
    pub clip_id: Uuid,
    /// Current state.
    pub status: FallbackJobStatus,
    /// When the job was accepted.
    pub queued_at: Timestamp,
    /// When the job reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Rough time to completion, only while queued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_latency_ms: Option<u64>,
    /// Joined segment transcripts, once succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// A fallback job owned by the worker.
#[derive(Debug, Clone)]
pub struct ShortClipFallbackJob {
    job_id: Uuid,
    clip_id: Uuid,
    source_path: PathBuf,
    forced_language: Option<String>,
    status: FallbackJobStatus,
    queued_at: Timestamp,
    completed_at: Option<Timestamp>,
    error_message: Option<String>,
    transcript: Option<String>,
}

impl ShortClipFallbackJob {
    pub(crate) fn queued(request: FallbackRequest) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            clip_id: request.clip_id,
            source_path: request.source_path,
            forced_language: request.forced_language,
            status: FallbackJobStatus::Queued,
            queued_at: Timestamp::now(),
            completed_at: None,
            error_message: None,
            transcript: None,
        }
    }

    /// Job identifier.
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Clip identifier.
    pub fn clip_id(&self) -> Uuid {
        self.clip_id
    }

    /// Persisted clip.
    pub fn source_path(&self) -> &PathBuf {
        &self.source_path
    }

    /// Language hint.
    pub fn forced_language(&self) -> Option<&str> {
        self.forced_language.as_deref()
    }

    /// Current state.
    pub fn status(&self) -> FallbackJobStatus {
        self.status
    }

    pub(crate) fn start(&mut self) -> bool {
        self.advance(FallbackJobStatus::Processing)
    }

    pub(crate) fn succeed(&mut self, transcript: String) -> bool {
        self.transcript = Some(transcript);
        self.advance(FallbackJobStatus::Succeeded)
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        self.error_message = Some(message.into());
        self.advance(FallbackJobStatus::Failed)
    }

    fn advance(&mut self, next: FallbackJobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Timestamp::now());
        }
        true
    }

    /// Snapshot in wire shape.
    pub fn to_status(&self, estimated_latency_ms: Option<u64>) -> FallbackStatus {
        FallbackStatus {
            ok: self.status != FallbackJobStatus::Failed,
            job_id: self.job_id,
            clip_id: self.clip_id,
            status: self.status,
            queued_at: self.queued_at,
            completed_at: self.completed_at,
            error_message: self.error_message.clone(),
            estimated_latency_ms,
            transcript: self.transcript.clone(),
        }
    }
}
