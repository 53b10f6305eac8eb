use crate::clock::Timestamp;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// Session lifecycle.
///
/// `idle → recording → uploading → (succeeded | failed) → terminal`, with
/// `failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    /// Created, device not yet open.
    Idle,
    /// The microphone is owned by this session.
    Recording,
    /// Snippet finalized; upload, fallback and insertion in progress.
    Uploading,
    /// Finished without error.
    Succeeded,
    /// Finished with an error or was cancelled.
    Failed,
    /// Torn down.
    Terminal,
}

impl SessionState {
    /// Whether `self → next` is allowed.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Recording)
                | (Idle, Failed)
                | (Recording, Uploading)
                | (Recording, Failed)
                | (Uploading, Succeeded)
                | (Uploading, Failed)
                | (Succeeded, Terminal)
                | (Failed, Terminal)
        )
    }

    /// Any state other than `terminal`.
    pub fn is_active(self) -> bool {
        self != SessionState::Terminal
    }
}

/// One hold-speak-release episode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PressSession {
    request_id: Uuid,
    started_at: Timestamp,
    ended_at: Option<Timestamp>,
    state: SessionState,
}

impl PressSession {
    /// New idle session for a press that started at `started_at`.
    pub fn new(request_id: Uuid, started_at: Timestamp) -> Self {
        Self {
            request_id,
            started_at,
            ended_at: None,
            state: SessionState::Idle,
        }
    }

    /// Press identifier.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Press-start time.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Press-end time, once released.
    pub fn ended_at(&self) -> Option<Timestamp> {
        self.ended_at
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn mark_released(&mut self, at: Timestamp) {
        self.ended_at.get_or_insert(at);
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(
                request_id = %self.request_id,
                from = ?self.state,
                to = ?next,
                "Ignoring invalid session transition"
            );
            return false;
        }
        self.state = next;
        true
    }
}
