use crate::session::{CancelReason, SessionOutcome};

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// A cancellation token that remembers why it fired. The first reason wins.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionCancel {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl SessionCancel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The outcome a pipeline reports after being cancelled.
    pub(crate) fn outcome(&self) -> SessionOutcome {
        SessionOutcome::Cancelled {
            reason: self.reason.get().copied().unwrap_or(CancelReason::Shutdown),
        }
    }
}
