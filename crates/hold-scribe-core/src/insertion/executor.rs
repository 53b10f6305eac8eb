use crate::{
    CoreResult, DictationError,
    focus::{FocusSnapshot, FocusTracker, TargetIdentity},
    insertion::{KeystrokeAck, KeystrokeBridge, KeystrokeRequest},
};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// How an insertion attempt ended, when it did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionOutcome {
    /// Text was written into the original target.
    Inserted,
    /// Focus moved away; nothing was written anywhere.
    TargetMismatch,
}

/// Re-validates focus and writes the transcript.
pub struct TextInsertionExecutor {
    focus: FocusTracker,
    bridge: KeystrokeBridge,
    ack_timeout: Duration,
}

impl TextInsertionExecutor {
    /// Executor that re-checks focus through `focus` and reaches external
    /// targets through `bridge`.
    pub fn new(focus: FocusTracker, bridge: KeystrokeBridge, ack_timeout: Duration) -> Self {
        Self {
            focus,
            bridge,
            ack_timeout,
        }
    }

    /// Insert `text` if the target captured in `snapshot` still has focus.
    ///
    /// A missing snapshot, a changed focus, or a target that no longer
    /// exists all yield [`InsertionOutcome::TargetMismatch`] without writing.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::InsertionFailed`] when the target matched
    /// but writing failed or was not acknowledged.
    #[instrument(skip(self, text, snapshot), fields(text_len = text.len()))]
    pub async fn insert(
        &self,
        request_id: Uuid,
        text: &str,
        snapshot: Option<&FocusSnapshot>,
    ) -> CoreResult<InsertionOutcome> {
        let Some(snapshot) = snapshot else {
            warn!(request_id = %request_id, "No focus target was captured at press start, skipping insertion");
            return Ok(InsertionOutcome::TargetMismatch);
        };

        let current = self.focus.current();
        let matches = current
            .as_ref()
            .is_some_and(|current| snapshot.same_target(current));
        if !matches {
            warn!(
                request_id = %request_id,
                expected = ?snapshot.identity(),
                actual = ?current.as_ref().map(FocusSnapshot::identity),
                "Focus changed since press start, skipping insertion"
            );
            return Ok(InsertionOutcome::TargetMismatch);
        }

        match snapshot.identity() {
            TargetIdentity::InProcess(surface) => {
                let Some(surface) = surface.upgrade() else {
                    warn!(request_id = %request_id, "Target surface was dropped, skipping insertion");
                    return Ok(InsertionOutcome::TargetMismatch);
                };
                surface
                    .insert_text(snapshot.cursor(), text)
                    .map_err(|e| DictationError::InsertionFailed {
                        request_id,
                        reason: e.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    })?;
            }
            TargetIdentity::External(target) => {
                let request = KeystrokeRequest {
                    request_id,
                    text: text.to_string(),
                    target: *target,
                };
                match self.bridge.dispatch(request, self.ack_timeout).await? {
                    KeystrokeAck::Injected => {}
                    KeystrokeAck::TargetMismatch => {
                        warn!(request_id = %request_id, "Focus changed before injection, skipping insertion");
                        return Ok(InsertionOutcome::TargetMismatch);
                    }
                    KeystrokeAck::Failed { error_message } => {
                        return Err(DictationError::InsertionFailed {
                            request_id,
                            reason: error_message,
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                }
            }
        }

        info!(request_id = %request_id, "Transcript inserted");
        Ok(InsertionOutcome::Inserted)
    }
}
