//! Request/acknowledge channel to the privileged keystroke injector.
//!
//! The caller never assumes an injection happened: every request carries a
//! one-shot reply, and [`KeystrokeBridge::dispatch`] waits for it with a
//! timeout.

use crate::{CoreResult, DictationError, focus::ExternalTargetId};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

/// Text to type into an external target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystrokeRequest {
    /// Session the text belongs to.
    pub request_id: Uuid,
    /// Text to inject.
    pub text: String,
    /// Element that must still have focus when injecting.
    pub target: ExternalTargetId,
}

/// Privileged side's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum KeystrokeAck {
    /// The text was injected.
    Injected,
    /// Focus moved before injection; nothing was typed.
    TargetMismatch,
    /// Injection was attempted and failed.
    Failed {
        /// Reason reported by the injector.
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

/// A request awaiting its acknowledgment.
#[derive(Debug)]
pub struct PendingKeystroke {
    request: KeystrokeRequest,
    reply: oneshot::Sender<KeystrokeAck>,
}

impl PendingKeystroke {
    /// What to inject.
    pub fn request(&self) -> &KeystrokeRequest {
        &self.request
    }

    /// Send the acknowledgment. A caller that already gave up is ignored.
    pub fn acknowledge(self, ack: KeystrokeAck) {
        if self.reply.send(ack).is_err() {
            debug!(request_id = %self.request.request_id, "Keystroke ack arrived after caller gave up");
        }
    }
}

/// UI-side handle for dispatching keystroke requests.
#[derive(Debug, Clone)]
pub struct KeystrokeBridge {
    tx: mpsc::Sender<PendingKeystroke>,
}

impl KeystrokeBridge {
    /// Send `request` and wait up to `timeout` for its acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::InsertionFailed`] if the privileged side is
    /// gone, drops the request, or does not answer in time.
    pub async fn dispatch(
        &self,
        request: KeystrokeRequest,
        timeout: Duration,
    ) -> CoreResult<KeystrokeAck> {
        let caller = Location::caller();
        let request_id = request.request_id;
        let failed = |reason: &str| DictationError::InsertionFailed {
            request_id,
            reason: reason.to_string(),
            location: ErrorLocation::from(caller),
        };

        let (reply, ack_rx) = oneshot::channel();
        self.tx
            .send(PendingKeystroke { request, reply })
            .await
            .map_err(|_| failed("Keystroke injector is not running"))?;

        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(ack)) => Ok(ack),
            Ok(Err(_)) => Err(failed("Keystroke injector dropped the request")),
            Err(_) => {
                warn!(request_id = %request_id, timeout_ms = timeout.as_millis(), "Keystroke ack timed out");
                Err(failed("Keystroke injector did not acknowledge in time"))
            }
        }
    }
}

/// Privileged-side stream of requests.
#[derive(Debug)]
pub struct KeystrokeRequests {
    rx: mpsc::Receiver<PendingKeystroke>,
}

impl KeystrokeRequests {
    /// Next request, or `None` once every bridge handle is dropped.
    pub async fn recv(&mut self) -> Option<PendingKeystroke> {
        self.rx.recv().await
    }
}

/// Create a bridge with room for `capacity` unanswered requests.
pub fn keystroke_bridge(capacity: usize) -> (KeystrokeBridge, KeystrokeRequests) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (KeystrokeBridge { tx }, KeystrokeRequests { rx })
}
