//! Privileged context: key hook events in, lifecycle events out.
//!
//! Runs the shortcut matcher and the permission gate, and serves keystroke
//! requests from the UI context. Nothing here touches the microphone or the
//! session; everything the UI needs to know crosses the bus.

use crate::{AppError, AppResult, KeystrokeInjector};

use std::sync::Arc;

use hold_scribe_core::{
    bus::{BusReceiver, BusSender, ControlEvent, LifecycleEvent, PermissionPayload, PressPayload},
    clock::Timestamp,
    focus::{FocusTracker, TargetIdentity},
    insertion::{KeystrokeAck, KeystrokeRequests, PendingKeystroke},
    keys::{MatcherTransition, RawKeyEvent, ShortcutMatcher},
    permissions::{AuthStatus, Capability, GateDecision, PermissionGate, PermissionProvider},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Channels the privileged context listens on.
pub struct PrivilegedInputs {
    /// Raw events from the key hook.
    pub keys: mpsc::Receiver<RawKeyEvent>,
    /// Requests from the UI context.
    pub control: BusReceiver<ControlEvent>,
    /// Text to inject into other applications.
    pub keystrokes: KeystrokeRequests,
}

/// Matcher, gate and injector for one shortcut.
pub struct PrivilegedContext<P> {
    matcher: ShortcutMatcher,
    gate: PermissionGate<P>,
    lifecycle: BusSender<LifecycleEvent>,
    focus: FocusTracker,
    injector: Arc<dyn KeystrokeInjector>,
    /// Press whose start was forwarded and whose end has not been.
    forwarded: Option<Uuid>,
}

impl<P: PermissionProvider> PrivilegedContext<P> {
    /// Create a context publishing on `lifecycle`.
    pub fn new(
        matcher: ShortcutMatcher,
        gate: PermissionGate<P>,
        lifecycle: BusSender<LifecycleEvent>,
        focus: FocusTracker,
        injector: Arc<dyn KeystrokeInjector>,
    ) -> Self {
        Self {
            matcher,
            gate,
            lifecycle,
            focus,
            injector,
            forwarded: None,
        }
    }

    /// Run until shutdown is signalled or the key hook stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the lifecycle bus closes, since the UI context is
    /// gone and there is nobody left to dictate to.
    #[instrument(skip_all)]
    pub async fn run(
        mut self,
        inputs: PrivilegedInputs,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> AppResult<()> {
        let PrivilegedInputs {
            mut keys,
            mut control,
            mut keystrokes,
        } = inputs;
        info!(combo = %self.matcher.combo(), "Privileged context started");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Privileged context shutting down");
                    break;
                }
                event = keys.recv() => match event {
                    Some(event) => {
                        for transition in self.matcher.on_event(&event) {
                            self.on_transition(transition).await?;
                        }
                    }
                    None => {
                        warn!("Key hook stopped delivering events");
                        break;
                    }
                },
                Some(event) = control.recv() => self.on_control(event),
                Some(pending) = keystrokes.recv() => self.on_keystroke(pending).await,
            }
        }

        Ok(())
    }

    async fn on_transition(&mut self, transition: MatcherTransition) -> AppResult<()> {
        match transition {
            MatcherTransition::PressStart {
                request_id,
                timestamp,
            } => self.on_press_start(request_id, timestamp).await,
            MatcherTransition::PressEnd {
                request_id,
                timestamp,
            } => self.on_press_end(request_id, timestamp).await,
        }
    }

    #[instrument(skip(self, timestamp))]
    async fn on_press_start(&mut self, request_id: Uuid, timestamp: Timestamp) -> AppResult<()> {
        match self.gate.authorize().await {
            GateDecision::Allowed { newly_granted } => {
                for capability in newly_granted {
                    let payload = permission_payload(request_id, capability);
                    self.publish(LifecycleEvent::PermissionGranted { payload }).await?;
                }
                self.publish(LifecycleEvent::PressStart {
                    payload: PressPayload {
                        request_id,
                        timestamp,
                    },
                })
                .await?;
                self.forwarded = Some(request_id);
                debug!("Press-start forwarded");
            }
            GateDecision::Denied { capability } => {
                warn!(capability = %capability, "Press refused, permission denied");
                let payload = permission_payload(request_id, capability);
                self.publish(LifecycleEvent::PermissionDenied { payload }).await?;
                self.forwarded = None;
            }
        }
        Ok(())
    }

    #[instrument(skip(self, timestamp))]
    async fn on_press_end(&mut self, request_id: Uuid, timestamp: Timestamp) -> AppResult<()> {
        if self.forwarded != Some(request_id) {
            debug!("Press-end for a press that was never forwarded, ignored");
            return Ok(());
        }
        self.forwarded = None;

        // The microphone may have been revoked while the key was held.
        let event = match self.gate.recheck(Capability::Microphone).await {
            AuthStatus::Denied => {
                warn!("Microphone revoked during press");
                LifecycleEvent::PermissionDenied {
                    payload: permission_payload(request_id, Capability::Microphone),
                }
            }
            _ => LifecycleEvent::PressEnd {
                payload: PressPayload {
                    request_id,
                    timestamp,
                },
            },
        };
        self.publish(event).await
    }

    fn on_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::InvalidatePermissions { payload } => {
                info!(request_id = %payload.request_id, capability = %payload.capability, "Permission recheck requested");
                self.gate.invalidate();
            }
        }
    }

    /// Re-check focus, inject, and acknowledge.
    #[instrument(skip(self, pending), fields(request_id = %pending.request().request_id))]
    async fn on_keystroke(&self, pending: PendingKeystroke) {
        let request = pending.request().clone();

        let still_focused = self
            .focus
            .current()
            .is_some_and(|current| current.identity() == &TargetIdentity::External(request.target));
        if !still_focused {
            warn!(target = %request.target, "Focus moved before injection");
            pending.acknowledge(KeystrokeAck::TargetMismatch);
            return;
        }

        let injector = Arc::clone(&self.injector);
        let text = request.text;
        let ack = match tokio::task::spawn_blocking(move || injector.inject(&text)).await {
            Ok(Ok(())) => KeystrokeAck::Injected,
            Ok(Err(
                AppError::InjectionFailed { reason, .. } | AppError::ClipboardError { reason, .. },
            )) => KeystrokeAck::Failed {
                error_message: reason,
            },
            Ok(Err(other)) => KeystrokeAck::Failed {
                error_message: other.to_string(),
            },
            Err(e) => KeystrokeAck::Failed {
                error_message: format!("Injection task panicked: {}", e),
            },
        };
        pending.acknowledge(ack);
    }

    async fn publish(&self, event: LifecycleEvent) -> AppResult<()> {
        self.lifecycle.send(event).await?;
        Ok(())
    }
}

fn permission_payload(request_id: Uuid, capability: Capability) -> PermissionPayload {
    PermissionPayload {
        request_id,
        timestamp: Timestamp::now(),
        capability,
    }
}
