//! UI-context controller: turns lifecycle events into press sessions.
//!
//! Runs as one task. Each released press hands its recording to a spawned
//! pipeline and the result comes back on an internal channel, so the loop
//! keeps reacting to new events (and rejecting overlapping presses) while
//! uploads are in flight.

use crate::{
    DictationError,
    audio::{ActiveRecording, Recorder},
    bus::{BusReceiver, BusSender, ControlEvent, LifecycleEvent, PermissionPayload, PressPayload},
    clock::Timestamp,
    fallback::FallbackStatus,
    focus::{FocusSnapshot, FocusTracker},
    permissions::Capability,
    session::{
        CancelReason, PressSession, SessionCancel, SessionOutcome, SessionServices, SessionState,
        UserNotifier, pipeline::PipelineResult,
    },
};

use std::{future, sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const REPORT_CAPACITY: usize = 32;

/// Controller timing.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    /// Sessions still recording after this are cancelled.
    pub max_recording: Duration,
    /// Delay before asking the privileged context to forget a denial.
    pub permission_recheck: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_recording: Duration::from_secs(300),
            permission_recheck: Duration::from_secs(30),
        }
    }
}

/// Published once per session when it reaches `terminal`.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// The session as it ended.
    pub session: PressSession,
    /// State just before `terminal`: `succeeded` or `failed`.
    pub final_state: SessionState,
    /// How it ended.
    pub outcome: SessionOutcome,
    /// First-pass upload attempts.
    pub upload_attempts: u32,
    /// Whether the snippet was near-silent.
    pub near_silent: bool,
    /// Terminal fallback status, if a fallback ran.
    pub fallback: Option<FallbackStatus>,
}

struct ActiveSession {
    session: PressSession,
    snapshot: Option<FocusSnapshot>,
    recording: Option<ActiveRecording>,
    cancel: SessionCancel,
    deadline: Instant,
}

/// Owns the single active [`PressSession`].
pub struct DictationController {
    events: BusReceiver<LifecycleEvent>,
    control: BusSender<ControlEvent>,
    recorder: Recorder,
    focus: FocusTracker,
    services: SessionServices,
    notifier: Arc<dyn UserNotifier>,
    settings: ControllerSettings,
    active: Option<ActiveSession>,
    pipeline_tx: mpsc::UnboundedSender<(Uuid, PipelineResult)>,
    pipeline_rx: mpsc::UnboundedReceiver<(Uuid, PipelineResult)>,
    reports: broadcast::Sender<SessionReport>,
}

impl DictationController {
    /// Create a controller reading `events` and answering on `control`.
    pub fn new(
        events: BusReceiver<LifecycleEvent>,
        control: BusSender<ControlEvent>,
        recorder: Recorder,
        focus: FocusTracker,
        services: SessionServices,
        notifier: Arc<dyn UserNotifier>,
        settings: ControllerSettings,
    ) -> Self {
        let (pipeline_tx, pipeline_rx) = mpsc::unbounded_channel();
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        Self {
            events,
            control,
            recorder,
            focus,
            services,
            notifier,
            settings,
            active: None,
            pipeline_tx,
            pipeline_rx,
            reports,
        }
    }

    /// Stream of finished sessions. Subscribe before calling [`Self::run`].
    pub fn reports(&self) -> broadcast::Receiver<SessionReport> {
        self.reports.subscribe()
    }

    /// Process events until `shutdown` fires or the bus closes.
    #[instrument(skip_all)]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Dictation controller started");

        loop {
            let deadline = self
                .active
                .as_ref()
                .filter(|active| active.recording.is_some())
                .map(|active| active.deadline);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Dictation controller shutting down");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.on_event(event).await,
                    None => {
                        info!("Lifecycle bus closed");
                        break;
                    }
                },
                Some((request_id, result)) = self.pipeline_rx.recv() => {
                    self.on_pipeline_result(request_id, result);
                }
                _ = sleep_until_opt(deadline) => self.on_recording_timeout(),
            }
        }

        if self.active.is_some() {
            self.finish_active(
                SessionOutcome::Cancelled {
                    reason: CancelReason::Shutdown,
                },
                None,
            );
        }
        info!("Dictation controller stopped");
    }

    async fn on_event(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::PressStart { payload } => self.on_press_start(payload).await,
            LifecycleEvent::PressEnd { payload } => self.on_press_end(payload),
            LifecycleEvent::PermissionGranted { payload } => {
                info!(request_id = %payload.request_id, capability = %payload.capability, "Permission granted");
            }
            LifecycleEvent::PermissionDenied { payload } => self.on_permission_denied(payload),
        }
    }

    #[instrument(skip(self), fields(request_id = %payload.request_id))]
    async fn on_press_start(&mut self, payload: PressPayload) {
        if let Some(active) = &self.active {
            if active.session.request_id() == payload.request_id {
                debug!("Duplicate press-start ignored");
            } else {
                info!(
                    active = %active.session.request_id(),
                    state = ?active.session.state(),
                    "Press-start ignored, a session is already active"
                );
            }
            return;
        }

        let mut session = PressSession::new(payload.request_id, payload.timestamp);
        let snapshot = self.focus.capture();

        match self.recorder.open(payload.request_id).await {
            Ok(recording) => {
                session.transition(SessionState::Recording);
                self.active = Some(ActiveSession {
                    session,
                    snapshot,
                    recording: Some(recording),
                    cancel: SessionCancel::new(),
                    deadline: Instant::now() + self.settings.max_recording,
                });
                info!("Session recording");
            }
            Err(e) => {
                error!(error = %e, "Failed to open capture device");
                let reason = match e {
                    DictationError::CaptureUnavailable { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.active = Some(ActiveSession {
                    session,
                    snapshot,
                    recording: None,
                    cancel: SessionCancel::new(),
                    deadline: Instant::now(),
                });
                self.finish_active(SessionOutcome::CaptureUnavailable { reason }, None);
            }
        }
    }

    #[instrument(skip(self), fields(request_id = %payload.request_id))]
    fn on_press_end(&mut self, payload: PressPayload) {
        let Some(active) = self
            .active
            .as_mut()
            .filter(|active| active.session.request_id() == payload.request_id)
        else {
            debug!("Press-end for no active session ignored");
            return;
        };
        let Some(recording) = active.recording.take() else {
            debug!("Press-end after recording already ended ignored");
            return;
        };

        active.session.mark_released(payload.timestamp);
        active.session.transition(SessionState::Uploading);
        info!(
            held_ms = payload.timestamp.since(active.session.started_at()).as_millis(),
            "Press released, finalizing"
        );

        let services = self.services.clone();
        let snapshot = active.snapshot.clone();
        let cancel = active.cancel.clone();
        let results = self.pipeline_tx.clone();
        let request_id = payload.request_id;

        tokio::spawn(async move {
            let result = services.run(recording, snapshot, cancel).await;
            // The controller may have stopped; nothing left to report to.
            let _ = results.send((request_id, result));
        });
    }

    #[instrument(skip(self), fields(request_id = %payload.request_id, capability = %payload.capability))]
    fn on_permission_denied(&mut self, payload: PermissionPayload) {
        warn!("Permission denied");

        let matches = self
            .active
            .as_ref()
            .is_some_and(|active| active.session.request_id() == payload.request_id);

        let outcome = SessionOutcome::PermissionDenied {
            capability: payload.capability,
        };
        if matches {
            self.finish_active(outcome, None);
        } else {
            // Denied before a session existed; still tell the user.
            if let Some(notice) = outcome.notice() {
                self.notifier.notify(&notice);
            }
        }

        self.schedule_permission_recheck(payload.request_id, payload.capability);
    }

    fn on_pipeline_result(&mut self, request_id: Uuid, result: PipelineResult) {
        let current = self
            .active
            .as_ref()
            .is_some_and(|active| active.session.request_id() == request_id);
        if !current {
            debug!(request_id = %request_id, outcome = result.outcome.kind(), "Result for a finished session discarded");
            return;
        }
        let outcome = result.outcome.clone();
        self.finish_active(outcome, Some(result));
    }

    fn on_recording_timeout(&mut self) {
        warn!(
            max_recording_secs = self.settings.max_recording.as_secs(),
            "Recording exceeded maximum length"
        );
        self.finish_active(
            SessionOutcome::Cancelled {
                reason: CancelReason::RecordingTimeout,
            },
            None,
        );
    }

    /// End the active session: release the device, cancel pending work,
    /// notify, and publish the report.
    fn finish_active(&mut self, outcome: SessionOutcome, result: Option<PipelineResult>) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        match &outcome {
            SessionOutcome::Cancelled { reason } => active.cancel.cancel(*reason),
            SessionOutcome::PermissionDenied { .. } => {
                active.cancel.cancel(CancelReason::PermissionRevoked);
            }
            // Every other outcome comes from a pipeline that has already returned.
            _ => {}
        }
        if let Some(recording) = active.recording.take() {
            recording.abandon();
        }

        let final_state = if outcome.is_success() {
            SessionState::Succeeded
        } else {
            SessionState::Failed
        };
        active.session.mark_released(Timestamp::now());
        active.session.transition(final_state);
        active.session.transition(SessionState::Terminal);

        match &outcome {
            SessionOutcome::TargetMismatch => {
                warn!(request_id = %active.session.request_id(), "Session ended with target_mismatch, transcript dropped");
            }
            outcome if outcome.is_success() => {
                info!(request_id = %active.session.request_id(), outcome = outcome.kind(), "Session finished");
            }
            outcome => {
                warn!(request_id = %active.session.request_id(), outcome = ?outcome, "Session failed");
            }
        }

        if let Some(notice) = outcome.notice() {
            self.notifier.notify(&notice);
        }

        let (upload_attempts, near_silent, fallback) = result
            .map(|r| (r.upload_attempts, r.near_silent, r.fallback))
            .unwrap_or((0, false, None));

        // No subscribers is fine.
        let _ = self.reports.send(SessionReport {
            session: active.session,
            final_state,
            outcome,
            upload_attempts,
            near_silent,
            fallback,
        });
    }

    fn schedule_permission_recheck(&self, request_id: Uuid, capability: Capability) {
        let control = self.control.clone();
        let delay = self.settings.permission_recheck;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = ControlEvent::InvalidatePermissions {
                payload: PermissionPayload {
                    request_id,
                    timestamp: Timestamp::now(),
                    capability,
                },
            };
            if let Err(e) = control.send(event).await {
                debug!(error = %e, "Could not request permission recheck");
            }
        });
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
