use crate::{
    AppError, AppResult, DesktopNotifier, EnigoInjector, SystemFocus, SystemPermissions,
    config::Config,
    privileged::{PrivilegedContext, PrivilegedInputs},
};

use std::{panic::Location, sync::Arc, thread, time::Duration};

use error_location::ErrorLocation;
use hold_scribe_core::{
    audio::{CpalCaptureDevice, Recorder},
    bus::{self, ControlEvent, LifecycleEvent},
    fallback::ShortClipFallbackCoordinator,
    focus::FocusTracker,
    insertion::{TextInsertionExecutor, keystroke_bridge},
    keys::{KeyEventSink, KeyEventSource, ShortcutCombo, ShortcutMatcher},
    permissions::PermissionGate,
    session::{DictationController, SessionServices},
    upload::{HttpTranscriptionService, SnippetUploader},
};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const BUS_CAPACITY: usize = 32;
const KEY_EVENT_CAPACITY: usize = 256;
const KEYSTROKE_CAPACITY: usize = 4;
const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Wires the privileged context, the controller and their services.
///
/// The two contexts share nothing but the buses and the keystroke bridge.
pub struct App {
    config: Config,
}

impl App {
    /// App over a validated configuration.
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until interrupted or the key hook stops.
    #[instrument(skip_all)]
    pub(crate) async fn run(self, key_source: Box<dyn KeyEventSource>) -> AppResult<()> {
        info!("Hold-Scribe starting");
        let config = self.config;

        let combo = ShortcutCombo::parse(&config.hotkey.combo)?;
        let (lifecycle_tx, lifecycle_rx) = bus::channel::<LifecycleEvent>(BUS_CAPACITY);
        let (control_tx, control_rx) = bus::channel::<ControlEvent>(BUS_CAPACITY);
        let (bridge, keystrokes) = keystroke_bridge(KEYSTROKE_CAPACITY);
        let (key_sink, keys) = KeyEventSink::channel(KEY_EVENT_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown = CancellationToken::new();

        let service = Arc::new(HttpTranscriptionService::new(
            config.upload.endpoint.clone(),
            config.upload.api_key.clone(),
        )?);

        spawn_key_hook(key_source, key_sink)?;

        let focus = FocusTracker::new(Arc::new(SystemFocus));

        let privileged = PrivilegedContext::new(
            ShortcutMatcher::new(
                combo,
                Duration::from_millis(config.hotkey.repeat_grace_ms),
            ),
            PermissionGate::new(SystemPermissions::default()),
            lifecycle_tx,
            focus.clone(),
            Arc::new(EnigoInjector::new(
                config.insertion.method,
                config.insertion.restore_clipboard,
            )),
        );
        let inputs = PrivilegedInputs {
            keys,
            control: control_rx,
            keystrokes,
        };
        let mut privileged_handle = tokio::spawn(privileged.run(inputs, shutdown_rx));

        let uploader = SnippetUploader::new(
            service,
            config.retry_policy(),
            config.upload.min_confidence,
        );

        let (fallback, fallback_handle) = if config.fallback.enabled {
            let (coordinator, handle) = ShortClipFallbackCoordinator::spawn(
                config.fallback.settings(),
                uploader.clone(),
                shutdown.clone(),
            );
            (Some(coordinator), Some(handle))
        } else {
            info!("Short-clip fallback disabled");
            (None, None)
        };

        let services = SessionServices {
            uploader,
            fallback,
            executor: Arc::new(TextInsertionExecutor::new(
                focus.clone(),
                bridge,
                Duration::from_millis(config.insertion.ack_timeout_ms),
            )),
            silence_threshold: config.capture.silence_rms_threshold,
            silent_min_confidence: config.capture.silent_min_confidence,
        };
        let recorder = Recorder::new(
            Arc::new(CpalCaptureDevice::new()),
            Duration::from_millis(config.capture.flush_timeout_ms),
        );

        let controller = DictationController::new(
            lifecycle_rx,
            control_tx,
            recorder,
            focus,
            services,
            Arc::new(DesktopNotifier),
            config.controller_settings(),
        );
        let controller_handle = tokio::spawn(controller.run(shutdown.clone()));

        info!(
            combo = %config.hotkey.combo,
            endpoint = %config.upload.endpoint,
            "Hold-Scribe ready"
        );

        let mut outcome = Ok(());
        let mut privileged_done = false;

        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Interrupt received, shutting down"),
                Err(e) => error!(error = ?e, "Failed to listen for interrupt, shutting down"),
            },
            result = &mut privileged_handle => {
                privileged_done = true;
                match result {
                    Ok(Ok(())) => info!("Privileged context stopped"),
                    Ok(Err(e)) => {
                        error!(error = ?e, "Privileged context failed");
                        outcome = Err(e);
                    }
                    Err(e) => error!(error = ?e, "Privileged context task panicked"),
                }
            }
        }

        // Stop the producer side first so nothing new reaches the controller.
        let _ = shutdown_tx.send(true);
        shutdown.cancel();

        if !privileged_done {
            join_with_timeout("privileged", privileged_handle).await;
        }
        join_with_timeout("controller", controller_handle).await;
        if let Some(handle) = fallback_handle {
            join_with_timeout("fallback", handle).await;
        }

        info!("Hold-Scribe shut down successfully");
        outcome
    }
}

/// Run the key hook on its own thread. It is never joined: the OS hook
/// blocks for the life of the process.
#[track_caller]
fn spawn_key_hook(source: Box<dyn KeyEventSource>, sink: KeyEventSink) -> AppResult<()> {
    thread::Builder::new()
        .name("hold-scribe-keys".to_string())
        .spawn(move || {
            if let Err(e) = source.run(sink) {
                error!(error = ?e, "Key hook stopped");
            }
        })
        .map_err(|e| AppError::KeyHookFailed {
            reason: format!("Failed to spawn key hook thread: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
    Ok(())
}

async fn join_with_timeout<T>(name: &str, handle: JoinHandle<T>) {
    match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
        Ok(Ok(_)) => debug!(task = name, "Task stopped cleanly"),
        Ok(Err(e)) => error!(task = name, error = ?e, "Task panicked"),
        Err(_) => warn!(
            task = name,
            "Task did not stop within timeout, will be cleaned up on exit"
        ),
    }
}
