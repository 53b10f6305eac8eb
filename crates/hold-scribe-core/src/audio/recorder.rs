//! Exclusive microphone ownership and snippet finalization.
//!
//! The recorder hands out at most one [`ActiveRecording`] at a time. Chunks
//! stay inside the recording's channel until [`ActiveRecording::finish`] has
//! seen the flush marker; there is no accessor for them before that.

use crate::{
    CoreResult, DictationError,
    audio::{
        AudioSnippet, CaptureDevice, ChunkSink, FlushComplete,
        capture::CaptureEvent,
    },
};

use std::{
    panic::Location,
    sync::Arc,
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Hands out exclusive recordings on one capture device.
#[derive(Clone)]
pub struct Recorder {
    device: Arc<dyn CaptureDevice>,
    ownership: Arc<Semaphore>,
    flush_timeout: Duration,
}

impl Recorder {
    /// Create a recorder over `device`. `flush_timeout` bounds how long
    /// [`ActiveRecording::finish`] waits for the flush marker.
    pub fn new(device: Arc<dyn CaptureDevice>, flush_timeout: Duration) -> Self {
        Self {
            device,
            ownership: Arc::new(Semaphore::new(1)),
            flush_timeout,
        }
    }

    /// Whether a recording currently owns the device.
    pub fn is_busy(&self) -> bool {
        self.ownership.available_permits() == 0
    }

    /// Acquire the device and start capturing for `request_id`.
    ///
    /// Opening a device can block for seconds, so the start runs on the
    /// blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::CaptureUnavailable`] if another recording
    /// owns the device or the device fails to start.
    #[instrument(skip(self))]
    pub async fn open(&self, request_id: Uuid) -> CoreResult<ActiveRecording> {
        let permit = Arc::clone(&self.ownership)
            .try_acquire_owned()
            .map_err(|_| DictationError::CaptureUnavailable {
                reason: "Microphone is owned by another session".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (sink, events) = ChunkSink::channel();
        let device = Arc::clone(&self.device);
        // On error the permit drops here and the device is free again.
        let format = tokio::task::spawn_blocking(move || device.start(sink))
            .await
            .map_err(|e| DictationError::CaptureUnavailable {
                reason: format!("Capture start task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })??;

        info!(request_id = %request_id, sample_rate = format.sample_rate, "Recording opened");

        Ok(ActiveRecording {
            request_id,
            lease: DeviceLease {
                device: Arc::clone(&self.device),
                _permit: permit,
                stop_requested: false,
            },
            events,
            sample_rate: format.sample_rate,
            started_at: Instant::now(),
            flush_timeout: self.flush_timeout,
        })
    }
}

/// Paired acquire/release of the capture device.
///
/// Dropping the lease requests a stop if nobody did, then frees the device
/// for the next session. This runs on every exit path, including panics
/// and cancelled tasks.
struct DeviceLease {
    device: Arc<dyn CaptureDevice>,
    _permit: OwnedSemaphorePermit,
    stop_requested: bool,
}

impl DeviceLease {
    fn stop(&mut self) {
        if !self.stop_requested {
            self.stop_requested = true;
            self.device.stop();
        }
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A recording in progress. Holds the device until finished or dropped.
pub struct ActiveRecording {
    request_id: Uuid,
    lease: DeviceLease,
    events: mpsc::UnboundedReceiver<CaptureEvent>,
    sample_rate: u32,
    started_at: Instant,
    flush_timeout: Duration,
}

impl ActiveRecording {
    /// Session that owns this recording.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// How long the device has been open.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stop the device, wait for flush-complete, then build the snippet.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::CaptureUnavailable`] if the device does not
    /// flush within the timeout or disappears without flushing.
    #[instrument(skip(self), fields(request_id = %self.request_id))]
    pub async fn finish(mut self) -> CoreResult<AudioSnippet> {
        let location = ErrorLocation::from(Location::caller());
        self.lease.stop();

        let mut chunks = Vec::new();
        let flushed = tokio::time::timeout(self.flush_timeout, async {
            while let Some(event) = self.events.recv().await {
                match event {
                    CaptureEvent::Chunk(chunk) => chunks.push(chunk),
                    CaptureEvent::Flushed { chunks_delivered } => {
                        return Some(FlushComplete::new(chunks_delivered));
                    }
                }
            }
            None
        })
        .await;

        let flushed = match flushed {
            Ok(Some(flushed)) => flushed,
            Ok(None) => {
                return Err(DictationError::CaptureUnavailable {
                    reason: "Capture device closed without flushing".to_string(),
                    location,
                });
            }
            Err(_) => {
                return Err(DictationError::CaptureUnavailable {
                    reason: format!(
                        "Capture device did not flush within {}ms",
                        self.flush_timeout.as_millis()
                    ),
                    location,
                });
            }
        };

        if flushed.chunks_delivered() != chunks.len() as u64 {
            warn!(
                delivered = flushed.chunks_delivered(),
                received = chunks.len(),
                "Chunk count mismatch at flush"
            );
        }

        let snippet = AudioSnippet::finalize(self.request_id, chunks, self.sample_rate, flushed);
        debug!(
            chunk_count = snippet.chunk_count(),
            duration_ms = snippet.duration_ms(),
            "Snippet finalized"
        );

        Ok(snippet)
    }

    /// Stop and discard everything captured.
    #[instrument(skip(self), fields(request_id = %self.request_id))]
    pub fn abandon(self) {
        info!(elapsed_ms = self.elapsed().as_millis(), "Recording abandoned");
        // DeviceLease::drop stops the device and frees it.
    }
}
