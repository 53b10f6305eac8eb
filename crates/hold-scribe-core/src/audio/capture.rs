use crate::{CoreResult, DictationError, audio::AudioChunk};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        mpsc as std_mpsc,
    },
    thread,
    time::Duration,
};

use cpal::{
    StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Maximum samples to buffer (5 minutes at 48kHz mono).
/// Prevents unbounded memory growth during long recordings.
///
/// **Memory footprint at max capacity:**
/// - 48,000 Hz * 60s * 5 min * 4 bytes/f32 = ~58MB
/// - This is a hard upper bound; typical recordings are shorter
pub(crate) const MAX_BUFFER_SAMPLES: usize = 48_000 * 60 * 5;

/// How long `start` waits for the capture thread to open the stream.
const STREAM_OPEN_TIMEOUT: Duration = Duration::from_secs(3);

/// Format negotiated when a device starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Samples per second of the mono chunks the device will deliver.
    pub sample_rate: u32,
}

/// Messages a device sends to the recorder, in order.
#[derive(Debug)]
pub(crate) enum CaptureEvent {
    Chunk(AudioChunk),
    Flushed { chunks_delivered: u64 },
}

/// Where a capture device delivers audio.
///
/// Chunks are numbered in the order `push` is called. After
/// [`ChunkSink::flush_complete`] every further push is ignored, so the flush
/// marker is always the last thing the recorder sees.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    tx: mpsc::UnboundedSender<CaptureEvent>,
    next_seq: Arc<AtomicU64>,
    buffered: Arc<AtomicUsize>,
    flushed: Arc<AtomicBool>,
}

impl ChunkSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                next_seq: Arc::new(AtomicU64::new(0)),
                buffered: Arc::new(AtomicUsize::new(0)),
                flushed: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    /// Deliver mono samples.
    pub fn push(&self, samples: Vec<f32>) {
        if samples.is_empty() || self.flushed.load(Ordering::Acquire) {
            return;
        }

        let buffered = self.buffered.fetch_add(samples.len(), Ordering::AcqRel) + samples.len();
        if buffered > MAX_BUFFER_SAMPLES {
            // Keep the head of the recording; the session timeout ends it soon.
            self.buffered.fetch_sub(samples.len(), Ordering::AcqRel);
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);
        let _ = self.tx.send(CaptureEvent::Chunk(AudioChunk { seq, samples }));
    }

    /// Deliver interleaved frames, averaging channels down to mono.
    pub fn push_interleaved(&self, data: &[f32], channels: usize) {
        if channels <= 1 {
            self.push(data.to_vec());
            return;
        }
        let mono = data
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        self.push(mono);
    }

    /// Signal that the final chunk has been delivered. Idempotent.
    pub fn flush_complete(&self) {
        if self.flushed.swap(true, Ordering::AcqRel) {
            return;
        }
        let chunks_delivered = self.next_seq.load(Ordering::Acquire);
        let _ = self.tx.send(CaptureEvent::Flushed { chunks_delivered });
    }
}

/// A microphone that streams chunks into a [`ChunkSink`].
///
/// `stop` only requests shutdown; the device calls
/// [`ChunkSink::flush_complete`] once the last buffer has been handed over,
/// which may happen after `stop` returns.
pub trait CaptureDevice: Send + Sync {
    /// Open the device and begin delivering chunks.
    fn start(&self, sink: ChunkSink) -> CoreResult<CaptureFormat>;

    /// Request shutdown. Flush completion is signalled through the sink.
    fn stop(&self);
}

struct CaptureWorker {
    stop_tx: std_mpsc::Sender<()>,
}

/// Default-input microphone backed by cpal.
///
/// Each recording gets its own thread that owns the `Stream`. The OS audio
/// callback feeds the sink directly, so capture keeps running at full rate
/// whichever window has focus.
#[derive(Default)]
pub struct CpalCaptureDevice {
    worker: Mutex<Option<CaptureWorker>>,
}

impl CpalCaptureDevice {
    /// Create a device handle. The hardware is opened on `start`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureDevice for CpalCaptureDevice {
    #[track_caller]
    #[instrument(skip(self, sink))]
    fn start(&self, sink: ChunkSink) -> CoreResult<CaptureFormat> {
        let mut worker = self.worker.lock().unwrap_or_else(|e| {
            error!("Capture worker lock poisoned, recovering: {}", e);
            e.into_inner()
        });

        if let Some(previous) = worker.take() {
            warn!("Capture started while previous stream was open, stopping it");
            let _ = previous.stop_tx.send(());
        }

        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<CaptureFormat, String>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        thread::Builder::new()
            .name("hold-scribe-capture".to_string())
            .spawn(move || run_stream(sink, ready_tx, stop_rx))
            .map_err(|e| DictationError::CaptureUnavailable {
                reason: format!("Failed to spawn capture thread: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let format = match ready_rx.recv_timeout(STREAM_OPEN_TIMEOUT) {
            Ok(Ok(format)) => format,
            Ok(Err(reason)) => {
                return Err(DictationError::CaptureUnavailable {
                    reason,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Err(e) => {
                let _ = stop_tx.send(());
                return Err(DictationError::CaptureUnavailable {
                    reason: format!("Capture stream did not open: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        *worker = Some(CaptureWorker { stop_tx });
        info!(sample_rate = format.sample_rate, "Audio capture started");

        Ok(format)
    }

    fn stop(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(worker) = worker.take() {
            let _ = worker.stop_tx.send(());
            debug!("Audio capture stop requested");
        }
    }
}

impl Drop for CpalCaptureDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the capture thread: open, stream until told to stop, flush.
fn run_stream(
    sink: ChunkSink,
    ready_tx: std_mpsc::Sender<Result<CaptureFormat, String>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let host = cpal::default_host();

    let Some(device) = host.default_input_device() else {
        let _ = ready_tx.send(Err("No microphone found".to_string()));
        sink.flush_complete();
        return;
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("Failed to get config: {}", e)));
            sink.flush_complete();
            return;
        }
    };

    let channels = usize::from(supported.channels());
    let format = CaptureFormat {
        sample_rate: supported.sample_rate(),
    };
    let config: StreamConfig = supported.into();

    // Set before the stream is dropped so a late callback cannot push
    // after the flush marker.
    let shutdown = Arc::new(AtomicBool::new(false));
    let callback_shutdown = Arc::clone(&shutdown);
    let callback_sink = sink.clone();

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if callback_shutdown.load(Ordering::Acquire) {
                return;
            }
            callback_sink.push_interleaved(data, channels);
        },
        |err| {
            error!("Audio stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("Failed to build stream: {}", e)));
            sink.flush_complete();
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("Failed to start stream: {}", e)));
        sink.flush_complete();
        return;
    }

    if ready_tx.send(Ok(format)).is_err() {
        // Caller gave up waiting; release the device straight away.
        shutdown.store(true, Ordering::Release);
        drop(stream);
        sink.flush_complete();
        return;
    }

    // Blocks until stop() or the device handle is dropped.
    let _ = stop_rx.recv();

    shutdown.store(true, Ordering::Release);
    drop(stream);
    info!("Audio capture stopped");
    sink.flush_complete();
}
