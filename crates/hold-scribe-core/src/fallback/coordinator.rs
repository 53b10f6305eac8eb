use crate::{
    CoreResult, DictationError,
    audio::{
        AudioSnippet,
        wav::{self, WAV_MEDIA_TYPE},
    },
    fallback::{FallbackRequest, FallbackStatus, ShortClipFallbackJob, pad_to, segment_windows},
    upload::{SnippetUploader, UploadJob, UploadOutcome, UploadRequest},
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const STATUS_STREAM_CAPACITY: usize = 64;

/// Tuning for the fallback worker.
#[derive(Debug, Clone)]
pub struct FallbackSettings {
    /// Where clips are persisted as `<clipId>.wav`.
    pub clip_dir: PathBuf,
    /// Replay window length.
    pub segment: Duration,
    /// Overlap between consecutive windows.
    pub overlap: Duration,
    /// Clips shorter than this are padded with silence first.
    pub min_padded: Duration,
    /// Jobs that may wait for the worker.
    pub queue_capacity: usize,
    /// Upper bound on how long `enqueue` may take to acknowledge.
    pub ack_timeout: Duration,
    /// Language hint applied when the request has none.
    pub forced_language: Option<String>,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            clip_dir: std::env::temp_dir().join("hold-scribe").join("clips"),
            segment: Duration::from_millis(3000),
            overlap: Duration::from_millis(250),
            min_padded: Duration::from_millis(1500),
            queue_capacity: 8,
            ack_timeout: Duration::from_millis(500),
            forced_language: None,
        }
    }
}

struct QueuedJob {
    job: ShortClipFallbackJob,
    cancel: CancellationToken,
}

/// Accepts fallback jobs and publishes their progress.
///
/// One worker task processes jobs in order. Status transitions are pushed on
/// a broadcast stream; [`ShortClipFallbackCoordinator::subscribe`] filters it
/// by clip.
#[derive(Clone)]
pub struct ShortClipFallbackCoordinator {
    jobs_tx: mpsc::Sender<QueuedJob>,
    status_tx: broadcast::Sender<FallbackStatus>,
    waiting: Arc<AtomicUsize>,
    settings: Arc<FallbackSettings>,
}

impl ShortClipFallbackCoordinator {
    /// Start the worker. It runs until `shutdown` fires or every
    /// coordinator handle is dropped.
    pub fn spawn(
        settings: FallbackSettings,
        uploader: SnippetUploader,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (jobs_tx, jobs_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let (status_tx, _) = broadcast::channel(STATUS_STREAM_CAPACITY);

        let coordinator = Self {
            jobs_tx,
            status_tx: status_tx.clone(),
            waiting: Arc::new(AtomicUsize::new(0)),
            settings: Arc::new(settings),
        };

        let worker = Worker {
            uploader,
            status_tx,
            waiting: Arc::clone(&coordinator.waiting),
            settings: Arc::clone(&coordinator.settings),
        };
        let handle = tokio::spawn(worker.run(jobs_rx, shutdown));

        (coordinator, handle)
    }

    /// Write `snippet` to `clip_dir/<requestId>.wav` and return the path.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::Io`] if the directory or file cannot be written.
    #[instrument(skip(self, snippet), fields(request_id = %snippet.request_id()))]
    pub async fn persist_clip(&self, snippet: &AudioSnippet) -> CoreResult<PathBuf> {
        tokio::fs::create_dir_all(&self.settings.clip_dir).await?;

        let path = self
            .settings
            .clip_dir
            .join(format!("{}.wav", snippet.request_id()));
        let temp_path = path.with_extension("wav.tmp");

        tokio::fs::write(&temp_path, snippet.to_wav()?).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!(path = %path.display(), "Clip persisted");
        Ok(path)
    }

    /// Subscribe to status updates for `clip_id`. Subscribe before
    /// enqueueing to observe the `queued` transition.
    pub fn subscribe(&self, clip_id: Uuid) -> FallbackSubscription {
        FallbackSubscription {
            clip_id,
            rx: self.status_tx.subscribe(),
        }
    }

    /// Queue a clip for re-processing and acknowledge with its job id.
    ///
    /// Returns within the configured acknowledgment timeout. `cancel` ties
    /// the job to the session that requested it.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::FallbackEnqueueFailed`] with a message fit
    /// for display. A `failed` status is published for the clip as well.
    #[instrument(skip(self, request, cancel), fields(clip_id = %request.clip_id))]
    pub async fn enqueue(
        &self,
        request: FallbackRequest,
        cancel: CancellationToken,
    ) -> CoreResult<FallbackStatus> {
        let location = ErrorLocation::from(Location::caller());
        let mut job = ShortClipFallbackJob::queued(request);

        if !tokio::fs::try_exists(job.source_path()).await.unwrap_or(false) {
            let message = format!(
                "The recording could not be found at {}",
                job.source_path().display()
            );
            return Err(self.reject(&mut job, message, location));
        }

        let ahead = self.waiting.fetch_add(1, Ordering::AcqRel);
        let estimate =
            u64::try_from(self.settings.segment.as_millis() * (ahead as u128 + 1)).unwrap_or(u64::MAX);
        let ack = job.to_status(Some(estimate));

        // Publish before sending so subscribers never see processing first.
        let _ = self.status_tx.send(ack.clone());

        let queued = QueuedJob {
            job: job.clone(),
            cancel,
        };
        match tokio::time::timeout(self.settings.ack_timeout, self.jobs_tx.send(queued)).await {
            Ok(Ok(())) => {
                info!(job_id = %ack.job_id, estimated_latency_ms = estimate, "Fallback job queued");
                Ok(ack)
            }
            Ok(Err(_)) => {
                self.waiting.fetch_sub(1, Ordering::AcqRel);
                Err(self.reject(
                    &mut job,
                    "The retry service has stopped; please try dictating again".to_string(),
                    location,
                ))
            }
            Err(_) => {
                self.waiting.fetch_sub(1, Ordering::AcqRel);
                Err(self.reject(
                    &mut job,
                    format!(
                        "The retry queue is full ({} jobs waiting); please try again shortly",
                        self.settings.queue_capacity
                    ),
                    location,
                ))
            }
        }
    }

    fn reject(
        &self,
        job: &mut ShortClipFallbackJob,
        message: String,
        location: ErrorLocation,
    ) -> DictationError {
        warn!(clip_id = %job.clip_id(), message = %message, "Fallback enqueue failed");
        job.fail(message.clone());
        let _ = self.status_tx.send(job.to_status(None));
        DictationError::FallbackEnqueueFailed { message, location }
    }
}

/// Status updates for one clip.
pub struct FallbackSubscription {
    clip_id: Uuid,
    rx: broadcast::Receiver<FallbackStatus>,
}

impl FallbackSubscription {
    /// Next update for this clip, or `None` once the coordinator is gone.
    pub async fn next(&mut self) -> Option<FallbackStatus> {
        loop {
            match self.rx.recv().await {
                Ok(status) if status.clip_id == self.clip_id => return Some(status),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(clip_id = %self.clip_id, skipped, "Fallback status stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the terminal update.
    pub async fn finished(&mut self) -> Option<FallbackStatus> {
        while let Some(status) = self.next().await {
            if status.status.is_terminal() {
                return Some(status);
            }
        }
        None
    }
}

struct Worker {
    uploader: SnippetUploader,
    status_tx: broadcast::Sender<FallbackStatus>,
    waiting: Arc<AtomicUsize>,
    settings: Arc<FallbackSettings>,
}

impl Worker {
    async fn run(self, mut jobs_rx: mpsc::Receiver<QueuedJob>, shutdown: CancellationToken) {
        info!("Fallback worker started");
        loop {
            let queued = tokio::select! {
                _ = shutdown.cancelled() => break,
                queued = jobs_rx.recv() => match queued {
                    Some(queued) => queued,
                    None => break,
                },
            };
            self.waiting.fetch_sub(1, Ordering::AcqRel);
            self.process(queued).await;
        }
        info!("Fallback worker stopped");
    }

    #[instrument(skip(self, queued), fields(job_id = %queued.job.job_id(), clip_id = %queued.job.clip_id()))]
    async fn process(&self, queued: QueuedJob) {
        let QueuedJob { mut job, cancel } = queued;

        if cancel.is_cancelled() {
            job.fail("The dictation session was cancelled");
            self.publish(&job);
            return;
        }

        job.start();
        self.publish(&job);

        let result = tokio::select! {
            _ = cancel.cancelled() => Err("The dictation session was cancelled".to_string()),
            result = self.replay(&job, &cancel) => result,
        };

        match result {
            Ok(transcript) => {
                info!(chars = transcript.len(), "Fallback replay succeeded");
                job.succeed(transcript);
            }
            Err(message) => {
                error!(message = %message, "Fallback replay failed");
                job.fail(message);
            }
        }
        self.publish(&job);
    }

    async fn replay(
        &self,
        job: &ShortClipFallbackJob,
        cancel: &CancellationToken,
    ) -> Result<String, String> {
        let bytes = tokio::fs::read(job.source_path())
            .await
            .map_err(|e| format!("Could not read the recording: {}", e))?;
        let (samples, sample_rate) = wav::decode_pcm16(&bytes).map_err(|e| e.to_string())?;

        let per_ms = |d: Duration| (u128::from(sample_rate) * d.as_millis() / 1000) as usize;
        let samples = pad_to(samples, per_ms(self.settings.min_padded));
        let windows = segment_windows(
            &samples,
            per_ms(self.settings.segment),
            per_ms(self.settings.overlap),
        );

        let language = job
            .forced_language()
            .map(str::to_string)
            .or_else(|| self.settings.forced_language.clone());

        debug!(segments = windows.len(), sample_rate, "Replaying clip in segments");

        let mut parts = Vec::new();
        for (index, window) in windows.iter().enumerate() {
            let duration_ms = window.len() as u64 * 1000 / u64::from(sample_rate.max(1));
            let request = UploadRequest::new(
                Uuid::new_v4(),
                wav::encode_pcm16(window, sample_rate).map_err(|e| e.to_string())?,
                WAV_MEDIA_TYPE,
                duration_ms,
            )
            .with_language(language.clone());
            let mut upload_job = UploadJob::new(request.request_id());

            match self.uploader.upload(&mut upload_job, &request, cancel).await {
                Ok(UploadOutcome::Transcript { text, .. }) => parts.push(text),
                Ok(UploadOutcome::EmptyOrLowConfidence { .. }) => {
                    debug!(segment = index, "Segment produced no usable text");
                }
                Err(e) => return Err(format!("Segment {} failed: {}", index + 1, e)),
            }
        }

        Ok(parts.join(" "))
    }

    fn publish(&self, job: &ShortClipFallbackJob) {
        // No subscribers is fine; the job still runs.
        let _ = self.status_tx.send(job.to_status(None));
    }
}
