//! Scripted stand-ins for the platform seams.

#![allow(clippy::unwrap_used)]

use crate::{
    CoreResult, DictationError,
    audio::{CaptureDevice, CaptureFormat, ChunkSink},
    focus::{CursorRange, EditableSurface},
    permissions::{AuthStatus, Capability, PermissionProvider},
    session::{UserNotice, UserNotifier},
    upload::{TranscriptionService, TransportError, UploadMetadata, UploadRequest, UploadResponse},
};

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

pub const SAMPLE_RATE: u32 = 16_000;

/// `ms` milliseconds of a sine tone loud enough to count as speech.
pub fn tone(ms: u64) -> Vec<f32> {
    let len = (u64::from(SAMPLE_RATE) * ms / 1000) as usize;
    (0..len)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / SAMPLE_RATE as f32).sin() * 0.5)
        .collect()
}

/// `ms` milliseconds of near-silence.
pub fn hush(ms: u64) -> Vec<f32> {
    let len = (u64::from(SAMPLE_RATE) * ms / 1000) as usize;
    vec![0.0005; len]
}

/// Capture device that replays scripted chunks and flushes asynchronously.
///
/// `chunks` are pushed on `start`; `late_chunk` is pushed only after `stop`,
/// followed by the flush marker once `flush_delay` has passed.
pub struct ScriptedDevice {
    pub chunks: Vec<Vec<f32>>,
    pub late_chunk: Option<Vec<f32>>,
    pub flush_delay: Duration,
    pub start_delay: Duration,
    pub never_flush: bool,
    pub fail_start: bool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    sink: Mutex<Option<ChunkSink>>,
}

impl ScriptedDevice {
    pub fn new(chunks: Vec<Vec<f32>>) -> Self {
        Self {
            chunks,
            late_chunk: None,
            flush_delay: Duration::from_millis(20),
            start_delay: Duration::ZERO,
            never_flush: false,
            fail_start: false,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            sink: Mutex::new(None),
        }
    }

    pub fn with_late_chunk(mut self, chunk: Vec<f32>) -> Self {
        self.late_chunk = Some(chunk);
        self
    }

    pub fn failing() -> Self {
        let mut device = Self::new(Vec::new());
        device.fail_start = true;
        device
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for ScriptedDevice {
    fn start(&self, sink: ChunkSink) -> CoreResult<CaptureFormat> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if !self.start_delay.is_zero() {
            std::thread::sleep(self.start_delay);
        }
        if self.fail_start {
            return Err(DictationError::capture_unavailable("No microphone found"));
        }
        for chunk in &self.chunks {
            sink.push(chunk.clone());
        }
        *self.sink.lock().unwrap() = Some(sink);
        Ok(CaptureFormat {
            sample_rate: SAMPLE_RATE,
        })
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let Some(sink) = self.sink.lock().unwrap().take() else {
            return;
        };
        if self.never_flush {
            // Keep the sink alive so the recorder sees no close either.
            std::mem::forget(sink);
            return;
        }
        let late = self.late_chunk.clone();
        let delay = self.flush_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(late) = late {
                sink.push(late);
            }
            sink.flush_complete();
        });
    }
}

/// Transcription service answering from a script, recording every call.
pub struct ScriptedService {
    script: Mutex<VecDeque<Result<UploadResponse, TransportError>>>,
    fallback: Result<UploadResponse, TransportError>,
    pub delay: Duration,
    calls: Mutex<Vec<UploadMetadata>>,
}

impl ScriptedService {
    /// Always returns `answer`.
    pub fn always(answer: Result<UploadResponse, TransportError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: answer,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns `script` in order, then `then` forever.
    pub fn scripted(
        script: Vec<Result<UploadResponse, TransportError>>,
        then: Result<UploadResponse, TransportError>,
    ) -> Self {
        let service = Self::always(then);
        *service.script.lock().unwrap() = script.into();
        service
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<UploadMetadata> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptionService for ScriptedService {
    async fn transcribe(&self, request: &UploadRequest) -> Result<UploadResponse, TransportError> {
        self.calls.lock().unwrap().push(request.metadata.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Single-line text field living in the test process.
#[derive(Default)]
pub struct TextField {
    text: Mutex<String>,
}

impl TextField {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
        }
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }
}

impl EditableSurface for TextField {
    fn insert_text(&self, range: Option<CursorRange>, text: &str) -> CoreResult<()> {
        let mut current = self.text.lock().unwrap();
        let len = current.chars().count();
        let range = range.unwrap_or(CursorRange::caret(len));
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);

        let before: String = current.chars().take(start).collect();
        let after: String = current.chars().skip(end).collect();
        *current = format!("{}{}{}", before, text, after);
        Ok(())
    }
}

/// Notifier that remembers what it was asked to show.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<UserNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<UserNotice> {
        self.notices.lock().unwrap().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn notify(&self, notice: &UserNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Permission provider with per-capability scripted answers.
///
/// A capability without a status entry makes `auth_status` fail.
#[derive(Default)]
pub struct ScriptedPermissions {
    statuses: Mutex<HashMap<Capability, AuthStatus>>,
    grants_on_request: Mutex<HashMap<Capability, bool>>,
    pub status_queries: AtomicUsize,
    pub requests: AtomicUsize,
}

impl ScriptedPermissions {
    pub fn granted() -> Self {
        let provider = Self::default();
        provider.set_status(Capability::Accessibility, AuthStatus::Authorized);
        provider.set_status(Capability::Microphone, AuthStatus::Authorized);
        provider
    }

    pub fn set_status(&self, capability: Capability, status: AuthStatus) {
        self.statuses.lock().unwrap().insert(capability, status);
    }

    pub fn clear_status(&self, capability: Capability) {
        self.statuses.lock().unwrap().remove(&capability);
    }

    pub fn answer_requests(&self, capability: Capability, grant: bool) {
        self.grants_on_request
            .lock()
            .unwrap()
            .insert(capability, grant);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for ScriptedPermissions {
    async fn auth_status(&self, capability: Capability) -> CoreResult<AuthStatus> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .get(&capability)
            .copied()
            .ok_or_else(|| DictationError::capture_unavailable("status query unavailable"))
    }

    async fn request_access(&self, capability: Capability) -> CoreResult<bool> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let grant = self
            .grants_on_request
            .lock()
            .unwrap()
            .get(&capability)
            .copied()
            .unwrap_or(false);
        if grant {
            self.set_status(capability, AuthStatus::Authorized);
        }
        Ok(grant)
    }
}

