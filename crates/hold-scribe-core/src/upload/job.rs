use serde::Serialize;
use uuid::Uuid;

/// Where an upload is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadStatus {
    /// Created, no attempt made yet.
    Pending,
    /// An attempt is in flight.
    Uploading,
    /// The service returned a response with `ok: true`.
    Succeeded,
    /// Terminal failure, see `last_error`.
    Failed,
}

/// Bookkeeping for one snippet upload. The request id never changes
/// between attempts so the service can deduplicate retries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadJob {
    request_id: Uuid,
    status: UploadStatus,
    attempt: u32,
    last_error: Option<String>,
}

impl UploadJob {
    /// New pending job for `request_id`.
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            status: UploadStatus::Pending,
            attempt: 0,
            last_error: None,
        }
    }

    /// Correlation id sent with every attempt.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Current status.
    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Error from the most recent failed attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.status = UploadStatus::Uploading;
    }

    pub(crate) fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    pub(crate) fn succeed(&mut self) {
        self.status = UploadStatus::Succeeded;
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        self.status = UploadStatus::Failed;
        self.last_error = Some(error.into());
    }
}
