//! Snippet upload to the external transcription service.

mod http;
mod job;
mod media_type;
mod service;
mod uploader;

pub use {
    http::HttpTranscriptionService,
    job::{UploadJob, UploadStatus},
    media_type::normalize_media_type,
    service::{TranscriptionService, TransportError, UploadMetadata, UploadRequest, UploadResponse},
    uploader::{RetryPolicy, SnippetUploader, UploadOutcome},
};
