use crate::config::{
    default_attempt_timeout_ms, default_backoff_ms, default_max_attempts, default_min_confidence,
};

use serde::{Deserialize, Serialize};

/// Transcription service connection and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Multipart upload URL.
    pub endpoint: String,
    /// Optional bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Total attempts per snippet, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Budget for a single attempt.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Delay before the first retry; doubles each time.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Transcripts below this confidence go to the short-clip fallback.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/transcribe".to_string(),
            api_key: None,
            max_attempts: default_max_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            backoff_ms: default_backoff_ms(),
            min_confidence: default_min_confidence(),
        }
    }
}
