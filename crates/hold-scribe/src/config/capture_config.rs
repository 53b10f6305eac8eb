use crate::config::{
    default_flush_timeout_ms, default_max_recording_secs, default_silence_rms,
    default_silent_min_confidence,
};

use serde::{Deserialize, Serialize};

/// Microphone capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// RMS below which a snippet counts as near-silent.
    #[serde(default = "default_silence_rms")]
    pub silence_rms_threshold: f32,
    /// Confidence a near-silent snippet's transcript needs to be inserted
    /// without a short-clip retry.
    #[serde(default = "default_silent_min_confidence")]
    pub silent_min_confidence: f32,
    /// How long to wait for the device to flush its last buffer.
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
    /// Sessions still recording after this are cancelled.
    #[serde(default = "default_max_recording_secs")]
    pub max_recording_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_rms_threshold: default_silence_rms(),
            silent_min_confidence: default_silent_min_confidence(),
            flush_timeout_ms: default_flush_timeout_ms(),
            max_recording_secs: default_max_recording_secs(),
        }
    }
}
