mod capture_config;
#[allow(clippy::module_inception)]
mod config;
mod fallback_config;
mod hotkey_config;
mod insertion_config;
mod upload_config;

pub(crate) use {
    capture_config::CaptureConfig,
    config::Config,
    fallback_config::FallbackConfig,
    hotkey_config::HotkeyConfig,
    insertion_config::{InsertionConfig, InsertionMethod},
    upload_config::UploadConfig,
};

pub(crate) const DEFAULT_COMBO: &str = "ctrl+shift+space";
pub(crate) const DEFAULT_REPEAT_GRACE_MS: u64 = 500;
pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 15_000;
pub(crate) const DEFAULT_BACKOFF_MS: u64 = 250;
pub(crate) const DEFAULT_MIN_CONFIDENCE: f32 = 0.35;
pub(crate) const DEFAULT_SILENCE_RMS: f32 = 0.005;
pub(crate) const DEFAULT_SILENT_MIN_CONFIDENCE: f32 = 0.95;
pub(crate) const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 2_000;
pub(crate) const DEFAULT_MAX_RECORDING_SECS: u64 = 300;
pub(crate) const DEFAULT_INSERTION_ACK_MS: u64 = 3_000;

pub(crate) fn default_combo() -> String {
    DEFAULT_COMBO.to_string()
}

pub(crate) fn default_repeat_grace_ms() -> u64 {
    DEFAULT_REPEAT_GRACE_MS
}

pub(crate) fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

pub(crate) fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}

pub(crate) fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

pub(crate) fn default_min_confidence() -> f32 {
    DEFAULT_MIN_CONFIDENCE
}

pub(crate) fn default_silence_rms() -> f32 {
    DEFAULT_SILENCE_RMS
}

pub(crate) fn default_silent_min_confidence() -> f32 {
    DEFAULT_SILENT_MIN_CONFIDENCE
}

pub(crate) fn default_flush_timeout_ms() -> u64 {
    DEFAULT_FLUSH_TIMEOUT_MS
}

pub(crate) fn default_max_recording_secs() -> u64 {
    DEFAULT_MAX_RECORDING_SECS
}

pub(crate) fn default_insertion_ack_ms() -> u64 {
    DEFAULT_INSERTION_ACK_MS
}

pub(crate) fn default_true() -> bool {
    true
}
