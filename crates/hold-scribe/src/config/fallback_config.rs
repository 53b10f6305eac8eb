use crate::config::default_true;

use std::{path::PathBuf, time::Duration};

use hold_scribe_core::fallback::FallbackSettings;
use serde::{Deserialize, Serialize};

/// Short-clip fallback tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Re-process empty or low-confidence snippets.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where clips are persisted while they wait.
    pub clip_dir: PathBuf,
    /// Replay window length.
    #[serde(default = "default_segment_ms")]
    pub segment_ms: u64,
    /// Overlap between consecutive windows.
    #[serde(default = "default_overlap_ms")]
    pub overlap_ms: u64,
    /// Shorter clips are padded with silence to this length.
    #[serde(default = "default_min_padded_ms")]
    pub min_padded_ms: u64,
    /// Jobs that may wait for the worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound on enqueue acknowledgment.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Language hint for replayed segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_language: Option<String>,
}

fn default_segment_ms() -> u64 {
    3_000
}

fn default_overlap_ms() -> u64 {
    250
}

fn default_min_padded_ms() -> u64 {
    1_500
}

fn default_queue_capacity() -> usize {
    8
}

fn default_ack_timeout_ms() -> u64 {
    500
}

impl FallbackConfig {
    /// Defaults with clips stored under `clip_dir`.
    pub fn with_clip_dir(clip_dir: PathBuf) -> Self {
        Self {
            enabled: true,
            clip_dir,
            segment_ms: default_segment_ms(),
            overlap_ms: default_overlap_ms(),
            min_padded_ms: default_min_padded_ms(),
            queue_capacity: default_queue_capacity(),
            ack_timeout_ms: default_ack_timeout_ms(),
            forced_language: None,
        }
    }

    /// Settings for the fallback coordinator.
    pub fn settings(&self) -> FallbackSettings {
        FallbackSettings {
            clip_dir: self.clip_dir.clone(),
            segment: Duration::from_millis(self.segment_ms),
            overlap: Duration::from_millis(self.overlap_ms),
            min_padded: Duration::from_millis(self.min_padded_ms),
            queue_capacity: self.queue_capacity,
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            forced_language: self.forced_language.clone(),
        }
    }
}
