//! Configuration management for hold-scribe.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation before startup, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{CaptureConfig, FallbackConfig, HotkeyConfig, InsertionConfig, UploadConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use hold_scribe_core::{keys::ShortcutCombo, session::ControllerSettings, upload::RetryPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hold-to-talk shortcut.
    #[serde(default)]
    pub hotkey: HotkeyConfig,
    /// Transcription service and retry policy.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Microphone capture.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Short-clip fallback.
    pub fallback: FallbackConfig,
    /// Text insertion.
    #[serde(default)]
    pub insertion: InsertionConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            Self::create_default(&config_path)
        }
    }

    /// Parse the configuration file at `path`.
    #[track_caller]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Reject settings no context can run with.
    ///
    /// Called once in `main`, before the key hook or the controller start.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: String| AppError::ConfigError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        ShortcutCombo::parse(&self.hotkey.combo)
            .map_err(|e| invalid(format!("Invalid hotkey combo: {}", e)))?;

        if self.upload.endpoint.trim().is_empty() {
            return Err(invalid("Upload endpoint is empty".to_string()));
        }
        if self.upload.max_attempts == 0 {
            return Err(invalid("upload.max_attempts must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.upload.min_confidence) {
            return Err(invalid(format!(
                "upload.min_confidence must be between 0 and 1, got {}",
                self.upload.min_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.capture.silent_min_confidence) {
            return Err(invalid(format!(
                "capture.silent_min_confidence must be between 0 and 1, got {}",
                self.capture.silent_min_confidence
            )));
        }
        if self.fallback.enabled && self.fallback.overlap_ms >= self.fallback.segment_ms {
            return Err(invalid(format!(
                "fallback.overlap_ms ({}) must be shorter than fallback.segment_ms ({})",
                self.fallback.overlap_ms, self.fallback.segment_ms
            )));
        }

        Ok(())
    }

    /// Write to a temporary file first, then rename over `path`.
    #[track_caller]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Defaults with clips under `data_dir/clips`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            hotkey: HotkeyConfig::default(),
            upload: UploadConfig::default(),
            capture: CaptureConfig::default(),
            fallback: FallbackConfig::with_clip_dir(data_dir.join("clips")),
            insertion: InsertionConfig::default(),
        }
    }

    /// Upload retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upload.max_attempts,
            attempt_timeout: Duration::from_millis(self.upload.attempt_timeout_ms),
            backoff: Duration::from_millis(self.upload.backoff_ms),
        }
    }

    /// Controller timing.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            max_recording: Duration::from_secs(self.capture.max_recording_secs),
            ..ControllerSettings::default()
        }
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "hold-scribe", "Hold-Scribe").ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn create_default(config_path: &Path) -> AppResult<Self> {
        let proj_dirs = Self::project_dirs()?;
        let config = Self::with_data_dir(proj_dirs.data_dir());

        config.save_to(config_path)?;

        warn!(
            endpoint = %config.upload.endpoint,
            "Default config created. Point upload.endpoint at your transcription service."
        );

        Ok(config)
    }
}
