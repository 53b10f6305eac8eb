use crate::config::{default_insertion_ack_ms, default_true};

use serde::{Deserialize, Serialize};

/// How text reaches other applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertionMethod {
    /// Put the text on the clipboard and send the paste chord.
    #[default]
    Paste,
    /// Type the text as unicode keystrokes.
    Type,
}

/// Text insertion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertionConfig {
    /// Paste or type.
    #[serde(default)]
    pub method: InsertionMethod,
    /// How long to wait for the injector's acknowledgment.
    #[serde(default = "default_insertion_ack_ms")]
    pub ack_timeout_ms: u64,
    /// Put the previous clipboard text back after pasting.
    #[serde(default = "default_true")]
    pub restore_clipboard: bool,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            method: InsertionMethod::default(),
            ack_timeout_ms: default_insertion_ack_ms(),
            restore_clipboard: true,
        }
    }
}
