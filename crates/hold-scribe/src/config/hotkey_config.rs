use crate::config::{default_combo, default_repeat_grace_ms};

use serde::{Deserialize, Serialize};

/// Hold-to-talk shortcut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// `+`-separated key names, e.g. `ctrl+shift+space`.
    #[serde(default = "default_combo")]
    pub combo: String,
    /// Key-repeat debounce and stale-episode grace period.
    #[serde(default = "default_repeat_grace_ms")]
    pub repeat_grace_ms: u64,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            combo: default_combo(),
            repeat_grace_ms: default_repeat_grace_ms(),
        }
    }
}
