use crate::{CoreResult, DictationError};

use std::{collections::BTreeSet, fmt, panic::Location};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Canonical, platform-neutral key identifier such as `ctrl` or `space`.
///
/// Left/right variants of a modifier share one identifier, so `ctrl` is held
/// whenever either control key is down.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Build an identifier from a raw name, folding case and modifier aliases.
    pub fn new(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let canonical = match lower.as_str() {
            "control" | "ctl" => "ctrl",
            "cmd" | "command" | "super" | "win" | "windows" => "meta",
            "option" | "opt" | "altgr" => "alt",
            "return" => "enter",
            "esc" => "escape",
            other => other,
        };
        Self(canonical.to_string())
    }

    /// The canonical name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set of keys that must all be held at once to dictate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutCombo {
    keys: BTreeSet<KeyId>,
}

impl ShortcutCombo {
    /// Parse a `+`-separated definition such as `ctrl+shift+space`.
    ///
    /// # Errors
    ///
    /// Returns [`DictationError::InvalidShortcut`] for empty or repeated keys.
    #[track_caller]
    pub fn parse(definition: &str) -> CoreResult<Self> {
        let invalid = |reason: &str| DictationError::InvalidShortcut {
            combo: definition.to_string(),
            reason: reason.to_string(),
            location: ErrorLocation::from(Location::caller()),
        };

        let mut keys = BTreeSet::new();
        for token in definition.split('+') {
            if token.trim().is_empty() {
                return Err(invalid("empty key name"));
            }
            if !keys.insert(KeyId::new(token)) {
                return Err(invalid("key listed twice"));
            }
        }

        if keys.is_empty() {
            return Err(invalid("no keys"));
        }

        Ok(Self { keys })
    }

    /// Whether `key` is one of the required keys.
    pub fn contains(&self, key: &KeyId) -> bool {
        self.keys.contains(key)
    }

    /// True iff every required key satisfies `is_held`.
    pub fn is_satisfied(&self, is_held: impl Fn(&KeyId) -> bool) -> bool {
        self.keys.iter().all(is_held)
    }

    /// Number of keys in the combination.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a parsed combo; present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Display for ShortcutCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.keys.iter().map(KeyId::as_str).collect();
        f.write_str(&names.join("+"))
    }
}
