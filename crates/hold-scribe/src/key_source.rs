//! Global key hook backed by `rdev`.

use std::panic::Location;

use error_location::ErrorLocation;
use hold_scribe_core::{
    CoreResult, DictationError,
    keys::{KeyEventSink, KeyEventSource, RawKeyEvent},
    permissions::Capability,
};
use rdev::{EventType, Key};
use tracing::{error, info};

/// System-wide key hook.
///
/// `rdev::listen` blocks its thread for the life of the process. The
/// callback only names the key and hands it to the sink.
pub struct RdevKeySource;

impl KeyEventSource for RdevKeySource {
    fn run(self: Box<Self>, sink: KeyEventSink) -> CoreResult<()> {
        info!("Key hook listening");
        let mut closed = false;

        rdev::listen(move |event| {
            if closed {
                return;
            }
            let raw = match event.event_type {
                EventType::KeyPress(key) => RawKeyEvent::down(&key_name(key)),
                EventType::KeyRelease(key) => RawKeyEvent::up(&key_name(key)),
                _ => return,
            };
            if !sink.deliver(raw) {
                closed = true;
            }
        })
        .map_err(|e| {
            // Installing an event tap fails when accessibility is not granted.
            error!(error = ?e, "Failed to install key hook");
            DictationError::PermissionDenied {
                capability: Capability::Accessibility,
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }
}

/// Canonical name for an `rdev` key; left and right modifiers collapse.
pub(crate) fn key_name(key: Key) -> String {
    match key {
        Key::ControlLeft | Key::ControlRight => "ctrl".to_string(),
        Key::ShiftLeft | Key::ShiftRight => "shift".to_string(),
        Key::Alt | Key::AltGr => "alt".to_string(),
        Key::MetaLeft | Key::MetaRight => "meta".to_string(),
        Key::Return | Key::KpReturn => "enter".to_string(),
        Key::NumLock => "numlock".to_string(),
        Key::Unknown(code) => format!("code{}", code),
        other => {
            let name = format!("{:?}", other);
            name.strip_prefix("Key")
                .or_else(|| name.strip_prefix("Num"))
                .unwrap_or(&name)
                .to_ascii_lowercase()
        }
    }
}
