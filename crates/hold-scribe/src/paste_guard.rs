//! Paste chord with a modifier that cannot stay stuck.

use crate::{AppError, AppResult};

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

/// Cmd on macOS, Ctrl everywhere else.
#[cfg(target_os = "macos")]
const PASTE_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const PASTE_MODIFIER: Key = Key::Control;

const PASTE_KEY: Key = Key::Unicode('v');

/// Open a synthetic-input handle.
pub(crate) fn open_enigo() -> AppResult<Enigo> {
    Enigo::new(&Settings::default())
        .map_err(|e| AppError::injection(format!("Failed to open input handle: {}", e)))
}

/// Holds the paste modifier down until released or dropped.
///
/// Drop releases on a best-effort basis when [`PasteChordGuard::release`]
/// was never reached, e.g. because the `V` click failed.
pub struct PasteChordGuard {
    enigo: Enigo,
    released: bool,
}

impl PasteChordGuard {
    /// Press the paste modifier.
    pub(crate) fn press() -> AppResult<Self> {
        let mut enigo = open_enigo()?;
        enigo
            .key(PASTE_MODIFIER, Direction::Press)
            .map_err(|e| AppError::injection(format!("Failed to press {:?}: {}", PASTE_MODIFIER, e)))?;

        Ok(Self {
            enigo,
            released: false,
        })
    }

    /// Click `V` while the modifier is held.
    pub(crate) fn click_v(&mut self) -> AppResult<()> {
        self.enigo
            .key(PASTE_KEY, Direction::Click)
            .map_err(|e| AppError::injection(format!("Failed to click V: {}", e)))
    }

    /// Release the modifier and report whether that worked.
    pub(crate) fn release(mut self) -> AppResult<()> {
        self.released = true;
        self.enigo
            .key(PASTE_MODIFIER, Direction::Release)
            .map_err(|e| AppError::injection(format!("Failed to release {:?}: {}", PASTE_MODIFIER, e)))
    }
}

impl Drop for PasteChordGuard {
    fn drop(&mut self) {
        if !self.released {
            // The OS resets modifier state on the next physical key event anyway.
            let _ = self.enigo.key(PASTE_MODIFIER, Direction::Release);
        }
    }
}
