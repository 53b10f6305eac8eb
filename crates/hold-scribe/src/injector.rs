//! Synthetic text entry into other applications.
//!
//! Paste mode puts the transcript on the clipboard, sends the paste chord and
//! then puts the previous clipboard text back. Type mode sends unicode
//! keystrokes and leaves the clipboard alone.

use crate::{
    AppError, AppResult, PasteChordGuard, config::InsertionMethod, paste_guard::open_enigo,
};

use std::{thread, time::Duration};

use arboard::Clipboard;
use enigo::Keyboard;
use tracing::{debug, info, instrument, warn};

/// Gives the OS clipboard time to publish a write before it is pasted.
const CLIPBOARD_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Gap between key events; some apps and IMEs drop tighter sequences.
const KEY_EVENT_DELAY: Duration = Duration::from_millis(10);

/// Target apps read the clipboard asynchronously after the chord.
const RESTORE_DELAY: Duration = Duration::from_millis(150);

/// Writes text into whatever currently has keyboard focus.
///
/// Called from a blocking thread; implementations may sleep.
pub trait KeystrokeInjector: Send + Sync {
    /// Inject `text` at the focused element.
    fn inject(&self, text: &str) -> AppResult<()>;
}

/// `enigo` + `arboard` injector.
pub struct EnigoInjector {
    method: InsertionMethod,
    restore_clipboard: bool,
}

impl EnigoInjector {
    /// Injector using `method`.
    pub fn new(method: InsertionMethod, restore_clipboard: bool) -> Self {
        Self {
            method,
            restore_clipboard,
        }
    }

    fn paste(&self, text: &str) -> AppResult<()> {
        let mut clipboard = Clipboard::new()
            .map_err(|e| AppError::clipboard(format!("Failed to open clipboard: {}", e)))?;

        let previous = if self.restore_clipboard {
            clipboard.get_text().ok()
        } else {
            None
        };

        clipboard
            .set_text(text)
            .map_err(|e| AppError::clipboard(format!("Failed to set clipboard: {}", e)))?;
        debug!(text_len = text.len(), "Text copied to clipboard");

        thread::sleep(CLIPBOARD_SETTLE_DELAY);
        let pasted = send_paste_chord();

        // Restore even when the chord failed; the transcript must not linger.
        if let Some(previous) = previous {
            thread::sleep(RESTORE_DELAY);
            if let Err(e) = clipboard.set_text(previous) {
                warn!(error = %e, "Failed to restore previous clipboard text");
            }
        }

        pasted
    }

    fn type_text(&self, text: &str) -> AppResult<()> {
        open_enigo()?
            .text(text)
            .map_err(|e| AppError::injection(format!("Failed to type text: {}", e)))
    }
}

fn send_paste_chord() -> AppResult<()> {
    let mut guard = PasteChordGuard::press()?;
    thread::sleep(KEY_EVENT_DELAY);
    guard.click_v()?;
    thread::sleep(KEY_EVENT_DELAY);
    guard.release()
}

impl KeystrokeInjector for EnigoInjector {
    #[instrument(skip(self, text), fields(text_len = text.len(), method = ?self.method))]
    fn inject(&self, text: &str) -> AppResult<()> {
        match self.method {
            InsertionMethod::Paste => self.paste(text)?,
            InsertionMethod::Type => self.type_text(text)?,
        }
        info!("Text injected");
        Ok(())
    }
}
