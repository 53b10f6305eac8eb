//! Hold-scribe Core Library
//!
//! The dictation lifecycle behind a hold-to-talk hotkey: shortcut matching,
//! permission gating, the versioned lifecycle bus, exclusive microphone
//! capture, snippet upload with bounded retry, the short-clip fallback, and
//! focus-checked text insertion.
//!
//! Platform capabilities (key hooks, permission probes, focus probes,
//! keystroke injection) sit behind traits so the binary can plug in native
//! backends and tests can plug in scripted ones.
//!
//! # Example
//!
//! ```no_run
//! use hold_scribe_core::{
//!     CoreResult,
//!     keys::{RawKeyEvent, ShortcutCombo, ShortcutMatcher},
//! };
//!
//! use std::time::Duration;
//!
//! fn main() -> CoreResult<()> {
//!     let combo = ShortcutCombo::parse("ctrl+shift+space")?;
//!     let mut matcher = ShortcutMatcher::new(combo, Duration::from_millis(500));
//!
//!     for key in ["ctrl", "shift", "space"] {
//!         for transition in matcher.on_event(&RawKeyEvent::down(key)) {
//!             println!("{:?}", transition);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod bus;
pub mod clock;
mod error;
pub mod fallback;
pub mod focus;
pub mod insertion;
pub mod keys;
pub mod permissions;
pub mod session;
pub mod upload;

pub use error::{DictationError, Result as CoreResult};
