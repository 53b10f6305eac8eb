//! Press sessions and the UI-context controller that drives them.

mod cancel;
mod controller;
mod outcome;
mod pipeline;
mod state;

pub use {
    controller::{ControllerSettings, DictationController, SessionReport},
    outcome::{CancelReason, SessionOutcome, UserNotice, UserNotifier},
    pipeline::SessionServices,
    state::{PressSession, SessionState},
};

pub(crate) use cancel::SessionCancel;
