//! Identity of the editable target focused when a recording began.

mod snapshot;
mod tracker;

pub use {
    snapshot::{CursorRange, ExternalTargetId, FocusSnapshot, TargetIdentity},
    tracker::{EditableSurface, FocusProbe, FocusTracker, InProcessFocus},
};
