use crate::{
    CoreResult,
    focus::{CursorRange, FocusSnapshot, TargetIdentity},
};

use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, instrument};

/// A text target living in this process.
pub trait EditableSurface: Send + Sync {
    /// Insert `text`, replacing `range` if given, else at the current caret.
    fn insert_text(&self, range: Option<CursorRange>, text: &str) -> CoreResult<()>;
}

/// Reports what currently has keyboard focus.
pub trait FocusProbe: Send + Sync {
    /// `None` when nothing editable is focused or the platform cannot tell.
    fn current(&self) -> Option<FocusSnapshot>;
}

/// Captures focus snapshots at decision points.
#[derive(Clone)]
pub struct FocusTracker {
    probe: Arc<dyn FocusProbe>,
}

impl FocusTracker {
    /// Tracker over `probe`.
    pub fn new(probe: Arc<dyn FocusProbe>) -> Self {
        Self { probe }
    }

    /// Take the snapshot for a press that is starting.
    #[instrument(skip(self))]
    pub fn capture(&self) -> Option<FocusSnapshot> {
        let snapshot = self.probe.current();
        match &snapshot {
            Some(snapshot) => debug!(target = ?snapshot.identity(), cursor = ?snapshot.cursor(), "Focus captured"),
            None => debug!("No editable target focused"),
        }
        snapshot
    }

    /// What has focus right now.
    pub fn current(&self) -> Option<FocusSnapshot> {
        self.probe.current()
    }
}

/// Focus bookkeeping for surfaces owned by this process.
///
/// Holds only weak references; a surface that is dropped simply stops
/// matching.
#[derive(Default)]
pub struct InProcessFocus {
    focused: Mutex<Option<(Weak<dyn EditableSurface>, Option<CursorRange>)>>,
}

impl InProcessFocus {
    /// Nothing focused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `surface` gained focus with the caret at `cursor`.
    pub fn focus(&self, surface: &Arc<dyn EditableSurface>, cursor: Option<CursorRange>) {
        let mut focused = self.focused.lock().unwrap_or_else(|e| e.into_inner());
        *focused = Some((Arc::downgrade(surface), cursor));
    }

    /// Record that focus left this process.
    pub fn blur(&self) {
        let mut focused = self.focused.lock().unwrap_or_else(|e| e.into_inner());
        *focused = None;
    }
}

impl FocusProbe for InProcessFocus {
    fn current(&self) -> Option<FocusSnapshot> {
        let focused = self.focused.lock().unwrap_or_else(|e| e.into_inner());
        let (surface, cursor) = focused.as_ref()?;
        if surface.strong_count() == 0 {
            return None;
        }
        Some(FocusSnapshot::new(
            TargetIdentity::InProcess(surface.clone()),
            *cursor,
        ))
    }
}
