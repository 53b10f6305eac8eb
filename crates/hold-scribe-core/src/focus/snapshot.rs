use crate::{clock::Timestamp, focus::EditableSurface};

use std::{fmt, sync::Weak};

use serde::{Deserialize, Serialize};

/// Identity of a focused element owned by another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTargetId {
    /// Owning process.
    pub process_id: u32,
    /// Platform handle or hash identifying the element within the process.
    pub element: u64,
}

impl fmt::Display for ExternalTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {} element {:#x}", self.process_id, self.element)
    }
}

/// Selection or caret position, as character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRange {
    /// Start offset.
    pub start: usize,
    /// End offset; equal to `start` for a caret.
    pub end: usize,
}

impl CursorRange {
    /// A collapsed caret at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }
}

/// Who had focus. Never keeps the target alive.
#[derive(Clone)]
pub enum TargetIdentity {
    /// A surface owned by this process, held weakly.
    InProcess(Weak<dyn EditableSurface>),
    /// An element in another application.
    External(ExternalTargetId),
}

impl PartialEq for TargetIdentity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TargetIdentity::InProcess(a), TargetIdentity::InProcess(b)) => Weak::ptr_eq(a, b),
            (TargetIdentity::External(a), TargetIdentity::External(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TargetIdentity {}

impl fmt::Debug for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetIdentity::InProcess(surface) => f
                .debug_tuple("InProcess")
                .field(&surface.as_ptr().cast::<()>())
                .finish(),
            TargetIdentity::External(id) => f.debug_tuple("External").field(id).finish(),
        }
    }
}

/// Focus captured once, at press start.
///
/// Only [`FocusSnapshot::identity`] takes part in comparisons; the cursor is
/// carried so an in-process insert lands where the caret was.
#[derive(Debug, Clone)]
pub struct FocusSnapshot {
    identity: TargetIdentity,
    cursor: Option<CursorRange>,
    captured_at: Timestamp,
}

impl FocusSnapshot {
    /// Snapshot taken now.
    pub fn new(identity: TargetIdentity, cursor: Option<CursorRange>) -> Self {
        Self {
            identity,
            cursor,
            captured_at: Timestamp::now(),
        }
    }

    /// Who had focus.
    pub fn identity(&self) -> &TargetIdentity {
        &self.identity
    }

    /// Cursor at capture time, if the platform reports one.
    pub fn cursor(&self) -> Option<CursorRange> {
        self.cursor
    }

    /// When the snapshot was taken.
    pub fn captured_at(&self) -> Timestamp {
        self.captured_at
    }

    /// Whether `current` refers to the same target.
    pub fn same_target(&self, current: &FocusSnapshot) -> bool {
        self.identity == current.identity
    }
}
