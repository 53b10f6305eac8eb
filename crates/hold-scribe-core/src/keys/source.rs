use crate::{CoreResult, keys::KeyId};

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use tokio::sync::mpsc;
use tracing::warn;

/// Whether a key went down or came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    /// Key pressed (including OS key-repeat).
    Down,
    /// Key released.
    Up,
}

/// A system-wide key signal as delivered by the OS hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// Canonical key identifier.
    pub key: KeyId,
    /// Press or release.
    pub direction: KeyDirection,
    /// When the hook callback observed the event.
    pub at: Instant,
}

impl RawKeyEvent {
    /// A key-down observed now.
    pub fn down(key: &str) -> Self {
        Self::at(key, KeyDirection::Down, Instant::now())
    }

    /// A key-up observed now.
    pub fn up(key: &str) -> Self {
        Self::at(key, KeyDirection::Up, Instant::now())
    }

    /// An event with an explicit observation time.
    pub fn at(key: &str, direction: KeyDirection, at: Instant) -> Self {
        Self {
            key: KeyId::new(key),
            direction,
            at,
        }
    }
}

/// Non-blocking hand-off from a hook callback into the async world.
///
/// `deliver` never waits: when the channel is full the event is counted
/// as dropped, and the matcher's stale-episode healing covers the gap.
#[derive(Debug, Clone)]
pub struct KeyEventSink {
    tx: mpsc::Sender<RawKeyEvent>,
    dropped: Arc<AtomicU64>,
}

impl KeyEventSink {
    /// Create a sink and the receiver the matcher reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RawKeyEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Forward an event; returns false once the receiver is gone.
    pub fn deliver(&self, event: RawKeyEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(key = %event.key, dropped_total = total, "Key event channel full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Number of events dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A pluggable, platform-specific global key hook.
///
/// Implementations run on a dedicated thread and must keep per-event work
/// bounded: map the key, call [`KeyEventSink::deliver`], return.
pub trait KeyEventSource: Send + 'static {
    /// Block delivering events until the hook stops or the sink closes.
    fn run(self: Box<Self>, sink: KeyEventSink) -> CoreResult<()>;
}
