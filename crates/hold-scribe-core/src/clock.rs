//! Process-wide monotonic timestamps.
//!
//! Both execution contexts live in one process, so a shared origin lets
//! press timestamps from the key hook be compared with session timing in
//! the UI context without consulting the wall clock.

use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

static ORIGIN: OnceLock<Instant> = OnceLock::new();

fn origin() -> Instant {
    *ORIGIN.get_or_init(Instant::now)
}

/// Milliseconds elapsed since the process clock origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The current monotonic time.
    pub fn now() -> Self {
        Self::from_instant(Instant::now())
    }

    /// Convert an `Instant` taken in this process.
    ///
    /// Instants taken before the origin was first observed saturate to zero.
    pub fn from_instant(instant: Instant) -> Self {
        let elapsed = instant.saturating_duration_since(origin());
        Self(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    /// Time from `earlier` to `self`, zero if `earlier` is later.
    pub fn since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}
