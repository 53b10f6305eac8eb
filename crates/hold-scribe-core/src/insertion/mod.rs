//! Writing the final transcript into the target captured at press start.

mod bridge;
mod executor;

pub use {
    bridge::{KeystrokeAck, KeystrokeBridge, KeystrokeRequest, KeystrokeRequests, PendingKeystroke, keystroke_bridge},
    executor::{InsertionOutcome, TextInsertionExecutor},
};
