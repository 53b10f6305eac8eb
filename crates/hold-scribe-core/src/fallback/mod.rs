//! Short-clip fallback: chunked re-processing of empty or low-confidence
//! recordings.

mod coordinator;
mod job;
mod segment;

pub use {
    coordinator::{FallbackSettings, FallbackSubscription, ShortClipFallbackCoordinator},
    job::{FallbackJobStatus, FallbackRequest, FallbackStatus, ShortClipFallbackJob},
    segment::{pad_to, segment_windows},
};
