pub(crate) mod capture;
mod recorder;
mod snippet;
pub mod wav;

pub use {
    capture::{CaptureDevice, CaptureFormat, ChunkSink, CpalCaptureDevice},
    recorder::{ActiveRecording, Recorder},
    snippet::{AudioChunk, AudioSnippet, FlushComplete},
};

pub(crate) use snippet::rms;
