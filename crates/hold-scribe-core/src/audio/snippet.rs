use crate::{CoreResult, audio::wav};

use uuid::Uuid;

/// A block of mono samples tagged with its arrival sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Position in arrival order, starting at zero.
    pub seq: u64,
    /// Mono samples in [-1, 1].
    pub samples: Vec<f32>,
}

/// Proof that the capture device delivered its final chunk.
///
/// Only the recorder can mint one, and only after the flush marker has been
/// received, so holding a value of this type means the chunk stream is complete.
#[derive(Debug)]
pub struct FlushComplete {
    chunks_delivered: u64,
}

impl FlushComplete {
    pub(crate) fn new(chunks_delivered: u64) -> Self {
        Self { chunks_delivered }
    }

    /// Chunks the device reported sending before the flush.
    pub fn chunks_delivered(&self) -> u64 {
        self.chunks_delivered
    }
}

/// The finalized recording of one press session.
#[derive(Debug, Clone)]
pub struct AudioSnippet {
    request_id: Uuid,
    samples: Vec<f32>,
    sample_rate: u32,
    chunk_count: usize,
}

impl AudioSnippet {
    /// Concatenate chunks in sequence order. Requires the flush proof.
    pub(crate) fn finalize(
        request_id: Uuid,
        mut chunks: Vec<AudioChunk>,
        sample_rate: u32,
        _flushed: FlushComplete,
    ) -> Self {
        chunks.sort_by_key(|chunk| chunk.seq);
        let chunk_count = chunks.len();
        let total: usize = chunks.iter().map(|chunk| chunk.samples.len()).sum();

        let mut samples = Vec::with_capacity(total);
        for chunk in chunks {
            samples.extend_from_slice(&chunk.samples);
        }

        Self {
            request_id,
            samples,
            sample_rate,
            chunk_count,
        }
    }

    /// Session this snippet belongs to.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Finalized mono samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Device sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of chunks that made up the snippet.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Recorded length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / u64::from(self.sample_rate)
    }

    /// Root-mean-square level; zero for an empty snippet.
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    /// True when nothing was captured or the level is below `threshold`.
    pub fn is_near_silent(&self, threshold: f32) -> bool {
        self.chunk_count == 0 || self.samples.is_empty() || self.rms() < threshold
    }

    /// PCM16 WAV encoding of the snippet.
    ///
    /// # Errors
    ///
    /// See [`wav::encode_pcm16`].
    pub fn to_wav(&self) -> CoreResult<Vec<u8>> {
        wav::encode_pcm16(&self.samples, self.sample_rate)
    }
}

/// Root-mean-square of a sample block.
pub(crate) fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}
