//! 16-bit PCM mono WAV packing for uploads and persisted clips.

use crate::{CoreResult, DictationError};

use std::{io::Cursor, panic::Location};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// MIME type of the bytes produced by [`encode_pcm16`].
pub const WAV_MEDIA_TYPE: &str = "audio/wav";

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Pack mono f32 samples (clamped to [-1, 1]) as a PCM16 WAV file.
///
/// # Errors
///
/// Returns [`DictationError::CaptureUnavailable`] if the writer refuses the
/// samples, e.g. when the data would exceed the 4 GiB WAV limit.
#[track_caller]
pub fn encode_pcm16(samples: &[f32], sample_rate: u32) -> CoreResult<Vec<u8>> {
    let location = Location::caller();
    let failed = |e: hound::Error| DictationError::CaptureUnavailable {
        reason: format!("Could not encode recording: {}", e),
        location: ErrorLocation::from(location),
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec(sample_rate)).map_err(failed)?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer.write_sample(value).map_err(failed)?;
        }
        writer.finalize().map_err(failed)?;
    }

    Ok(cursor.into_inner())
}

/// Read back a file written by [`encode_pcm16`]. Returns `(samples, sample_rate)`.
///
/// # Errors
///
/// Returns [`DictationError::CaptureUnavailable`] if the bytes are not mono PCM16.
#[track_caller]
pub fn decode_pcm16(bytes: &[u8]) -> CoreResult<(Vec<f32>, u32)> {
    let location = Location::caller();
    let invalid = |reason: String| DictationError::CaptureUnavailable {
        reason: format!("Unreadable clip: {}", reason),
        location: ErrorLocation::from(location),
    };

    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| invalid(e.to_string()))?;
    let found = reader.spec();
    if found.channels != 1 || found.bits_per_sample != 16 || found.sample_format != SampleFormat::Int {
        return Err(invalid(format!(
            "only mono 16-bit PCM is supported, got {} channel(s) at {} bits",
            found.channels, found.bits_per_sample
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .map(|sample| sample.map(|s| f32::from(s) / f32::from(i16::MAX)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(e.to_string()))?;

    Ok((samples, found.sample_rate))
}
