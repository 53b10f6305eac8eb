use crate::{
    audio::{AudioChunk, AudioSnippet, FlushComplete, wav},
    tests::support::{SAMPLE_RATE, hush, tone},
};

use uuid::Uuid;

fn finalize(chunks: Vec<AudioChunk>) -> AudioSnippet {
    let delivered = chunks.len() as u64;
    AudioSnippet::finalize(Uuid::new_v4(), chunks, SAMPLE_RATE, FlushComplete::new(delivered))
}

/// WHAT: Finalization concatenates in sequence order
/// WHY: The snippet must be the chunks in arrival order
#[test]
fn given_chunks_out_of_order_when_finalized_then_sorted_by_seq() {
    // Given: Chunks received with seq 1 before seq 0
    let chunks = vec![
        AudioChunk { seq: 1, samples: vec![0.2, 0.2] },
        AudioChunk { seq: 0, samples: vec![0.1, 0.1] },
    ];

    // When: Finalizing
    let snippet = finalize(chunks);

    // Then: seq 0 samples come first
    assert_eq!(snippet.samples(), &[0.1, 0.1, 0.2, 0.2]);
}

/// WHAT: Zero chunks and low RMS both count as near-silent
/// WHY: Either case routes an empty result to the short-clip fallback
#[test]
fn given_empty_or_quiet_audio_when_checking_silence_then_near_silent() {
    // Given: An empty snippet, a quiet one, and a loud one
    let empty = finalize(vec![]);
    let quiet = finalize(vec![AudioChunk { seq: 0, samples: hush(400) }]);
    let loud = finalize(vec![AudioChunk { seq: 0, samples: tone(400) }]);

    // When/Then: Checking against the default threshold
    assert!(empty.is_near_silent(0.005));
    assert!(quiet.is_near_silent(0.005));
    assert!(!loud.is_near_silent(0.005));
    assert_eq!(quiet.duration_ms(), 400);
}

/// WHAT: WAV packing survives a decode with the same rate and length
/// WHY: The fallback worker re-reads persisted clips
#[test]
#[allow(clippy::unwrap_used)]
fn given_snippet_when_written_as_wav_then_decodes_to_same_shape() {
    // Given: A 250ms tone
    let snippet = finalize(vec![AudioChunk { seq: 0, samples: tone(250) }]);

    // When: Encoding and decoding
    let (samples, rate) = wav::decode_pcm16(&snippet.to_wav().unwrap()).unwrap();

    // Then: Rate and length match and values are close
    assert_eq!(rate, SAMPLE_RATE);
    assert_eq!(samples.len(), snippet.samples().len());
    assert!((samples[10] - snippet.samples()[10]).abs() < 1e-3);
}

/// WHAT: Non-WAV bytes are rejected
/// WHY: A corrupt clip must fail the fallback job with a message, not panic
#[test]
fn given_garbage_bytes_when_decoding_then_error() {
    assert!(wav::decode_pcm16(b"definitely not audio").is_err());
}

/// WHAT: Stereo clips are refused rather than misread
/// WHY: Replaying interleaved frames as mono would double the clip length
#[test]
#[allow(clippy::unwrap_used)]
fn given_stereo_wav_when_decoding_then_error() {
    // Given: A valid two-channel WAV
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    // When: Decoding
    let result = wav::decode_pcm16(&cursor.into_inner());

    // Then: Rejected
    assert!(result.is_err());
}
