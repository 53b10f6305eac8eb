use crate::audio::{
    ChunkSink,
    capture::{CaptureEvent, MAX_BUFFER_SAMPLES},
};

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<CaptureEvent>) -> Vec<CaptureEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// WHAT: Chunks are numbered in push order and the flush marker comes last
/// WHY: Arrival order is the snippet order, and flush must close the stream
#[test]
fn given_pushes_when_flushed_then_sequence_ascends_and_marker_is_last() {
    // Given: A sink
    let (sink, mut rx) = ChunkSink::channel();

    // When: Three chunks are pushed, then the stream is flushed
    sink.push(vec![0.1; 4]);
    sink.push(vec![0.2; 4]);
    sink.push(vec![0.3; 4]);
    sink.flush_complete();

    // Then: seq 0,1,2 followed by a flush reporting three chunks
    let events = drain(&mut rx);
    assert_eq!(events.len(), 4);
    for (i, event) in events.iter().take(3).enumerate() {
        assert!(matches!(event, CaptureEvent::Chunk(chunk) if chunk.seq == i as u64));
    }
    assert!(matches!(events[3], CaptureEvent::Flushed { chunks_delivered: 3 }));
}

/// WHAT: Pushes after the flush marker are ignored, and flushing twice is harmless
/// WHY: A late audio callback must not append after the recorder has finalized
#[test]
fn given_flushed_sink_when_pushing_again_then_ignored() {
    // Given: A flushed sink
    let (sink, mut rx) = ChunkSink::channel();
    sink.push(vec![0.5; 8]);
    sink.flush_complete();

    // When: A late callback pushes and the device flushes again
    sink.push(vec![0.9; 8]);
    sink.flush_complete();

    // Then: Only the original chunk and a single marker exist
    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], CaptureEvent::Flushed { chunks_delivered: 1 }));
}

/// WHAT: Interleaved stereo is averaged down to mono
/// WHY: Uploads are mono regardless of the device's channel count
#[test]
fn given_stereo_frames_when_pushed_interleaved_then_mono_average() {
    // Given: A sink and two stereo frames
    let (sink, mut rx) = ChunkSink::channel();
    let stereo = [0.2, 0.4, -0.2, -0.6];

    // When: Pushing interleaved data
    sink.push_interleaved(&stereo, 2);

    // Then: One mono chunk with the per-frame means
    let events = drain(&mut rx);
    let CaptureEvent::Chunk(chunk) = &events[0] else {
        unreachable!("expected a chunk");
    };
    assert_eq!(chunk.samples.len(), 2);
    assert!((chunk.samples[0] - 0.3).abs() < 1e-6);
    assert!((chunk.samples[1] + 0.4).abs() < 1e-6);
}

/// WHAT: Buffered audio is capped at MAX_BUFFER_SAMPLES
/// WHY: Prevents unbounded memory growth if a session is never released
#[test]
fn given_sink_at_capacity_when_pushing_then_excess_dropped() {
    // Given: A sink filled to capacity
    let (sink, mut rx) = ChunkSink::channel();
    sink.push(vec![0.0; MAX_BUFFER_SAMPLES]);

    // When: Pushing one more block
    sink.push(vec![1.0; 1024]);
    sink.flush_complete();

    // Then: The extra block was dropped
    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], CaptureEvent::Flushed { chunks_delivered: 1 }));
}

/// WHAT: The real default input records and flushes through the recorder
/// WHY: Verifies cpal wiring on a machine with a microphone
#[tokio::test]
#[ignore = "requires audio hardware"]
#[allow(clippy::unwrap_used)]
async fn given_hardware_when_recording_briefly_then_snippet_has_audio() {
    let recorder = crate::audio::Recorder::new(
        std::sync::Arc::new(crate::audio::CpalCaptureDevice::new()),
        std::time::Duration::from_secs(2),
    );
    let recording = recorder.open(uuid::Uuid::new_v4()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let snippet = recording.finish().await.unwrap();

    assert!(snippet.chunk_count() > 0);
    assert!(!recorder.is_busy());
}
