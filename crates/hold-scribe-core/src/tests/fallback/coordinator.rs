use crate::{
    DictationError,
    audio::{AudioChunk, AudioSnippet, FlushComplete},
    fallback::{FallbackJobStatus, FallbackRequest, FallbackSettings, ShortClipFallbackCoordinator},
    tests::support::{SAMPLE_RATE, ScriptedService, hush},
    upload::{RetryPolicy, SnippetUploader, TransportError, UploadResponse},
};

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn snippet(samples: Vec<f32>) -> AudioSnippet {
    AudioSnippet::finalize(
        Uuid::new_v4(),
        vec![AudioChunk { seq: 0, samples }],
        SAMPLE_RATE,
        FlushComplete::new(1),
    )
}

fn settings(clip_dir: PathBuf) -> FallbackSettings {
    FallbackSettings {
        clip_dir,
        segment: Duration::from_millis(1000),
        overlap: Duration::from_millis(250),
        min_padded: Duration::from_millis(1500),
        queue_capacity: 4,
        ack_timeout: Duration::from_millis(500),
        forced_language: Some("en".to_string()),
    }
}

fn uploader(service: Arc<ScriptedService>) -> SnippetUploader {
    let policy = RetryPolicy {
        max_attempts: 2,
        attempt_timeout: Duration::from_secs(2),
        backoff: Duration::from_millis(10),
    };
    SnippetUploader::new(service, policy, 0.35)
}

/// WHAT: A near-silent clip is acknowledged, then streams processing and succeeded
/// WHY: The session waits on this stream to get the replayed transcript
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_persisted_clip_when_enqueued_then_status_stream_reaches_succeeded() {
    // Given: A coordinator whose service answers each segment
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::scripted(
        vec![Ok(UploadResponse::transcript("hello", Some(0.8)))],
        Ok(UploadResponse::transcript("world", Some(0.8))),
    ));
    let shutdown = CancellationToken::new();
    let (coordinator, _worker) = ShortClipFallbackCoordinator::spawn(
        settings(dir.path().to_path_buf()),
        uploader(Arc::clone(&service)),
        shutdown.clone(),
    );

    let clip = snippet(hush(400));
    let path = coordinator.persist_clip(&clip).await.unwrap();
    assert!(path.exists());
    let mut updates = coordinator.subscribe(clip.request_id());

    // When: Enqueueing
    let ack = coordinator
        .enqueue(
            FallbackRequest {
                clip_id: clip.request_id(),
                source_path: path,
                forced_language: None,
                requested_by: "test".to_string(),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    // Then: Acknowledged as queued with an estimate
    assert!(ack.ok);
    assert_eq!(ack.status, FallbackJobStatus::Queued);
    assert_eq!(ack.clip_id, clip.request_id());
    assert!(ack.estimated_latency_ms.is_some());

    // Then: The stream shows queued, processing, succeeded in order
    let mut seen = Vec::new();
    let mut last = None;
    while let Some(status) = tokio::time::timeout(Duration::from_secs(5), updates.next())
        .await
        .unwrap()
    {
        assert_eq!(status.job_id, ack.job_id);
        seen.push(status.status);
        if status.status.is_terminal() {
            last = Some(status);
            break;
        }
    }
    assert_eq!(
        seen,
        vec![
            FallbackJobStatus::Queued,
            FallbackJobStatus::Processing,
            FallbackJobStatus::Succeeded
        ]
    );

    // Then: 1.5s padded clip in 1s windows with 0.25s overlap is two segments
    let last = last.unwrap();
    assert_eq!(last.transcript.as_deref(), Some("hello world"));
    let calls = service.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|m| m.language.as_deref() == Some("en")));
    assert_ne!(calls[0].request_id, calls[1].request_id);

    shutdown.cancel();
}

/// WHAT: Enqueueing a clip whose file is missing fails with a readable message
/// WHY: The caller shows this message to the user
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_missing_clip_when_enqueued_then_failure_with_message() {
    // Given: A coordinator and a path that does not exist
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::always(Ok(UploadResponse::transcript("x", None))));
    let shutdown = CancellationToken::new();
    let (coordinator, _worker) =
        ShortClipFallbackCoordinator::spawn(settings(dir.path().to_path_buf()), uploader(service), shutdown.clone());
    let clip_id = Uuid::new_v4();
    let mut updates = coordinator.subscribe(clip_id);

    // When: Enqueueing
    let result = coordinator
        .enqueue(
            FallbackRequest {
                clip_id,
                source_path: dir.path().join("missing.wav"),
                forced_language: None,
                requested_by: "test".to_string(),
            },
            CancellationToken::new(),
        )
        .await;

    // Then: Rejected with a message, and a failed status is published
    match result {
        Err(DictationError::FallbackEnqueueFailed { message, .. }) => {
            assert!(message.contains("could not be found"));
        }
        other => unreachable!("expected enqueue failure, got {:?}", other),
    }
    let status = updates.next().await.unwrap();
    assert_eq!(status.status, FallbackJobStatus::Failed);
    assert!(!status.ok);

    shutdown.cancel();
}

/// WHAT: A segment upload failure fails the job with its reason
/// WHY: The session reports the failure instead of waiting forever
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_service_down_when_replaying_then_job_fails() {
    // Given: A service that always times out
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::always(Err(TransportError::Timeout)));
    let shutdown = CancellationToken::new();
    let (coordinator, _worker) =
        ShortClipFallbackCoordinator::spawn(settings(dir.path().to_path_buf()), uploader(service), shutdown.clone());

    let clip = snippet(hush(300));
    let path = coordinator.persist_clip(&clip).await.unwrap();
    let mut updates = coordinator.subscribe(clip.request_id());

    // When: Enqueueing and waiting for the end
    coordinator
        .enqueue(
            FallbackRequest {
                clip_id: clip.request_id(),
                source_path: path,
                forced_language: None,
                requested_by: "test".to_string(),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let finished = tokio::time::timeout(Duration::from_secs(5), updates.finished())
        .await
        .unwrap()
        .unwrap();

    // Then: Failed with a reason naming the segment
    assert_eq!(finished.status, FallbackJobStatus::Failed);
    assert!(finished.error_message.unwrap().contains("Segment 1"));

    shutdown.cancel();
}

/// WHAT: Enqueue fails promptly once the worker has stopped
/// WHY: Acknowledgment must come back within its bound either way
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_stopped_worker_when_enqueued_then_failure_not_hang() {
    // Given: A coordinator whose worker has shut down
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::always(Ok(UploadResponse::transcript("x", None))));
    let shutdown = CancellationToken::new();
    let (coordinator, worker) =
        ShortClipFallbackCoordinator::spawn(settings(dir.path().to_path_buf()), uploader(service), shutdown.clone());
    shutdown.cancel();
    worker.await.unwrap();

    let clip = snippet(hush(200));
    let path = coordinator.persist_clip(&clip).await.unwrap();

    // When: Enqueueing
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        coordinator.enqueue(
            FallbackRequest {
                clip_id: clip.request_id(),
                source_path: path,
                forced_language: None,
                requested_by: "test".to_string(),
            },
            CancellationToken::new(),
        ),
    )
    .await
    .unwrap();

    // Then: A readable failure
    assert!(matches!(result, Err(DictationError::FallbackEnqueueFailed { .. })));
}
