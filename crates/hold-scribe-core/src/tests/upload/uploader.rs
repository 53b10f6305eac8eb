use crate::{
    DictationError,
    tests::support::ScriptedService,
    upload::{
        RetryPolicy, SnippetUploader, TransportError, UploadJob, UploadOutcome, UploadRequest,
        UploadResponse, UploadStatus,
    },
};

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    attempt_timeout: Duration::from_secs(2),
    backoff: Duration::from_millis(250),
};

fn uploader(service: Arc<ScriptedService>) -> SnippetUploader {
    SnippetUploader::new(service, POLICY, 0.35)
}

fn request() -> UploadRequest {
    UploadRequest::new(Uuid::new_v4(), vec![1, 2, 3], "audio/wav", 1000)
}

/// WHAT: Network failures are retried up to the cap with the same requestId
/// WHY: The backend deduplicates by requestId, and retries must be bounded
#[tokio::test(start_paused = true)]
async fn given_backend_unreachable_when_uploading_then_cap_respected_and_id_reused() {
    // Given: A service that never answers
    let service = Arc::new(ScriptedService::always(Err(TransportError::Network(
        "connection refused".to_string(),
    ))));
    let uploader = uploader(Arc::clone(&service));
    let request = request();
    let mut job = UploadJob::new(request.request_id());

    // When: Uploading
    let result = uploader.upload(&mut job, &request, &CancellationToken::new()).await;

    // Then: Exactly three attempts, all with the original id, ending failed
    assert!(matches!(result, Err(DictationError::UploadNetworkFailure { attempts: 3, .. })));
    let calls = service.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|m| m.request_id == request.request_id()));
    assert_eq!(job.status(), UploadStatus::Failed);
    assert_eq!(job.attempt(), 3);
    assert!(job.last_error().is_some());
}

/// WHAT: A transient failure followed by success returns the transcript
/// WHY: Retries exist to ride out brief network blips
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_one_timeout_when_retrying_then_second_attempt_succeeds() {
    // Given: Timeout, then a good answer
    let service = Arc::new(ScriptedService::scripted(
        vec![Err(TransportError::Timeout)],
        Ok(UploadResponse::transcript("  hello world ", Some(0.92))),
    ));
    let uploader = uploader(Arc::clone(&service));
    let request = request();
    let mut job = UploadJob::new(request.request_id());

    // When: Uploading
    let outcome = uploader.upload(&mut job, &request, &CancellationToken::new()).await.unwrap();

    // Then: Trimmed transcript after two attempts
    assert_eq!(
        outcome,
        UploadOutcome::Transcript {
            text: "hello world".to_string(),
            confidence: Some(0.92)
        }
    );
    assert_eq!(job.attempt(), 2);
    assert_eq!(job.status(), UploadStatus::Succeeded);
}

/// WHAT: A slow service hits the per-attempt timeout and is retried
/// WHY: A hung connection must not stall the session forever
#[tokio::test(start_paused = true)]
async fn given_hanging_service_when_uploading_then_each_attempt_times_out() {
    // Given: A service slower than the attempt timeout
    let service = Arc::new(
        ScriptedService::always(Ok(UploadResponse::transcript("late", None)))
            .with_delay(Duration::from_secs(10)),
    );
    let uploader = uploader(Arc::clone(&service));
    let request = request();
    let mut job = UploadJob::new(request.request_id());

    // When: Uploading
    let result = uploader.upload(&mut job, &request, &CancellationToken::new()).await;

    // Then: Network failure after the cap
    assert!(matches!(result, Err(DictationError::UploadNetworkFailure { attempts: 3, .. })));
    assert_eq!(service.calls().len(), 3);
}

/// WHAT: Validation and server errors are terminal
/// WHY: Retrying a rejected request cannot succeed and delays the user
#[tokio::test(start_paused = true)]
async fn given_rejection_when_uploading_then_no_retry() {
    // Given: A 422 rejection, and separately an ok=false body
    let cases = [
        Err(TransportError::Rejected {
            status: Some(422),
            message: "unsupported media type".to_string(),
        }),
        Ok(UploadResponse {
            ok: false,
            error_message: Some("audio too long".to_string()),
            ..UploadResponse::default()
        }),
    ];

    for answer in cases {
        let service = Arc::new(ScriptedService::always(answer));
        let uploader = uploader(Arc::clone(&service));
        let request = request();
        let mut job = UploadJob::new(request.request_id());

        // When: Uploading
        let result = uploader.upload(&mut job, &request, &CancellationToken::new()).await;

        // Then: Rejected after a single attempt
        assert!(matches!(result, Err(DictationError::UploadRejected { .. })));
        assert_eq!(service.calls().len(), 1);
        assert_eq!(job.status(), UploadStatus::Failed);
    }
}

/// WHAT: Empty and low-confidence transcripts are classified, not failed
/// WHY: They are routed to the short-clip fallback instead of erroring
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_empty_or_low_confidence_when_uploading_then_flagged_for_fallback() {
    // Given: An empty transcript and a low-confidence one
    let answers = [
        UploadResponse::transcript("   ", None),
        UploadResponse::transcript("uh", Some(0.1)),
    ];

    for answer in answers {
        let service = Arc::new(ScriptedService::always(Ok(answer)));
        let uploader = uploader(service);
        let request = request();
        let mut job = UploadJob::new(request.request_id());

        // When: Uploading
        let outcome = uploader.upload(&mut job, &request, &CancellationToken::new()).await.unwrap();

        // Then: Flagged as empty or low confidence
        assert!(matches!(outcome, UploadOutcome::EmptyOrLowConfidence { .. }));
        assert_eq!(job.status(), UploadStatus::Succeeded);
    }
}

/// WHAT: Cancellation stops retrying immediately
/// WHY: A cancelled session's pending upload must be abandoned
#[tokio::test(start_paused = true)]
async fn given_cancelled_token_when_uploading_then_cancelled_without_retry() {
    // Given: A failing service and an already-cancelled token
    let service = Arc::new(
        ScriptedService::always(Err(TransportError::Network("down".to_string())))
            .with_delay(Duration::from_millis(100)),
    );
    let uploader = uploader(Arc::clone(&service));
    let request = request();
    let mut job = UploadJob::new(request.request_id());
    let cancel = CancellationToken::new();
    cancel.cancel();

    // When: Uploading
    let result = uploader.upload(&mut job, &request, &cancel).await;

    // Then: Cancelled with at most the first attempt started
    assert!(matches!(result, Err(DictationError::Cancelled { .. })));
    assert!(service.calls().len() <= 1);
}
