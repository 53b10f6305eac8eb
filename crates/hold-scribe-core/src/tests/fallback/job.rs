use crate::fallback::{FallbackJobStatus, FallbackRequest, ShortClipFallbackJob};

use std::path::PathBuf;

use uuid::Uuid;

fn job() -> ShortClipFallbackJob {
    ShortClipFallbackJob::queued(FallbackRequest {
        clip_id: Uuid::new_v4(),
        source_path: PathBuf::from("clip.wav"),
        forced_language: Some("en".to_string()),
        requested_by: "test".to_string(),
    })
}

/// WHAT: Jobs move queued, processing, succeeded and stop there
/// WHY: Terminal states are final; late updates must not rewrite them
#[test]
fn given_queued_job_when_advancing_then_only_legal_transitions_apply() {
    // Given: A fresh job
    let mut job = job();
    assert_eq!(job.status(), FallbackJobStatus::Queued);

    // When/Then: Succeeding before processing is refused
    assert!(!job.succeed("early".to_string()));
    assert_eq!(job.status(), FallbackJobStatus::Queued);

    // When/Then: Normal path
    assert!(job.start());
    assert!(job.succeed("hi".to_string()));
    assert_eq!(job.status(), FallbackJobStatus::Succeeded);

    // When/Then: Failing after success is refused
    assert!(!job.fail("late"));
    assert_eq!(job.status(), FallbackJobStatus::Succeeded);
}

/// WHAT: The wire status reflects failure and completion time
/// WHY: Subscribers rely on ok, errorMessage and completedAt
#[test]
fn given_failed_job_when_converting_then_status_reports_failure() {
    // Given: A job that failed while queued
    let mut job = job();
    job.fail("queue full");

    // When: Converting to the wire shape
    let status = job.to_status(None);

    // Then: Failure fields populated
    assert!(!status.ok);
    assert_eq!(status.status, FallbackJobStatus::Failed);
    assert_eq!(status.error_message.as_deref(), Some("queue full"));
    assert!(status.completed_at.is_some());
    assert!(status.transcript.is_none());
}

/// WHAT: Status serializes in camelCase with lowercase states
/// WHY: Other processes consume this shape
#[test]
#[allow(clippy::unwrap_used)]
fn given_queued_status_when_serializing_then_wire_shape_matches() {
    // Given: A queued status with an estimate
    let status = job().to_status(Some(3000));

    // When: Serializing
    let json = serde_json::to_value(&status).unwrap();

    // Then: Field names and values follow the wire contract
    assert_eq!(json["status"], "queued");
    assert_eq!(json["estimatedLatencyMs"], 3000);
    assert_eq!(json["ok"], true);
    assert!(json.get("jobId").is_some());
    assert!(json.get("clipId").is_some());
    assert!(json.get("errorMessage").is_none());
}
