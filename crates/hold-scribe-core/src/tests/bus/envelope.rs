use crate::{
    DictationError,
    bus::{ENVELOPE_VERSION, Envelope, LifecycleEvent, PermissionPayload, PressPayload},
    clock::Timestamp,
    permissions::Capability,
};

use serde_json::{Value, json};
use uuid::Uuid;

/// WHAT: Encoded frames carry version, type and payload at the top level
/// WHY: The wire shape is the contract between the two contexts
#[test]
#[allow(clippy::unwrap_used)]
fn given_press_start_when_encoded_then_wire_shape_matches_contract() {
    // Given: A press-start event
    let request_id = Uuid::new_v4();
    let event = LifecycleEvent::PressStart {
        payload: PressPayload {
            request_id,
            timestamp: Timestamp(1200),
        },
    };

    // When: Encoding it
    let frame = Envelope::new(event).encode().unwrap();
    let value: Value = serde_json::from_str(&frame).unwrap();

    // Then: Fields are where consumers expect them
    assert_eq!(value["version"], json!(ENVELOPE_VERSION));
    assert_eq!(value["type"], json!("press-start"));
    assert_eq!(value["payload"]["requestId"], json!(request_id.to_string()));
    assert_eq!(value["payload"]["timestamp"], json!(1200));
}

/// WHAT: Permission events decode with their capability
/// WHY: The UI needs the capability to show remediation
#[test]
#[allow(clippy::unwrap_used)]
fn given_permission_denied_frame_when_decoded_then_capability_present() {
    // Given: A hand-written frame as another process would send it
    let request_id = Uuid::new_v4();
    let frame = json!({
        "version": 1,
        "type": "permission-denied",
        "payload": { "requestId": request_id, "timestamp": 5, "capability": "microphone" }
    })
    .to_string();

    // When: Decoding
    let envelope = Envelope::<LifecycleEvent>::decode(&frame).unwrap();

    // Then: The event is fully populated
    assert_eq!(
        envelope.event,
        LifecycleEvent::PermissionDenied {
            payload: PermissionPayload {
                request_id,
                timestamp: Timestamp(5),
                capability: Capability::Microphone,
            }
        }
    );
}

/// WHAT: Frames without the discriminant, with the wrong version, or with an unknown type are rejected whole
/// WHY: Receivers must never act on a partially understood message
#[test]
fn given_malformed_frames_when_decoded_then_rejected() {
    // Given: A set of malformed frames
    let request_id = Uuid::new_v4();
    let frames = [
        json!({ "version": 1, "payload": { "requestId": request_id, "timestamp": 1 } }),
        json!({ "version": 1, "kind": "press-start", "payload": { "requestId": request_id, "timestamp": 1 } }),
        json!({ "version": 2, "type": "press-start", "payload": { "requestId": request_id, "timestamp": 1 } }),
        json!({ "type": "press-start", "payload": { "requestId": request_id, "timestamp": 1 } }),
        json!({ "version": 1, "type": "press-sideways", "payload": { "requestId": request_id, "timestamp": 1 } }),
        json!({ "version": 1, "type": "press-end", "payload": { "timestamp": 1 } }),
        json!({ "version": 1, "type": 7, "payload": {} }),
        json!(["press-start"]),
    ];

    for frame in frames {
        // When: Decoding
        let result = Envelope::<LifecycleEvent>::decode(&frame.to_string());

        // Then: Rejected as malformed
        assert!(
            matches!(result, Err(DictationError::MalformedEnvelope { .. })),
            "{frame} should be rejected"
        );
    }
}

/// WHAT: A missing discriminant is reported as such
/// WHY: Operators need to see why a frame was dropped
#[test]
fn given_frame_without_type_when_decoded_then_reason_names_discriminant() {
    // Given: A frame with no type
    let frame = r#"{"version":1,"payload":{}}"#;

    // When: Decoding
    let result = Envelope::<LifecycleEvent>::decode(frame);

    // Then: The reason mentions the discriminant
    match result {
        Err(DictationError::MalformedEnvelope { reason, .. }) => {
            assert!(reason.contains("'type'"), "unexpected reason: {reason}");
        }
        other => unreachable!("expected malformed envelope, got {other:?}"),
    }
}
