use crate::{
    bus::{self, BusEvent, LifecycleEvent, PressPayload},
    clock::Timestamp,
};

use uuid::Uuid;

fn press(request_id: Uuid, start: bool) -> LifecycleEvent {
    let payload = PressPayload {
        request_id,
        timestamp: Timestamp::now(),
    };
    if start {
        LifecycleEvent::PressStart { payload }
    } else {
        LifecycleEvent::PressEnd { payload }
    }
}

/// WHAT: Press-start and press-end for the same request arrive in send order
/// WHY: The session manager relies on start-before-end for each requestId
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_interleaved_presses_when_received_then_order_preserved() {
    // Given: A bus and two back-to-back presses
    let (tx, mut rx) = bus::channel::<LifecycleEvent>(16);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    // When: Sending start/end pairs
    for event in [press(first, true), press(first, false), press(second, true), press(second, false)] {
        tx.send(event).await.unwrap();
    }

    // Then: They come out in the same order
    let mut received = Vec::new();
    for _ in 0..4 {
        let event = rx.recv().await.unwrap();
        received.push((event.request_id(), matches!(event, LifecycleEvent::PressStart { .. })));
    }
    assert_eq!(
        received,
        vec![(first, true), (first, false), (second, true), (second, false)]
    );
}

/// WHAT: Malformed frames are dropped and counted while valid ones still flow
/// WHY: One bad sender must not stall or corrupt the stream
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_garbage_between_valid_frames_when_receiving_then_garbage_skipped() {
    // Given: A bus with a bad frame in the middle
    let (tx, mut rx) = bus::channel::<LifecycleEvent>(16);
    let request_id = Uuid::new_v4();
    tx.send(press(request_id, true)).await.unwrap();
    tx.send_frame(r#"{"version":1,"payload":{}}"#.to_string()).await.unwrap();
    tx.send_frame("not json".to_string()).await.unwrap();
    tx.send(press(request_id, false)).await.unwrap();
    drop(tx);

    // When: Draining the receiver
    let mut received = Vec::new();
    while let Some(event) = rx.recv().await {
        received.push(event);
    }

    // Then: Only the valid events arrive and two frames were dropped
    assert_eq!(received.len(), 2);
    assert!(matches!(received[0], LifecycleEvent::PressStart { .. }));
    assert!(matches!(received[1], LifecycleEvent::PressEnd { .. }));
    assert_eq!(rx.dropped(), 2);
}
