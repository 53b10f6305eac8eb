use crate::{
    CoreResult, DictationError,
    bus::{BusEvent, Envelope},
};

use std::{
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Sending half of a typed bus direction.
///
/// Messages travel as encoded frames so that both ends validate exactly
/// what a separate process would see.
#[derive(Debug)]
pub struct BusSender<E> {
    tx: mpsc::Sender<String>,
    _event: PhantomData<fn(E)>,
}

impl<E> Clone for BusSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            _event: PhantomData,
        }
    }
}

impl<E: BusEvent> BusSender<E> {
    /// Encode and send one message. Frames keep their send order.
    pub async fn send(&self, event: E) -> CoreResult<()> {
        let request_id = event.request_id();
        let frame = Envelope::new(event).encode()?;
        trace!(request_id = %request_id, frame = %frame, "Bus send");
        self.send_frame(frame).await
    }

    /// Send an already-encoded frame, e.g. one relayed from another process.
    pub async fn send_frame(&self, frame: String) -> CoreResult<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| DictationError::channel_closed("lifecycle bus"))
    }
}

/// Receiving half of a typed bus direction.
#[derive(Debug)]
pub struct BusReceiver<E> {
    rx: mpsc::Receiver<String>,
    dropped: Arc<AtomicU64>,
    _event: PhantomData<fn() -> E>,
}

impl<E: BusEvent> BusReceiver<E> {
    /// Next well-formed message; malformed frames are logged and skipped.
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            let frame = self.rx.recv().await?;
            match Envelope::<E>::decode(&frame) {
                Ok(envelope) => return Some(envelope.event),
                Err(e) => {
                    let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(error = %e, dropped_total = total, "Dropping malformed bus frame");
                }
            }
        }
    }

    /// Number of frames rejected so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create one bus direction with room for `capacity` in-flight frames.
pub fn channel<E: BusEvent>(capacity: usize) -> (BusSender<E>, BusReceiver<E>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        BusSender {
            tx,
            _event: PhantomData,
        },
        BusReceiver {
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
            _event: PhantomData,
        },
    )
}
