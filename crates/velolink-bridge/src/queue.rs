//! Telemetry hand-off queue between the simulation tick and the sender loop.
//!
//! The producer side is called from the per-tick callback, which must stay
//! within a fixed real-time budget — [`TelemetryProducer::enqueue`] therefore
//! never blocks and never drops.  Backpressure is absorbed by growing the
//! queue rather than stalling the tick or discarding samples; the sender
//! drains at whatever rate the network allows.
//!
//! FIFO order is preserved end to end: the single consumer dequeues payloads
//! in exactly the order they were enqueued, each delivered once.

use tokio::sync::mpsc;
use velolink_types::BridgeError;

/// Producer half of the telemetry queue.  Cheap to clone; every clone feeds
/// the same single consumer.
#[derive(Clone, Debug)]
pub struct TelemetryProducer {
    tx: mpsc::UnboundedSender<String>,
}

/// Consumer half of the telemetry queue.  Held exclusively by the sender
/// loop.
#[derive(Debug)]
pub struct TelemetryConsumer {
    rx: mpsc::UnboundedReceiver<String>,
}

/// Create a connected producer/consumer pair over an unbounded FIFO channel.
pub fn channel() -> (TelemetryProducer, TelemetryConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TelemetryProducer { tx }, TelemetryConsumer { rx })
}

impl TelemetryProducer {
    /// Enqueue one encoded payload.  Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::QueueClosed`] once the bridge has shut down and
    /// the consumer is gone — the only condition under which a payload is
    /// refused.
    pub fn enqueue(&self, payload: String) -> Result<(), BridgeError> {
        self.tx.send(payload).map_err(|_| BridgeError::QueueClosed)
    }
}

impl TelemetryConsumer {
    /// Wait for the next payload.
    ///
    /// Returns `None` once every producer has been dropped *and* the buffer
    /// is empty, so already-enqueued payloads are always drained before the
    /// sender observes shutdown.
    pub async fn dequeue(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
