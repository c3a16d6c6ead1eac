//! Telemetry sender loop.
//!
//! A two-state machine running in its own task:
//!
//! * **Disconnected** – dial the balancer address; on failure log, sleep the
//!   backoff interval, and retry.  The loop never terminates on a connect
//!   failure and never propagates one outward.
//!
//! * **Connected** – dequeue one payload at a time and write it as one
//!   newline-framed line.  A write failure (peer reset, broken pipe) drops
//!   the connection and transitions back to Disconnected; a fresh socket is
//!   dialed for the next payload.  The payload that failed mid-stream is
//!   lost, not requeued — the loss is logged and surfaced as a
//!   [`LinkEventPayload::PayloadLost`] event rather than hidden.
//!
//! The loop exits only when the queue closes (every producer dropped) or the
//! shutdown signal fires.  Queue closure is observed *after* the buffer is
//! drained, so enqueued samples still go out during a graceful stop while
//! the connection holds.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use velolink_types::{LinkEvent, LinkEventPayload};

use crate::queue::TelemetryConsumer;

/// Fixed interval between outbound connect attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

const SOURCE: &str = "velolink-bridge::sender";

pub(crate) async fn run_sender(
    addr: SocketAddr,
    backoff: Duration,
    mut queue: TelemetryConsumer,
    events: broadcast::Sender<LinkEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    'session: loop {
        // ── Disconnected: dial with fixed backoff, forever ──────────────────
        let mut stream = loop {
            if *shutdown.borrow() {
                return;
            }
            let attempt = tokio::select! {
                result = TcpStream::connect(addr) => result,
                _ = shutdown.changed() => return,
            };
            match attempt {
                Ok(stream) => break stream,
                Err(e) => {
                    warn!(%addr, error = %e, "balancer connect failed; retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = shutdown.changed() => return,
                    }
                }
            }
        };
        info!(%addr, "connected to balancer");
        let _ = events.send(LinkEvent::new(
            SOURCE,
            LinkEventPayload::SenderConnected {
                addr: addr.to_string(),
            },
        ));

        // ── Connected: one dequeue, one framed write ────────────────────────
        loop {
            let payload = tokio::select! {
                payload = queue.dequeue() => match payload {
                    Some(payload) => payload,
                    None => {
                        info!("telemetry queue closed; sender exiting");
                        return;
                    }
                },
                _ = shutdown.changed() => return,
            };

            if let Err(e) = write_frame(&mut stream, &payload).await {
                warn!(%addr, error = %e, "telemetry write failed; payload lost, reconnecting");
                let _ = events.send(LinkEvent::new(
                    SOURCE,
                    LinkEventPayload::SenderDisconnected {
                        addr: addr.to_string(),
                        reason: e.to_string(),
                    },
                ));
                let _ = events.send(LinkEvent::new(
                    SOURCE,
                    LinkEventPayload::PayloadLost {
                        reason: e.to_string(),
                    },
                ));
                // Dropping the stream closes the socket before a replacement
                // is dialed.
                continue 'session;
            }
        }
    }
}

async fn write_frame(stream: &mut TcpStream, payload: &str) -> std::io::Result<()> {
    stream.write_all(payload.as_bytes()).await?;
    stream.write_all(b"\n").await
}
