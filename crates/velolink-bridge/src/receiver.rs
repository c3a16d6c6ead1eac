//! Command receiver loop.
//!
//! Listens on the configured address for the session lifetime and serves one
//! client at a time: **Listening** → **Serving one connection** → back to
//! **Listening** when the client hangs up.  Additional clients queue in the
//! OS listen backlog until the current one disconnects — a deliberate
//! single-client protocol, so steering has exactly one writer.
//!
//! Inbound traffic is newline-delimited JSON read through a fixed-size
//! buffered reader; a document split across reads is reassembled by the line
//! framing.  Each line is decoded independently: malformed JSON, a
//! non-numeric `angle`, or a transient host error is logged and skipped
//! without dropping the connection.  Best-effort on purpose — one corrupt
//! packet must not tear down the whole command stream.
//!
//! Binding the listener is the one fatal path here; it happens in the
//! supervisor before this loop starts, so a configuration error surfaces at
//! startup instead of being retried forever.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use velolink_types::{LinkEvent, LinkEventPayload};
use velolink_wire::{READ_BUFFER_SIZE, decode_steer};

use crate::sink::SteerSink;

const SOURCE: &str = "velolink-bridge::receiver";

pub(crate) async fn run_receiver(
    listener: TcpListener,
    sink: Arc<dyn SteerSink>,
    events: broadcast::Sender<LinkEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = shutdown.changed() => return,
        };

        info!(%peer, "command client connected");
        let _ = events.send(LinkEvent::new(
            SOURCE,
            LinkEventPayload::CommandClientConnected {
                peer: peer.to_string(),
            },
        ));

        serve_client(stream, peer, &sink, &events, &mut shutdown).await;

        let _ = events.send(LinkEvent::new(
            SOURCE,
            LinkEventPayload::CommandClientClosed {
                peer: peer.to_string(),
            },
        ));

        if *shutdown.borrow() {
            return;
        }
    }
}

/// Serve one connection until EOF, a read error, or shutdown.
async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    sink: &Arc<dyn SteerSink>,
    events: &broadcast::Sender<LinkEvent>,
    shutdown: &mut watch::Receiver<bool>,
) {
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, stream);
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = tokio::select! {
            read = reader.read_until(b'\n', &mut line) => match read {
                Ok(n) => n,
                Err(e) => {
                    warn!(%peer, error = %e, "command read failed; dropping client");
                    return;
                }
            },
            _ = shutdown.changed() => return,
        };
        if n == 0 {
            info!(%peer, "command client closed");
            return;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let cmd = match decode_steer(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!(%peer, error = %e, "malformed command skipped");
                continue;
            }
        };

        // Applied synchronously before the next read; there is no queue on
        // this path.
        match sink.apply_steer(cmd.angle).await {
            Ok(()) => {
                debug!(angle = cmd.angle, "steer applied");
                let _ = events.send(LinkEvent::new(
                    SOURCE,
                    LinkEventPayload::SteerApplied { angle: cmd.angle },
                ));
            }
            Err(e) => {
                warn!(angle = cmd.angle, error = %e, "steer apply failed; continuing");
            }
        }
    }
}
