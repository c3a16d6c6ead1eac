//! [`Bridge`] – owner of the two network loops and the telemetry queue.
//!
//! Started once per session via [`Bridge::spawn`], which:
//!
//! 1. Binds the command listener (a bind failure is configuration, not a
//!    transient fault — it aborts startup with [`BridgeError::Bind`]).
//! 2. Creates the telemetry queue and the status-event channel.
//! 3. Spawns the sender and receiver tasks, which run for the session
//!    lifetime without ever blocking each other: each blocks only on its own
//!    socket I/O or on the queue.
//!
//! The returned [`BridgeHandle`] is the session's only way in: producer
//! handles for the tick callback, a status-event subscription, and
//! [`BridgeHandle::shutdown`], which signals both loops and joins them so no
//! loop is left holding a socket after teardown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::info;

use velolink_types::{BridgeError, LinkEvent};

use crate::queue::{self, TelemetryProducer};
use crate::receiver::run_receiver;
use crate::sender::{DEFAULT_RECONNECT_BACKOFF, run_sender};
use crate::sink::SteerSink;

/// Buffered status events before slow subscribers start lagging.
const EVENT_CAPACITY: usize = 256;

/// Socket endpoints and timing for one bridge session.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Balancer address the telemetry sender dials.
    pub send_addr: SocketAddr,
    /// Local address the command receiver listens on.
    pub receive_addr: SocketAddr,
    /// Interval between outbound connect attempts.
    pub reconnect_backoff: Duration,
}

impl BridgeConfig {
    /// Config with the default 1 s reconnect backoff.
    pub fn new(send_addr: SocketAddr, receive_addr: SocketAddr) -> Self {
        Self {
            send_addr,
            receive_addr,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
        }
    }

    /// Override the reconnect backoff (builder-style).
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }
}

/// The telemetry/control bridge, ready to start.
pub struct Bridge {
    config: BridgeConfig,
    sink: Arc<dyn SteerSink>,
}

impl Bridge {
    /// Create a bridge that applies inbound steering through `sink`.
    pub fn new(config: BridgeConfig, sink: Arc<dyn SteerSink>) -> Self {
        Self { config, sink }
    }

    /// Bind the command listener and start both loops.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Bind`] when the command listener cannot bind —
    /// the one fault in this subsystem that is fatal rather than retried.
    pub async fn spawn(self) -> Result<BridgeHandle, BridgeError> {
        let listener = TcpListener::bind(self.config.receive_addr)
            .await
            .map_err(|e| BridgeError::Bind {
                addr: self.config.receive_addr.to_string(),
                details: e.to_string(),
            })?;
        // Resolved address matters when the config asked for port 0.
        let command_addr = listener.local_addr().map_err(|e| BridgeError::Io(e.to_string()))?;
        info!(send_addr = %self.config.send_addr, %command_addr, "bridge starting");

        let (producer, consumer) = queue::channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sender_task = tokio::spawn(run_sender(
            self.config.send_addr,
            self.config.reconnect_backoff,
            consumer,
            events.clone(),
            shutdown_rx.clone(),
        ));
        let receiver_task = tokio::spawn(run_receiver(
            listener,
            self.sink,
            events.clone(),
            shutdown_rx,
        ));

        Ok(BridgeHandle {
            producer,
            events,
            shutdown: shutdown_tx,
            sender_task,
            receiver_task,
            command_addr,
        })
    }
}

/// Live session handle returned by [`Bridge::spawn`].
pub struct BridgeHandle {
    producer: TelemetryProducer,
    events: broadcast::Sender<LinkEvent>,
    shutdown: watch::Sender<bool>,
    sender_task: JoinHandle<()>,
    receiver_task: JoinHandle<()>,
    command_addr: SocketAddr,
}

impl BridgeHandle {
    /// A producer handle for the per-tick callback.  Clone freely; every
    /// clone feeds the same FIFO.
    pub fn producer(&self) -> TelemetryProducer {
        self.producer.clone()
    }

    /// Subscribe to bridge status events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    /// The address the command listener actually bound (useful when the
    /// config asked for port 0).
    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    /// Signal both loops and wait for them to exit.
    ///
    /// The handle's own producer is dropped first, so a caller that has not
    /// cloned extra producers gets the sender's drain-then-exit path; any
    /// surviving clone elsewhere makes the shutdown signal the effective
    /// stop instead.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        drop(self.producer);
        let _ = self.sender_task.await;
        let _ = self.receiver_task.await;
        info!("bridge stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use velolink_types::ImuSample;
    use velolink_wire::encode_sample;

    struct RecordingSink {
        angles: Mutex<Vec<f64>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                angles: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SteerSink for RecordingSink {
        async fn apply_steer(&self, angle: f64) -> Result<(), velolink_types::BridgeError> {
            self.angles.lock().unwrap().push(angle);
            Ok(())
        }
    }

    async fn spawn_bridge(
        sink: Arc<dyn SteerSink>,
    ) -> (BridgeHandle, TcpListener) {
        // Stand in for the remote balancer.
        let balancer = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = BridgeConfig::new(
            balancer.local_addr().unwrap(),
            "127.0.0.1:0".parse().unwrap(),
        )
        .with_reconnect_backoff(Duration::from_millis(50));
        let handle = Bridge::new(config, sink).spawn().await.unwrap();
        (handle, balancer)
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        // Occupy a port, then ask the bridge to bind the same one.
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = BridgeConfig::new(
            "127.0.0.1:7000".parse().unwrap(),
            occupied.local_addr().unwrap(),
        );
        let result = Bridge::new(config, RecordingSink::new()).spawn().await;
        assert!(matches!(result, Err(BridgeError::Bind { .. })));
    }

    #[tokio::test]
    async fn telemetry_flows_end_to_end_in_order() {
        let (handle, balancer) = spawn_bridge(RecordingSink::new()).await;
        let producer = handle.producer();

        // First sample plain, second with an out-of-range accelerometer.
        producer
            .enqueue(encode_sample(&ImuSample::new(
                (1.0, 2.0, 3.0),
                (4.0, 5.0, 6.0),
                (7.0, 8.0, 9.0),
            )))
            .unwrap();
        producer
            .enqueue(encode_sample(&ImuSample::new(
                (-200.0, 0.0, 0.0),
                (0.0, 0.0, 0.0),
                (0.0, 0.0, 0.0),
            )))
            .unwrap();

        let (stream, _) = balancer.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();

        let first: serde_json::Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert!((first["accel"]["x"].as_f64().unwrap() - 1.0).abs() < 1e-9);
        assert!((first["velocity"]["z"].as_f64().unwrap() - 9.0).abs() < 1e-9);

        let second: serde_json::Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert!((second["accel"]["x"].as_f64().unwrap() - (-99.9)).abs() < 1e-9);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn inbound_commands_reach_the_sink() {
        let sink = RecordingSink::new();
        let (handle, _balancer) = spawn_bridge(sink.clone()).await;

        let mut client = TcpStream::connect(handle.command_addr()).await.unwrap();
        client.write_all(b"{\"angle\": -0.7}\n").await.unwrap();

        timeout(Duration::from_secs(2), async {
            loop {
                if sink.angles.lock().unwrap().as_slice() == [-0.7].as_slice() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("steer applied within deadline");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_joins_both_loops() {
        let (handle, _balancer) = spawn_bridge(RecordingSink::new()).await;
        let command_addr = handle.command_addr();

        timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("shutdown must join both tasks promptly");

        // The listener socket must be released once the receiver exits.
        timeout(Duration::from_secs(2), async {
            loop {
                if TcpListener::bind(command_addr).await.is_ok() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("command port must be free after shutdown");
    }

    #[tokio::test]
    async fn events_report_sender_connection() {
        let (handle, balancer) = spawn_bridge(RecordingSink::new()).await;
        let mut events = handle.subscribe_events();

        // The sender only dials when spawned; give it a payload to deliver
        // so the connect is observable end to end.
        handle.producer().enqueue("{}".to_string()).unwrap();
        let _ = balancer.accept().await.unwrap();

        let event = timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Ok(event)
                        if matches!(
                            event.payload,
                            velolink_types::LinkEventPayload::SenderConnected { .. }
                        ) =>
                    {
                        return event;
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("SenderConnected event within deadline");
        assert_eq!(event.source, "velolink-bridge::sender");

        handle.shutdown().await;
    }
}
