//! `velolink-bridge` – the telemetry/control bridge.
//!
//! Streams IMU samples from the simulated vehicle to a remote balancer over
//! an outbound TCP connection, and applies a steering-angle command stream
//! received on an inbound TCP socket — concurrently with, and never blocking,
//! the host's real-time tick loop.
//!
//! # Modules
//!
//! - [`queue`] – unbounded FIFO hand-off between the tick callback and the
//!   sender; enqueue never blocks, nothing is dropped or reordered.
//! - [`sender`] – outbound loop: connect with 1 s backoff forever, then one
//!   newline-framed JSON document per payload; write failure reconnects.
//! - [`receiver`] – inbound loop: one client at a time, per-line decode,
//!   malformed input skipped without dropping the connection.
//! - [`sink`] – the [`SteerSink`] seam through which decoded angles reach
//!   the simulation host.
//! - [`supervisor`] – [`Bridge`] owns the queue, both loops, and shutdown.
//!
//! All network faults are contained inside the two loops; the only error
//! that escapes is a fatal bind failure at startup.

pub mod queue;
pub mod receiver;
pub mod sender;
pub mod sink;
pub mod supervisor;

pub use queue::{TelemetryConsumer, TelemetryProducer};
pub use sender::DEFAULT_RECONNECT_BACKOFF;
pub use sink::SteerSink;
pub use supervisor::{Bridge, BridgeConfig, BridgeHandle};
