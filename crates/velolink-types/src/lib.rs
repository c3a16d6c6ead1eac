use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Three-component reading used for accelerometer, gyroscope, and velocity
/// vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// One inertial-measurement snapshot produced per simulation tick.
///
/// Samples are immutable values: the producer callback builds one, hands it
/// to the telemetry queue, and never touches it again.  Clamping and decimal
/// rounding are applied at encode time by `velolink-wire`, not here — the
/// sample carries the raw readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    pub accelerometer: Vec3,
    pub gyroscope: Vec3,
    pub velocity: Vec3,
}

impl ImuSample {
    pub fn new(
        accelerometer: impl Into<Vec3>,
        gyroscope: impl Into<Vec3>,
        velocity: impl Into<Vec3>,
    ) -> Self {
        Self {
            accelerometer: accelerometer.into(),
            gyroscope: gyroscope.into(),
            velocity: velocity.into(),
        }
    }
}

/// A steering-angle command decoded from the inbound command socket.
///
/// The bridge passes the angle through unconstrained; range enforcement is
/// the simulation host's responsibility.  Each command is consumed exactly
/// once — commands are idempotent state-overwrites, so only the most recent
/// value matters and no queue sits on this path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteerCommand {
    pub angle: f64,
}

/// Status event emitted by the bridge loops.
///
/// The bridge publishes these on a broadcast channel so that a UI or CLI can
/// surface link health without the loops knowing about any consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "velolink-bridge::sender"
    pub source: String,
    pub payload: LinkEventPayload,
}

impl LinkEvent {
    pub fn new(source: impl Into<String>, payload: LinkEventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of bridge status carried by a [`LinkEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LinkEventPayload {
    /// The telemetry sender established its outbound connection.
    SenderConnected { addr: String },
    /// The outbound connection was lost; the sender is reconnecting.
    SenderDisconnected { addr: String, reason: String },
    /// A telemetry payload was lost on a failed mid-stream write.
    PayloadLost { reason: String },
    /// A command client connected to the inbound socket.
    CommandClientConnected { peer: String },
    /// The command client disconnected; the receiver is accepting again.
    CommandClientClosed { peer: String },
    /// A decoded steering angle was applied to the vehicle.
    SteerApplied { angle: f64 },
}

/// Global error type spanning wire decoding, socket setup, and steering
/// application.
///
/// Transient network faults (connect refused, reset, broken pipe) never
/// surface through this type to callers outside the bridge — the loops
/// contain and log them.  Only fatal configuration errors (a listener that
/// cannot bind) propagate out of bridge startup.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// UTF-8 decode, JSON parse, or `angle` extraction failed — one unified
    /// decode error for the whole inbound pipeline.
    #[error("Decode Error: {0}")]
    Decode(String),

    /// The command listener could not bind.  Fatal to bridge startup.
    #[error("Bind Error on {addr}: {details}")]
    Bind { addr: String, details: String },

    /// Socket I/O failure on an established connection.
    #[error("Socket Error: {0}")]
    Io(String),

    /// The telemetry queue was closed; the bridge has shut down.
    #[error("Telemetry queue closed")]
    QueueClosed,

    /// The simulation host rejected a steering command.
    #[error("Steer Apply Error: {0}")]
    Steer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imu_sample_serialization_roundtrip() {
        let sample = ImuSample::new((1.0, 2.0, 3.0), (4.0, 5.0, 6.0), (7.0, 8.0, 9.0));
        let json = serde_json::to_string(&sample).unwrap();
        let back: ImuSample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, back);
    }

    #[test]
    fn steer_command_roundtrip() {
        let cmd = SteerCommand { angle: -0.35 };
        let json = serde_json::to_string(&cmd).unwrap();
        let back: SteerCommand = serde_json::from_str(&json).unwrap();
        assert!((back.angle - (-0.35)).abs() < f64::EPSILON);
    }

    #[test]
    fn vec3_from_tuple() {
        let v: Vec3 = (1.5, -2.5, 0.0).into();
        assert!((v.x - 1.5).abs() < f64::EPSILON);
        assert!((v.y - (-2.5)).abs() < f64::EPSILON);
        assert!((v.z - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn link_event_roundtrip() {
        let event = LinkEvent::new(
            "velolink-bridge::sender",
            LinkEventPayload::SenderConnected {
                addr: "127.0.0.1:7000".to_string(),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: LinkEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert_eq!(event.source, back.source);
    }

    #[test]
    fn bridge_error_display() {
        let err = BridgeError::Decode("missing \"angle\" field".to_string());
        assert!(err.to_string().contains("Decode Error"));

        let err2 = BridgeError::Bind {
            addr: "127.0.0.1:7001".to_string(),
            details: "address in use".to_string(),
        };
        assert!(err2.to_string().contains("127.0.0.1:7001"));
    }
}
