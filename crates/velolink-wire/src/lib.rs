//! Wire codec for the balancer link.
//!
//! Both directions speak newline-delimited JSON over raw TCP:
//!
//! * **Outbound telemetry** – one IMU snapshot per line, shaped as
//!   `{"accel":{"x","y","z"},"gyro":{"x","y","z"},"velocity":{"x","y","z"}}`.
//!   Accelerometer and gyroscope components are clamped to ±[`CLAMP_LIMIT`]
//!   and every value is rounded to 4 decimal digits.  Clamping and rounding
//!   are part of the wire contract, not display formatting — the balancer
//!   relies on the bound.
//!
//! * **Inbound commands** – one `{"angle": <number>}` document per line.
//!   UTF-8 decode, JSON parse, and field extraction failures all collapse
//!   into a single [`BridgeError::Decode`] so the receiver can skip the
//!   offending line and keep reading.
//!
//! The codec is transport-agnostic; framing (the trailing `\n`) is applied
//! by the sender and stripped by the receiver's line reader.

use serde_json::json;
use velolink_types::{BridgeError, ImuSample, SteerCommand, Vec3};

/// Inclusive magnitude bound applied to accelerometer and gyroscope
/// components before encoding.  Velocity is not clamped.
pub const CLAMP_LIMIT: f64 = 99.9;

/// Capacity of the command receiver's buffered line reader.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Encode one IMU snapshot as a single JSON document (no trailing newline).
///
/// Accelerometer and gyroscope components are clamped to
/// `[-CLAMP_LIMIT, CLAMP_LIMIT]` first, then every component (velocity
/// included) is rounded to 4 decimals.  Clamp-before-round, so a raw 99.95
/// cannot round past the bound.
pub fn encode_sample(sample: &ImuSample) -> String {
    let accel = clamped(sample.accelerometer);
    let gyro = clamped(sample.gyroscope);
    let velocity = sample.velocity;
    json!({
        "accel":    { "x": round4(accel.x),    "y": round4(accel.y),    "z": round4(accel.z) },
        "gyro":     { "x": round4(gyro.x),     "y": round4(gyro.y),     "z": round4(gyro.z) },
        "velocity": { "x": round4(velocity.x), "y": round4(velocity.y), "z": round4(velocity.z) },
    })
    .to_string()
}

/// Decode one inbound line into a [`SteerCommand`].
///
/// The pipeline is UTF-8 text decode → JSON parse → numeric `angle`
/// extraction; whichever stage fails, the caller gets one unified
/// [`BridgeError::Decode`] and the connection stays open.
pub fn decode_steer(raw: &[u8]) -> Result<SteerCommand, BridgeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| BridgeError::Decode(format!("not valid UTF-8: {e}")))?;
    let doc: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| BridgeError::Decode(format!("invalid JSON: {e}")))?;
    let angle = doc
        .get("angle")
        .and_then(|a| a.as_f64())
        .ok_or_else(|| BridgeError::Decode("missing or non-numeric \"angle\" field".to_string()))?;
    Ok(SteerCommand { angle })
}

fn clamped(v: Vec3) -> Vec3 {
    Vec3 {
        x: v.x.clamp(-CLAMP_LIMIT, CLAMP_LIMIT),
        y: v.y.clamp(-CLAMP_LIMIT, CLAMP_LIMIT),
        z: v.z.clamp(-CLAMP_LIMIT, CLAMP_LIMIT),
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample(accel: (f64, f64, f64), gyro: (f64, f64, f64), vel: (f64, f64, f64)) -> ImuSample {
        ImuSample::new(accel, gyro, vel)
    }

    fn field(doc: &Value, group: &str, axis: &str) -> f64 {
        doc[group][axis].as_f64().expect("numeric field")
    }

    #[test]
    fn encoded_sample_has_wire_schema() {
        let encoded = encode_sample(&sample((1.0, 2.0, 3.0), (4.0, 5.0, 6.0), (7.0, 8.0, 9.0)));
        let doc: Value = serde_json::from_str(&encoded).unwrap();
        for group in ["accel", "gyro", "velocity"] {
            for axis in ["x", "y", "z"] {
                assert!(
                    doc[group][axis].is_number(),
                    "missing {group}.{axis} in {encoded}"
                );
            }
        }
        assert!((field(&doc, "accel", "x") - 1.0).abs() < f64::EPSILON);
        assert!((field(&doc, "velocity", "z") - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn accel_and_gyro_are_clamped() {
        let encoded = encode_sample(&sample(
            (150.0, -200.0, 0.0),
            (1000.0, -1000.0, 99.9),
            (0.0, 0.0, 0.0),
        ));
        let doc: Value = serde_json::from_str(&encoded).unwrap();
        assert!((field(&doc, "accel", "x") - 99.9).abs() < 1e-9);
        assert!((field(&doc, "accel", "y") - (-99.9)).abs() < 1e-9);
        assert!((field(&doc, "gyro", "x") - 99.9).abs() < 1e-9);
        assert!((field(&doc, "gyro", "y") - (-99.9)).abs() < 1e-9);
        assert!((field(&doc, "gyro", "z") - 99.9).abs() < 1e-9);
    }

    #[test]
    fn velocity_is_not_clamped() {
        let encoded = encode_sample(&sample((0.0, 0.0, 0.0), (0.0, 0.0, 0.0), (150.0, 0.0, 0.0)));
        let doc: Value = serde_json::from_str(&encoded).unwrap();
        assert!((field(&doc, "velocity", "x") - 150.0).abs() < 1e-9);
    }

    #[test]
    fn values_are_rounded_to_four_decimals() {
        let encoded = encode_sample(&sample(
            (1.23456789, 0.0, 0.0),
            (0.0, 0.0, 0.0),
            (-2.00006, 0.0, 0.0),
        ));
        let doc: Value = serde_json::from_str(&encoded).unwrap();
        assert!((field(&doc, "accel", "x") - 1.2346).abs() < 1e-9);
        assert!((field(&doc, "velocity", "x") - (-2.0001)).abs() < 1e-9);
    }

    #[test]
    fn clamp_happens_before_rounding() {
        // 99.95 rounds to 100.0 if rounded first; clamping first keeps it at
        // the bound.
        let encoded = encode_sample(&sample((99.95, 0.0, 0.0), (0.0, 0.0, 0.0), (0.0, 0.0, 0.0)));
        let doc: Value = serde_json::from_str(&encoded).unwrap();
        assert!((field(&doc, "accel", "x") - 99.9).abs() < 1e-9);
    }

    #[test]
    fn encoded_payload_is_single_line() {
        let encoded = encode_sample(&sample((1.0, 2.0, 3.0), (4.0, 5.0, 6.0), (7.0, 8.0, 9.0)));
        assert!(!encoded.contains('\n'));
    }

    #[test]
    fn decode_valid_command() {
        let cmd = decode_steer(br#"{"angle": 0.5}"#).unwrap();
        assert!((cmd.angle - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_tolerates_surrounding_whitespace() {
        let cmd = decode_steer(b"  {\"angle\": -0.25}\r\n").unwrap();
        assert!((cmd.angle - (-0.25)).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = decode_steer(b"not-json").unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn decode_rejects_missing_angle() {
        let err = decode_steer(br#"{"steer": 0.5}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn decode_rejects_non_numeric_angle() {
        let err = decode_steer(br#"{"angle": "half"}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = decode_steer(&[0xff, 0xfe, 0x7b]).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn decode_integer_angle_is_accepted() {
        let cmd = decode_steer(br#"{"angle": 1}"#).unwrap();
        assert!((cmd.angle - 1.0).abs() < f64::EPSILON);
    }
}
