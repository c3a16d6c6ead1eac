//! The seam between the bridge and the simulation host.
//!
//! The command receiver never talks to a physics engine directly.  It applies
//! decoded angles through [`SteerSink`], so the same bridge drives a real
//! simulator connection or an in-process stub (`SimVehicle` in
//! `velolink-host`) interchangeably.

use async_trait::async_trait;
use velolink_types::BridgeError;

/// Receiver of decoded steering angles.
///
/// # Contract
///
/// * `apply_steer` overwrites the vehicle's steering input with `angle`.
///   Commands are idempotent state-overwrites — applying the same angle twice
///   is harmless, and only the most recent value matters.
///
/// * The command receiver is the sole writer of steering for the session
///   (single-client protocol, single receiver task).  Implementations that
///   admit additional writers must serialize the apply themselves.
///
/// # Errors
///
/// A transient host failure should surface as [`BridgeError::Steer`]; the
/// receiver logs it and keeps reading — one rejected command must not tear
/// down the command stream.
#[async_trait]
pub trait SteerSink: Send + Sync {
    async fn apply_steer(&self, angle: f64) -> Result<(), BridgeError>;
}
