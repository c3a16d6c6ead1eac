//! In-process simulation stubs for headless testing and demos.
//!
//! [`SimVehicle`] stands in for the simulator's controlled actor and records
//! the most recent steering angle; [`SimImu`] produces a deterministic
//! oscillating sample stream.  Together they let the full bridge stack run
//! in tests and CI without a physics engine on the other end.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use velolink_bridge::SteerSink;
use velolink_types::{BridgeError, ImuSample, Vec3};

// ────────────────────────────────────────────────────────────────────────────
// SimVehicle
// ────────────────────────────────────────────────────────────────────────────

/// Simulated vehicle that records the most recent commanded steering angle.
/// Always accepts the command.
///
/// Steering is a single-writer field (the command receiver is the only
/// writer for the session), so an atomic cell holding the `f64` bit pattern
/// is enough — no lock.
pub struct SimVehicle {
    steer_bits: AtomicU64,
}

impl SimVehicle {
    /// Create a vehicle with the steering centred at 0.0.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            steer_bits: AtomicU64::new(0.0_f64.to_bits()),
        })
    }

    /// The most recently applied steering angle.
    pub fn last_steer(&self) -> f64 {
        f64::from_bits(self.steer_bits.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl SteerSink for SimVehicle {
    async fn apply_steer(&self, angle: f64) -> Result<(), BridgeError> {
        self.steer_bits.store(angle.to_bits(), Ordering::Relaxed);
        debug!(angle, "sim vehicle steering updated");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimImu
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic IMU stub: a slow lean oscillation with gravity on the
/// accelerometer's z axis.  Tick `n` always yields the same sample, which
/// keeps test assertions stable.
pub struct SimImu {
    tick: u64,
}

impl SimImu {
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl Default for SimImu {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::source::ImuSource for SimImu {
    fn sample(&mut self) -> ImuSample {
        let t = self.tick as f64 * 0.1;
        self.tick += 1;
        ImuSample {
            accelerometer: Vec3::new(2.0 * t.sin(), 2.0 * t.cos(), 9.81),
            gyroscope: Vec3::new(0.5 * (t * 2.0).sin(), 0.0, 0.1 * t.cos()),
            velocity: Vec3::new(8.0, 0.0, 0.0),
        }
    }
}
