//! The per-tick producer callback, driven by the host clock.
//!
//! Each tick reads one sample from the [`ImuSource`], encodes it, enqueues
//! the payload, and returns.  The enqueue is non-blocking by construction,
//! so a stalled balancer connection can never push network latency into the
//! tick budget — backpressure lands in the queue, not here.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use velolink_bridge::TelemetryProducer;
use velolink_wire::encode_sample;

use crate::source::ImuSource;

/// Tick period observed in the reference deployment (`sensor_tick = 0.1`).
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Run the tick loop until `shutdown` fires or the bridge goes away.
///
/// The loop owns `source` outright; when it returns, the source is dropped
/// with it.  Stopping this driver before releasing the host is the entire
/// deregistration story — no weak references needed.
pub async fn run_tick_loop(
    mut source: impl ImuSource,
    producer: TelemetryProducer,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    // A stalled task must not fire a burst of catch-up ticks; samples are
    // snapshots, not accumulating events.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let payload = encode_sample(&source.sample());
                debug!(len = payload.len(), "tick sample enqueued");
                if producer.enqueue(payload).is_err() {
                    info!("bridge shut down; tick loop exiting");
                    return;
                }
            }
            _ = shutdown.changed() => {
                info!("tick loop stopped");
                return;
            }
        }
    }
}
