//! Generic `ImuSource` trait for whatever supplies inertial samples.
//!
//! The simulation host registers a per-tick callback that reads one sample
//! and hands it to the bridge.  The tick driver only ever talks to this
//! trait, so a live simulator feed and the in-process
//! [`SimImu`][crate::sim::SimImu] stub are interchangeable.

use velolink_types::ImuSample;

/// Supplier of one inertial-measurement snapshot per simulation tick.
///
/// The tick driver owns its source outright — no weak back-references, no
/// shared registry.  When the driver stops, the source is dropped with it,
/// which is the entire teardown story for this seam.
pub trait ImuSource: Send {
    /// Read the current sample.  Called once per tick, from the tick
    /// driver's task; must not block on I/O.
    fn sample(&mut self) -> ImuSample;
}
