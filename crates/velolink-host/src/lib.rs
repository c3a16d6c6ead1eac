//! `velolink-host` – the simulation-host side of the bridge.
//!
//! The simulator itself (physics, rendering, actor control) is an external
//! collaborator; this crate holds the narrow seam the bridge consumes:
//!
//! - [`source`] – the [`ImuSource`] trait supplying one sample per tick.
//! - [`sim`] – in-process stubs ([`SimVehicle`], [`SimImu`]) so the whole
//!   stack runs headless in tests and demos.
//! - [`tick`] – the per-tick producer callback: read, encode, enqueue,
//!   return.  Never blocks on network I/O.

pub mod sim;
pub mod source;
pub mod tick;

pub use sim::{SimImu, SimVehicle};
pub use source::ImuSource;
pub use tick::{DEFAULT_TICK_PERIOD, run_tick_loop};
