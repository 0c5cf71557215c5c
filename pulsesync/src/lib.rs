//! Pulsesync is a library implementing a small clock deviation measurement
//! protocol for a shared Ethernet segment.
//!
//! All nodes on the segment take part in an election: the node with the lowest
//! hardware address becomes the time master and broadcasts its wall-clock time
//! once a second as a compact [`TimeSignalPulse`]. Every other node compares
//! each pulse from its chosen master against its own clock and keeps moving
//! statistics of the deviation. The library only measures, it never steers
//! the local clock.
//!
//! # Device interfaces
//! `pulsesync` does not open sockets or read clocks itself. Everything the
//! [`SyncController`] needs from the platform is described by the
//! [`Provider`] trait: timers, sending and receiving link-layer frames,
//! a monotonic clock, a UTC clock and a sink for status reports.
//!
//! On Linux the `pulsesync-linux` crate provides a ready to use raw socket
//! implementation. The [`simulation`] module (enabled for tests and by the
//! `simulation` feature) provides an in-memory network of simulated nodes.

pub mod address;
pub mod config;
mod controller;
pub mod frame;
pub mod provider;
mod pulse;
#[cfg(any(test, feature = "simulation"))]
pub mod simulation;
pub mod statistics;
mod status;
pub mod time;

pub use address::HardwareAddress;
pub use controller::{ElectionState, Role, StartError, SyncController};
pub use frame::{EtherType, LinkFrame};
pub use provider::{Provider, SubscriptionHandle, TimerHandle, TransportError};
pub use pulse::{TimeSignalPulse, PULSE_MAGIC, PULSE_WIRE_SIZE};
pub use statistics::DeviationHistory;
pub use status::Status;
pub use time::{CalendarTime, LinearTime};
