//! Connectivity monitoring.
//!
//! Re-exports:
//! - [`ConnectivityMonitor`]: polls the bridge and publishes state changes.
//! - [`ConnectivityState`], [`DeviceSession`]: core types.

pub mod monitor;
pub mod types;

pub use monitor::ConnectivityMonitor;
pub use types::{ConnectivityState, DeviceSession};
