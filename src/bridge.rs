//! Device-bridge subsystem.
//!
//! Everything that talks to the device goes through this module:
//! - [`Executor`]: spawns one bridge process per call with a hard timeout.
//! - [`RemoteCommand`]: structured shell commands with quoting and path normalization.
//! - [`DeviceBridge`]: the trait the engine is written against; [`AdbBridge`] implements it
//!   on top of the `adb` client.
//! - [`RemoteFs`]: typed remote filesystem operations bound to one device.

pub mod adb_bridge;
pub mod bridge_trait;
pub mod executor;
#[cfg(test)]
pub mod fake_device;
pub mod remote_command;
pub mod remote_fs;
pub mod types;

pub use adb_bridge::AdbBridge;
pub use bridge_trait::DeviceBridge;
pub use executor::Executor;
pub use remote_command::RemoteCommand;
pub use remote_fs::RemoteFs;
pub use types::{CommandResult, DeviceEntry, DeviceState, ServerStartOutcome};
