//! Bridge Trait
//!
//! This module defines the `DeviceBridge` trait, the seam between the orchestration engine
//! and the device-bridge protocol.
//!
//! Implementors are responsible for:
//! - Starting (or reusing) the local bridge server
//! - Enumerating attached devices
//! - Running shell commands on one device
//! - Copying one remote file into a host file stream
//!
//! Every call is bounded by a timeout; no implementation retries on its own.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::remote_command::RemoteCommand;
use crate::bridge::types::{DeviceEntry, ServerStartOutcome};
use crate::error_handling::types::{BridgeError, CommandError};

pub trait DeviceBridge: Send + Sync {
    /// Starts the bridge server. Already running and restarted servers count as ready.
    fn start_server(&self) -> impl Future<Output = Result<ServerStartOutcome, BridgeError>> + Send;

    /// Lists attached devices in enumeration order.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceEntry>, BridgeError>> + Send;

    /// Runs `command` on the device `serial` and returns its stdout.
    fn shell(
        &self,
        serial: &str,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, CommandError>> + Send;

    /// Copies `remote_path` into `destination`, returning the number of bytes written.
    fn pull(
        &self,
        serial: &str,
        remote_path: &str,
        destination: &mut tokio::fs::File,
        timeout: Duration,
    ) -> impl Future<Output = Result<u64, CommandError>> + Send;
}

impl<T: DeviceBridge> DeviceBridge for Arc<T> {
    async fn start_server(&self) -> Result<ServerStartOutcome, BridgeError> {
        (**self).start_server().await
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, BridgeError> {
        (**self).list_devices().await
    }

    async fn shell(
        &self,
        serial: &str,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<String, CommandError> {
        (**self).shell(serial, command, timeout).await
    }

    async fn pull(
        &self,
        serial: &str,
        remote_path: &str,
        destination: &mut tokio::fs::File,
        timeout: Duration,
    ) -> Result<u64, CommandError> {
        (**self).pull(serial, remote_path, destination, timeout).await
    }
}
