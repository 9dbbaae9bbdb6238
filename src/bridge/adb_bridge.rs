use log::{debug, error, info, warn};
use std::time::Duration;

use crate::bridge::bridge_trait::DeviceBridge;
use crate::bridge::executor::Executor;
use crate::bridge::remote_command::{normalize_remote_path, RemoteCommand};
use crate::bridge::types::{DeviceEntry, DeviceState, ServerStartOutcome};
use crate::configuration::types::CommandTimeouts;
use crate::error_handling::types::{BridgeError, CommandError};

/// [`DeviceBridge`] backed by the `adb` command-line client.
///
/// Every operation spawns one `adb` process through the [`Executor`]:
/// - `adb start-server` for server startup
/// - `adb devices` for enumeration
/// - `adb -s <serial> shell <command>` for remote commands
/// - `adb -s <serial> exec-out cat <path>` for pulls, streamed straight into the host file
pub struct AdbBridge {
    executor: Executor,
    timeouts: CommandTimeouts,
}

impl AdbBridge {
    pub fn new(adb_path: &str, timeouts: CommandTimeouts) -> Self {
        info!("Using bridge client at {}", adb_path);
        Self {
            executor: Executor::new(adb_path, timeouts.output_flush()),
            timeouts,
        }
    }

    fn device_args(serial: &str, service: &str, command: String) -> Vec<String> {
        vec![
            "-s".to_string(),
            serial.to_string(),
            service.to_string(),
            command,
        ]
    }
}

impl DeviceBridge for AdbBridge {
    async fn start_server(&self) -> Result<ServerStartOutcome, BridgeError> {
        debug!("Starting bridge server");
        let result = self
            .executor
            .run(&["start-server".to_string()], self.timeouts.default_timeout())
            .await
            .map_err(|e| BridgeError::ServerStartFailed(e.to_string()))?;

        if result.timed_out {
            error!("Bridge server did not start in time");
            return Err(BridgeError::ServerStartFailed(format!(
                "start-server timed out after {}ms",
                self.timeouts.default_ms
            )));
        }
        if !result.success() {
            let reason = result.stderr.trim().to_string();
            error!("Bridge server failed to start: {}", reason);
            return Err(BridgeError::ServerStartFailed(reason));
        }

        let outcome = parse_start_outcome(&format!("{}\n{}", result.stdout, result.stderr));
        info!("Bridge server status: {:?}", outcome);
        Ok(outcome)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, BridgeError> {
        let output = self
            .executor
            .execute(&["devices".to_string()], self.timeouts.default_timeout())
            .await
            .map_err(BridgeError::EnumerationFailed)?;
        Ok(parse_device_list(&output))
    }

    async fn shell(
        &self,
        serial: &str,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<String, CommandError> {
        let args = Self::device_args(serial, "shell", command.to_shell());
        self.executor.execute(&args, timeout).await
    }

    async fn pull(
        &self,
        serial: &str,
        remote_path: &str,
        destination: &mut tokio::fs::File,
        timeout: Duration,
    ) -> Result<u64, CommandError> {
        let command = format!(
            "cat {}",
            crate::bridge::remote_command::quote(&normalize_remote_path(remote_path))
        );
        let args = Self::device_args(serial, "exec-out", command);
        let written = self.executor.stream_to(&args, destination, timeout).await?;
        if written == 0 {
            warn!("Pulled empty file {}", remote_path);
        }
        Ok(written)
    }
}

/// Interprets the chatter printed by `adb start-server`.
pub fn parse_start_outcome(output: &str) -> ServerStartOutcome {
    let lower = output.to_lowercase();
    if lower.contains("doesn't match") || lower.contains("killing") {
        ServerStartOutcome::RestartedOutdatedDaemon
    } else if lower.contains("started successfully") {
        ServerStartOutcome::Started
    } else {
        ServerStartOutcome::AlreadyRunning
    }
}

/// Parses `adb devices` output into entries, preserving enumeration order.
///
/// Header, daemon chatter (`* daemon ...`) and blank lines are ignored.
pub fn parse_device_list(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(DeviceEntry {
                serial: serial.to_string(),
                state: DeviceState::parse(state),
            })
        })
        .collect()
}
