//! Core types used by the bridge subsystem.

use serde::{Deserialize, Serialize};

/// Raw outcome of one bridge process.
///
/// Never cached: one value per spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed or terminated by a signal.
    pub exit_code: Option<i32>,
    /// Set when the process outlived its budget and was killed.
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// State of a device as reported by the bridge enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    Online,
    Unauthorized,
    Offline,
    /// Any other transient state (`connecting`, `recovery`, `bootloader`...).
    Other(String),
}

impl DeviceState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "device" => DeviceState::Online,
            "unauthorized" => DeviceState::Unauthorized,
            "offline" => DeviceState::Offline,
            other => DeviceState::Other(other.to_string()),
        }
    }
}

/// One line of the device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub serial: String,
    pub state: DeviceState,
}

/// Result of asking the bridge server to start. All variants mean "ready".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStartOutcome {
    Started,
    AlreadyRunning,
    RestartedOutdatedDaemon,
}
