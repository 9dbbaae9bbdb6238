//! Core types of the connectivity subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connectivity as published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityState {
    /// Nothing observed yet.
    InitPending,
    /// No usable device; transient bridge states (`offline`, `connecting`...) land here too.
    Disconnected,
    /// A device is attached but has not accepted the host key.
    Unauthorized,
    /// The bridge server is up, no poll has completed yet.
    AdbServerReady,
    Online,
}

/// Snapshot of the canonical device at one poll tick.
///
/// Replaced wholesale on every tick, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSession {
    /// `None` when no device is enumerated.
    pub serial: Option<String>,
    pub state: ConnectivityState,
    pub observed_at: DateTime<Utc>,
}

impl DeviceSession {
    pub fn pending() -> Self {
        Self {
            serial: None,
            state: ConnectivityState::InitPending,
            observed_at: Utc::now(),
        }
    }

    /// Serial of the device when it is fully online.
    pub fn online_serial(&self) -> Option<&str> {
        match self.state {
            ConnectivityState::Online => self.serial.as_deref(),
            _ => None,
        }
    }
}
