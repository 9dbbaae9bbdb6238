use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::bridge::bridge_trait::DeviceBridge;
use crate::bridge::types::{DeviceEntry, DeviceState, ServerStartOutcome};
use crate::connectivity::types::{ConnectivityState, DeviceSession};
use crate::error_handling::types::BridgeError;
use crate::events::EventSink;

/// Tracks device presence and authorization.
///
/// The monitor is the single writer of the current [`DeviceSession`]. Each poll enumerates
/// the devices, picks the canonical one (the configured serial if present, otherwise the
/// first enumerated device) and replaces the published snapshot. Readers obtain the latest
/// snapshot through a `watch` channel.
///
/// Connectivity events are emitted only when the derived state differs from the last
/// published one, so an idle device produces a single notification rather than one per tick.
pub struct ConnectivityMonitor {
    last_state: ConnectivityState,
    preferred_serial: Option<String>,
    session_tx: watch::Sender<DeviceSession>,
    events: EventSink,
    poll_count: u64,
}

impl ConnectivityMonitor {
    pub fn new(preferred_serial: Option<String>, events: EventSink) -> Self {
        let (session_tx, _) = watch::channel(DeviceSession::pending());
        Self {
            last_state: ConnectivityState::InitPending,
            preferred_serial,
            session_tx,
            events,
            poll_count: 0,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceSession> {
        self.session_tx.subscribe()
    }

    pub fn session(&self) -> DeviceSession {
        self.session_tx.borrow().clone()
    }

    pub fn state(&self) -> ConnectivityState {
        self.last_state
    }

    pub fn set_preferred_serial(&mut self, serial: Option<String>) {
        self.preferred_serial = serial;
    }

    /// Starts or reuses the bridge server.
    ///
    /// Every successful outcome moves the monitor to [`ConnectivityState::AdbServerReady`].
    /// A failure is reported on the error channel and returned; retrying is up to the caller.
    pub async fn start_server<B: DeviceBridge>(
        &mut self,
        bridge: &B,
    ) -> Result<ServerStartOutcome, BridgeError> {
        debug!("Starting bridge server");
        match bridge.start_server().await {
            Ok(outcome) => {
                info!("Bridge server ready ({:?})", outcome);
                self.replace_session(None, ConnectivityState::AdbServerReady);
                Ok(outcome)
            }
            Err(e) => {
                error!("Unable to start bridge server: {}", e);
                self.events.error(&e);
                Err(e)
            }
        }
    }

    /// Runs one poll and returns the derived state.
    ///
    /// An enumeration failure is treated as "no device": the bridge being unreachable and
    /// the device being unplugged look the same to the operator.
    pub async fn poll<B: DeviceBridge>(&mut self, bridge: &B) -> ConnectivityState {
        self.poll_count += 1;
        let devices = match bridge.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Device enumeration failed on poll #{}: {}", self.poll_count, e);
                Vec::new()
            }
        };
        self.observe(&devices)
    }

    /// Derives the connectivity state from one enumeration and publishes it.
    pub fn observe(&mut self, devices: &[DeviceEntry]) -> ConnectivityState {
        let canonical = self
            .preferred_serial
            .as_deref()
            .and_then(|serial| devices.iter().find(|d| d.serial == serial))
            .or_else(|| devices.first());

        let (serial, state) = match canonical {
            None => (None, ConnectivityState::Disconnected),
            Some(device) => {
                let state = match device.state {
                    DeviceState::Online => ConnectivityState::Online,
                    DeviceState::Unauthorized => ConnectivityState::Unauthorized,
                    DeviceState::Offline | DeviceState::Other(_) => {
                        ConnectivityState::Disconnected
                    }
                };
                (Some(device.serial.clone()), state)
            }
        };

        let previous = self.session_tx.borrow().serial.clone();
        if announces_choice(devices.len(), previous.as_deref(), serial.as_deref()) {
            info!(
                "{} devices attached, using {}",
                devices.len(),
                serial.as_deref().unwrap_or_default()
            );
        }

        self.replace_session(serial, state);
        state
    }

    fn replace_session(&mut self, serial: Option<String>, state: ConnectivityState) {
        let session = DeviceSession {
            serial,
            state,
            observed_at: Utc::now(),
        };
        if state == ConnectivityState::Online && self.last_state != state {
            info!(
                "Device connected: {}",
                session.serial.as_deref().unwrap_or_default()
            );
        }
        self.session_tx.send_replace(session);
        self.publish_if_changed(state);
    }

    fn publish_if_changed(&mut self, state: ConnectivityState) -> bool {
        if state == self.last_state {
            return false;
        }
        debug!("Connectivity: {:?} -> {:?}", self.last_state, state);
        self.last_state = state;
        self.events.connectivity(state);
        true
    }
}

/// The choice among several attached devices is logged only when it changes.
fn announces_choice(attached: usize, previous: Option<&str>, chosen: Option<&str>) -> bool {
    attached > 1 && previous != chosen
}
