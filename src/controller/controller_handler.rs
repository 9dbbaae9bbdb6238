use chrono::Local;
use log::{debug, error, info, warn};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::archive::engine::ArchiveEngine;
use crate::archive::types::ArchiveReport;
use crate::bridge::adb_bridge::AdbBridge;
use crate::bridge::bridge_trait::DeviceBridge;
use crate::bridge::remote_fs::RemoteFs;
use crate::bridge::types::{DeviceEntry, ServerStartOutcome};
use crate::configuration::config::Config;
use crate::connectivity::monitor::ConnectivityMonitor;
use crate::connectivity::types::{ConnectivityState, DeviceSession};
use crate::error_handling::types::*;
use crate::events::{DownloadStatus, EngineEvent, EventSink};
use crate::transfer::pipeline::TransferPipeline;
use crate::transfer::types::TransferReport;

/// Result of one fetch-and-archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub transfer: TransferReport,
    /// `None` when there was nothing to archive or the archive pass could not complete.
    pub archive: Option<ArchiveReport>,
}

/// Entry point of the engine.
///
/// The controller owns the connectivity monitor and runs the transfer and archive passes.
/// All bridge traffic goes through a single operation gate: a poll tick that finds the gate
/// taken is skipped, and a fetch waits for the gate before issuing its first command. At most
/// one bridge command is therefore in flight at any time.
pub struct Controller<B: DeviceBridge> {
    config: RwLock<Config>,
    bridge: B,
    monitor: Mutex<ConnectivityMonitor>,
    operation: Mutex<()>,
    events: EventSink,
    session_rx: watch::Receiver<DeviceSession>,
}

impl Controller<AdbBridge> {
    /// Builds a controller driving the `adb` client named in `config`.
    pub fn with_adb(config: Config, events: EventSink) -> Result<Self, ControllerError> {
        let bridge = AdbBridge::new(&config.adb_path, config.timeouts.clone());
        Self::new(config, bridge, events)
    }
}

impl<B: DeviceBridge> Controller<B> {
    pub fn new(config: Config, bridge: B, events: EventSink) -> Result<Self, ControllerError> {
        info!("Initializing controller");
        config.validate()?;

        let monitor = ConnectivityMonitor::new(config.serial.clone(), events.clone());
        let session_rx = monitor.subscribe();

        Ok(Self {
            config: RwLock::new(config),
            bridge,
            monitor: Mutex::new(monitor),
            operation: Mutex::new(()),
            events,
            session_rx,
        })
    }

    /// Latest device snapshot published by the monitor.
    pub fn session(&self) -> DeviceSession {
        self.session_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceSession> {
        self.session_rx.clone()
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Replaces the configuration once the running operation, if any, has finished.
    ///
    /// Bridge client settings (`adb_path`, timeouts used by the client itself) are fixed when
    /// the controller is built.
    pub async fn update_config(&self, config: Config) -> Result<(), ControllerError> {
        config.validate()?;
        let _gate = self.operation.lock().await;
        self.monitor
            .lock()
            .await
            .set_preferred_serial(config.serial.clone());
        *self.config.write().await = config;
        info!("Configuration updated");
        Ok(())
    }

    /// Starts or reuses the bridge server. Retrying after a failure is up to the caller.
    pub async fn start_server(&self) -> Result<ServerStartOutcome, ControllerError> {
        let _gate = self.operation.lock().await;
        let outcome = self.monitor.lock().await.start_server(&self.bridge).await?;
        Ok(outcome)
    }

    /// Runs one connectivity poll unless another operation holds the bridge.
    pub async fn poll_once(&self) -> Option<ConnectivityState> {
        let Ok(_gate) = self.operation.try_lock() else {
            debug!("Bridge busy, skipping poll");
            return None;
        };
        Some(self.monitor.lock().await.poll(&self.bridge).await)
    }

    /// Starts the bridge server and polls connectivity until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ControllerError> {
        info!("Starting controller");
        self.start_server().await?;

        let mut period = self.config.read().await.poll_interval();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown requested, stopping device polling");
                    break;
                }
                _ = ticker.tick() => {}
            }
            self.poll_once().await;

            let current = self.config.read().await.poll_interval();
            if current != period {
                debug!("Poll interval changed to {:?}", current);
                period = current;
                ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }
        }
        Ok(())
    }

    /// Enumerates attached devices.
    pub async fn list_devices(&self) -> Result<Vec<DeviceEntry>, ControllerError> {
        let _gate = self.operation.lock().await;
        Ok(self.bridge.list_devices().await?)
    }

    /// Fetches the reports of the online device into today's folder, then archives them.
    pub async fn fetch(&self) -> Result<FetchOutcome, ControllerError> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        self.fetch_dated(&date).await
    }

    /// Same as [`Controller::fetch`] with an explicit `yyyy-MM-dd` stamp.
    pub async fn fetch_dated(&self, date: &str) -> Result<FetchOutcome, ControllerError> {
        let _gate = self.operation.lock().await;

        // The snapshot may be a full poll interval old.
        let state = self.monitor.lock().await.poll(&self.bridge).await;
        let session = self.session();
        let Some(serial) = session.online_serial() else {
            warn!("Fetch requested but no device is online ({:?})", state);
            let err = ControllerError::NoDevice;
            self.events.error(&err);
            self.events.emit(EngineEvent::DownloadStatusChanged {
                status: DownloadStatus::DownloadFailed,
            });
            return Err(err);
        };

        let config = self.config.read().await.clone();
        info!("Starting fetch from device {}", serial);

        let fs = RemoteFs::new(&self.bridge, serial, &config.timeouts);
        let mut pipeline = TransferPipeline::new(
            fs,
            &config.reports_path,
            &config.output_path,
            config.rename_policy(),
            self.events.clone(),
        );
        let transfer = pipeline.run(date).await?;
        if transfer.total == 0 {
            debug!("Nothing was transferred, archive pass skipped");
            return Ok(FetchOutcome {
                transfer,
                archive: None,
            });
        }

        // The transfer status stays DownloadingComplete whatever happens here.
        let fs = RemoteFs::new(&self.bridge, serial, &config.timeouts);
        let archive = match ArchiveEngine::new(fs, config.archive_policy()).run().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Archive pass failed: {}", e);
                self.events.error(&e);
                None
            }
        };

        Ok(FetchOutcome { transfer, archive })
    }
}
