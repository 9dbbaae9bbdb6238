//! Notifications published by the engine.
//!
//! The engine knows nothing about its presentation layer. It pushes [`EngineEvent`]s into an
//! [`EventSink`] (an unbounded channel) and whoever holds the receiving end renders them.
//! Events are delivered in the order they are produced.

use log::{debug, trace};
use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::connectivity::types::ConnectivityState;

/// Outcome of a fetch as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DownloadStatus {
    NoReports,
    Downloading,
    DownloadingComplete,
    DownloadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ConnectivityChanged { state: ConnectivityState },
    DownloadStatusChanged { status: DownloadStatus },
    TransferProgress { done: usize, total: usize },
    Error { cause: String },
}

#[derive(Debug, Clone)]
pub struct EventSink {
    sender: UnboundedSender<EngineEvent>,
}

impl EventSink {
    pub fn channel() -> (EventSink, UnboundedReceiver<EngineEvent>) {
        let (sender, receiver) = unbounded_channel();
        (EventSink { sender }, receiver)
    }

    pub fn emit(&self, event: EngineEvent) {
        trace!("Emitting {:?}", event);
        if self.sender.send(event).is_err() {
            debug!("Event receiver dropped, notification discarded");
        }
    }

    pub fn connectivity(&self, state: ConnectivityState) {
        self.emit(EngineEvent::ConnectivityChanged { state });
    }

    pub fn progress(&self, done: usize, total: usize) {
        self.emit(EngineEvent::TransferProgress { done, total });
    }

    pub fn error(&self, cause: &dyn std::error::Error) {
        self.emit(EngineEvent::Error {
            cause: cause.to_string(),
        });
    }
}

/// Publishes download status changes, suppressing repeats of the last value.
#[derive(Debug, Default)]
pub struct DownloadStatusTracker {
    last: Option<DownloadStatus>,
}

impl DownloadStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the status changed and an event was emitted.
    pub fn set(&mut self, status: DownloadStatus, sink: &EventSink) -> bool {
        if self.last == Some(status) {
            return false;
        }
        debug!("Download status: {:?}", status);
        self.last = Some(status);
        sink.emit(EngineEvent::DownloadStatusChanged { status });
        true
    }
}

/// Drains every event currently queued on `receiver`.
pub fn drain(receiver: &mut UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
