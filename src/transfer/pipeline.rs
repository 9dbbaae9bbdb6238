use log::{debug, error, info, warn};
use std::path::Path;

use crate::bridge::bridge_trait::DeviceBridge;
use crate::bridge::remote_command::join_remote;
use crate::bridge::remote_fs::RemoteFs;
use crate::configuration::types::RenamePolicy;
use crate::error_handling::types::TransferError;
use crate::events::{DownloadStatus, DownloadStatusTracker, EventSink};
use crate::transfer::rename::archived_file_name;
use crate::transfer::types::{FileOutcome, TransferBatch, TransferReport};

/// Pulls the reports of one device into a dated host folder.
///
/// A run lists the remote reports directory once, then handles the files strictly in listing
/// order, one bridge command at a time:
/// 1. confirm the entry is not a directory,
/// 2. compute the archival name and skip it if it already exists on the host,
/// 3. pull it into a freshly created file.
///
/// A failing listing aborts the batch with [`DownloadStatus::DownloadFailed`]. A failing file
/// is logged and counted, and the loop moves on. Progress is published after every file.
pub struct TransferPipeline<'a, B: DeviceBridge> {
    fs: RemoteFs<'a, B>,
    reports_path: &'a str,
    output_root: &'a Path,
    rename: RenamePolicy,
    events: EventSink,
    status: DownloadStatusTracker,
}

impl<'a, B: DeviceBridge> TransferPipeline<'a, B> {
    pub fn new(
        fs: RemoteFs<'a, B>,
        reports_path: &'a str,
        output_root: &'a Path,
        rename: RenamePolicy,
        events: EventSink,
    ) -> Self {
        Self {
            fs,
            reports_path,
            output_root,
            rename,
            events,
            status: DownloadStatusTracker::new(),
        }
    }

    /// Runs one batch using `date` (`yyyy-MM-dd`) for the folder name and renaming.
    pub async fn run(&mut self, date: &str) -> Result<TransferReport, TransferError> {
        info!("Fetching reports from {}", self.reports_path);
        self.status = DownloadStatusTracker::new();

        let files = match self.fs.list_files_by_age(self.reports_path).await {
            Ok(files) => files,
            Err(e) => {
                error!("Failed to retrieve file names: {}", e);
                let err = TransferError::ListingFailed(e);
                self.events.error(&err);
                self.status.set(DownloadStatus::DownloadFailed, &self.events);
                return Err(err);
            }
        };

        let destination = self.output_root.join(format!("Reports-{}", date));
        let mut batch = TransferBatch::new(files, destination, self.reports_path, date);
        let mut report = TransferReport {
            total: batch.count(),
            destination: batch.destination.clone(),
            ..Default::default()
        };

        if batch.count() == 0 {
            info!("No reports found in {} (directories ignored)", self.reports_path);
            self.status.set(DownloadStatus::NoReports, &self.events);
            self.events.progress(0, 0);
            return Ok(report);
        }

        info!("[{}] {} report(s) to fetch", batch.id, batch.count());
        if let Err(e) = self.fs.disk_usage(self.reports_path).await {
            warn!("Unable to measure remote reports folder: {}", e);
        }

        self.status.set(DownloadStatus::Downloading, &self.events);
        if let Err(e) = prepare_destination(self.output_root, &batch.destination).await {
            error!(
                "Unable to create destination {}: {}",
                batch.destination.display(),
                e
            );
            let err = TransferError::Io(e);
            self.events.error(&err);
            self.status.set(DownloadStatus::DownloadFailed, &self.events);
            return Err(err);
        }

        for name in batch.files.clone() {
            match self.transfer_one(&batch, &name).await {
                Ok(outcome) => {
                    debug!("[{}] {}: {:?}", batch.id, name, outcome);
                    report.record(outcome);
                }
                Err(e) => {
                    error!("[{}] Failed to transfer {}: {}", batch.id, name, e);
                    report.failed += 1;
                }
            }
            let (done, total) = batch.advance();
            self.events.progress(done, total);
        }

        info!(
            "[{}] Transfer finished: {} downloaded, {} already present, {} directories skipped, {} failed",
            batch.id,
            report.downloaded,
            report.skipped_existing,
            report.skipped_directories,
            report.failed
        );
        self.status
            .set(DownloadStatus::DownloadingComplete, &self.events);
        Ok(report)
    }

    async fn transfer_one(
        &self,
        batch: &TransferBatch,
        name: &str,
    ) -> Result<FileOutcome, TransferError> {
        let remote_path = join_remote(&batch.source, name);

        // The listing marker is not reliable on every filesystem, ask again.
        match self.fs.is_directory(&remote_path).await {
            Ok(true) => {
                debug!("Skipping remote directory {}", name);
                return Ok(FileOutcome::SkippedDirectory);
            }
            Ok(false) => {}
            Err(e) => warn!("Could not determine remote type for {}: {}", name, e),
        }

        let saved_name = archived_file_name(name, &batch.date, &self.rename);
        let destination = batch.destination.join(&saved_name);
        if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
            debug!("File {} already exists, skipping", destination.display());
            return Ok(FileOutcome::SkippedExisting);
        }

        let mut file = match create_exclusive(&destination).await {
            Ok(file) => file,
            Err(TransferError::AlreadyExists(_)) => {
                debug!("File {} appeared concurrently, skipping", destination.display());
                return Ok(FileOutcome::SkippedExisting);
            }
            Err(e) => return Err(e),
        };

        match self.fs.pull(&remote_path, &mut file).await {
            Ok(bytes) => {
                debug!(
                    "Transferred {} to {} ({} bytes)",
                    name,
                    destination.display(),
                    bytes
                );
                Ok(FileOutcome::Downloaded)
            }
            Err(e) => {
                drop(file);
                // A truncated file would be skipped as "already present" by the next run.
                if let Err(rm) = tokio::fs::remove_file(&destination).await {
                    warn!(
                        "Unable to remove partial file {}: {}",
                        destination.display(),
                        rm
                    );
                }
                Err(TransferError::PullFailed(e))
            }
        }
    }
}

async fn prepare_destination(root: &Path, destination: &Path) -> std::io::Result<()> {
    if !tokio::fs::try_exists(root).await.unwrap_or(false) {
        debug!("Creating output directory {}", root.display());
    }
    tokio::fs::create_dir_all(root).await?;
    tokio::fs::create_dir_all(destination).await
}

async fn create_exclusive(path: &Path) -> Result<tokio::fs::File, TransferError> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => TransferError::AlreadyExists(path.to_path_buf()),
            _ => TransferError::Io(e),
        })
}
