use log::{debug, error, info, warn};

use crate::archive::types::{ArchiveReport, EntryOutcome};
use crate::bridge::bridge_trait::DeviceBridge;
use crate::bridge::remote_command::join_remote;
use crate::bridge::remote_fs::{is_directory_entry, RemoteFs};
use crate::configuration::types::ArchivePolicy;
use crate::error_handling::types::{ArchiveError, CommandError};

/// Moves processed reports into the remote archive and keeps the archive bounded.
///
/// Everything happens on the device. A report is only removed from the reports directory
/// once a copy of it is confirmed in the archive, so an interrupted pass never loses a file.
pub struct ArchiveEngine<'a, B: DeviceBridge> {
    fs: RemoteFs<'a, B>,
    policy: ArchivePolicy,
}

impl<'a, B: DeviceBridge> ArchiveEngine<'a, B> {
    pub fn new(fs: RemoteFs<'a, B>, policy: ArchivePolicy) -> Self {
        Self { fs, policy }
    }

    /// Archives every file of the reports directory, then trims the archive.
    ///
    /// Only a failing listing or a failing archive directory creation stops the pass. Errors
    /// on a single entry are logged and counted.
    pub async fn run(&self) -> Result<ArchiveReport, ArchiveError> {
        info!(
            "Archiving {} into {}",
            self.policy.reports_path, self.policy.archive_path
        );

        let entries = self
            .fs
            .list_entries(&self.policy.reports_path)
            .await
            .map_err(ArchiveError::ListingFailed)?;
        self.fs.make_dir(&self.policy.archive_path).await?;

        let mut report = ArchiveReport::default();
        for entry in entries.iter().filter(|e| !is_directory_entry(e)) {
            match self.archive_entry(entry).await {
                Ok(EntryOutcome::Archived) => report.archived += 1,
                Ok(EntryOutcome::Deduplicated) => report.deduplicated += 1,
                Ok(EntryOutcome::NotAFile) => report.skipped += 1,
                Ok(EntryOutcome::Unverified) => report.unverified += 1,
                Err(e) => {
                    error!("Failed to archive {}: {}", entry, e);
                    report.failed += 1;
                }
            }
        }

        report.pruned = self.prune().await?;
        info!("Archive pass finished: {}", report);
        Ok(report)
    }

    async fn archive_entry(&self, name: &str) -> Result<EntryOutcome, CommandError> {
        let source = join_remote(&self.policy.reports_path, name);
        let target = join_remote(&self.policy.archive_path, name);

        if !self.fs.is_file(&source).await? {
            debug!("Skipping {}: not a regular file", source);
            return Ok(EntryOutcome::NotAFile);
        }

        if self.fs.is_file(&target).await? {
            debug!("{} is already archived, removing the source", name);
            self.fs.remove(&source).await?;
            return Ok(EntryOutcome::Deduplicated);
        }

        let output = self.fs.copy(&source, &target).await?;
        if !output.trim().is_empty() {
            warn!("cp {}: {}", name, output.trim());
        }

        if !self.fs.is_file(&target).await? {
            warn!("Copy of {} could not be verified, keeping the source", name);
            return Ok(EntryOutcome::Unverified);
        }

        self.fs.remove(&source).await?;
        debug!("Archived {}", name);
        Ok(EntryOutcome::Archived)
    }

    /// Removes the oldest archive files beyond the retention bound and returns how many went.
    ///
    /// Age is taken from the order of the `ls -tr` listing, oldest first. Entries that are not
    /// regular files are left in place.
    pub async fn prune(&self) -> Result<usize, ArchiveError> {
        let files = self
            .fs
            .list_files_by_age(&self.policy.archive_path)
            .await
            .map_err(ArchiveError::ListingFailed)?;

        let surplus = files.len().saturating_sub(self.policy.max_archived_files);
        if surplus == 0 {
            debug!(
                "Archive holds {} file(s), bound is {}",
                files.len(),
                self.policy.max_archived_files
            );
            return Ok(0);
        }

        info!(
            "Archive holds {} file(s), removing the {} oldest",
            files.len(),
            surplus
        );
        let mut removed = 0;
        // A skipped entry still counts towards the surplus; nothing newer is removed instead.
        for name in files.iter().take(surplus) {
            let path = join_remote(&self.policy.archive_path, name);
            match self.fs.is_file(&path).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Not removing {}: not a regular file", path);
                    continue;
                }
                Err(e) => {
                    error!("Unable to check archived entry {}: {}", path, e);
                    continue;
                }
            }
            match self.fs.remove_for_cleanup(&path).await {
                Ok(()) => removed += 1,
                Err(e) => error!("Failed to remove archived file {}: {}", path, e),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fake_device::{FakeDevice, SERIAL};
    use crate::configuration::types::CommandTimeouts;

    const REPORTS: &str = "sdcard/Documents";
    const ARCHIVE: &str = "sdcard/Documents/Archive";

    fn policy(max: usize) -> ArchivePolicy {
        ArchivePolicy {
            max_archived_files: max,
            reports_path: "sdcard\\Documents\\".to_string(),
            archive_path: "sdcard\\Documents\\Archive\\".to_string(),
        }
    }

    async fn archive(fake: &FakeDevice, max: usize) -> Result<ArchiveReport, ArchiveError> {
        let timeouts = CommandTimeouts::default();
        let engine = ArchiveEngine::new(RemoteFs::new(fake, SERIAL, &timeouts), policy(max));
        engine.run().await
    }

    #[tokio::test]
    async fn reports_move_into_the_archive() {
        let fake = FakeDevice::new(&[REPORTS]);
        fake.add_file("sdcard/Documents/a.pdf", b"a");
        fake.add_file("sdcard/Documents/b.csv", b"b");

        let report = tokio_test::assert_ok!(archive(&fake, 100).await);

        assert_eq!(report.archived, 2);
        assert!(fake.files_in(REPORTS).is_empty());
        assert_eq!(fake.files_in(ARCHIVE), vec!["a.pdf", "b.csv"]);
    }

    #[tokio::test]
    async fn already_archived_file_leaves_a_single_copy() {
        let fake = FakeDevice::new(&[REPORTS, ARCHIVE]);
        fake.add_file("sdcard/Documents/Archive/a.pdf", b"old");
        fake.add_file("sdcard/Documents/a.pdf", b"new");

        let report = archive(&fake, 100).await.unwrap();

        assert_eq!(report.deduplicated, 1);
        assert!(!fake.has_file("sdcard/Documents/a.pdf"));
        assert!(fake.has_file("sdcard/Documents/Archive/a.pdf"));
        assert!(!fake.command_log().iter().any(|c| c.starts_with("cp ")));
    }

    #[tokio::test]
    async fn unverified_copy_never_deletes_the_source() {
        let fake = FakeDevice::new(&[REPORTS]);
        fake.add_file("sdcard/Documents/a.pdf", b"a");
        fake.set_lossy_copy(true);

        let report = archive(&fake, 100).await.unwrap();

        assert_eq!(report.unverified, 1);
        assert_eq!(report.archived, 0);
        assert!(fake.has_file("sdcard/Documents/a.pdf"));
        assert!(!fake
            .command_log()
            .iter()
            .any(|c| c == "rm 'sdcard/Documents/a.pdf'"));
    }

    #[tokio::test]
    async fn a_stalled_entry_does_not_stop_the_pass() {
        let fake = FakeDevice::new(&[REPORTS]);
        fake.add_file("sdcard/Documents/a.pdf", b"a");
        fake.add_file("sdcard/Documents/stuck.pdf", b"s");
        fake.add_file("sdcard/Documents/c.pdf", b"c");
        fake.stall_on("stuck.pdf");

        let report = archive(&fake, 100).await.unwrap();

        assert_eq!(report.archived, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(fake.files_in(REPORTS), vec!["stuck.pdf"]);
    }

    #[tokio::test]
    async fn directories_in_the_reports_folder_are_left_alone() {
        let fake = FakeDevice::new(&[REPORTS, ARCHIVE, "sdcard/Documents/raw"]);
        fake.add_file("sdcard/Documents/a.pdf", b"a");

        let report = archive(&fake, 100).await.unwrap();

        assert_eq!(report.archived, 1);
        assert_eq!(report.skipped, 0);
        assert!(!fake
            .command_log()
            .iter()
            .any(|c| c.contains("'sdcard/Documents/raw'")));
    }

    #[tokio::test]
    async fn archive_is_trimmed_oldest_first() {
        let fake = FakeDevice::new(&[REPORTS, ARCHIVE]);
        for name in ["1.pdf", "2.pdf", "3.pdf", "4.pdf"] {
            fake.add_file(&format!("sdcard/Documents/Archive/{}", name), b"x");
        }
        fake.add_file("sdcard/Documents/5.pdf", b"x");

        let report = archive(&fake, 3).await.unwrap();

        assert_eq!(report.archived, 1);
        assert_eq!(report.pruned, 2);
        assert_eq!(fake.files_in(ARCHIVE), vec!["3.pdf", "4.pdf", "5.pdf"]);
    }

    #[tokio::test]
    async fn cleanup_never_removes_unmarked_non_files() {
        let fake = FakeDevice::new(&[REPORTS, ARCHIVE]);
        fake.add_special("sdcard/Documents/Archive/fifo");
        fake.add_file("sdcard/Documents/Archive/a.pdf", b"x");
        fake.add_file("sdcard/Documents/Archive/b.pdf", b"x");
        let timeouts = CommandTimeouts::default();
        let engine = ArchiveEngine::new(RemoteFs::new(&fake, SERIAL, &timeouts), policy(2));

        assert_eq!(engine.prune().await.unwrap(), 0);

        let log = fake.command_log();
        assert!(log.contains(&"[ -f 'sdcard/Documents/Archive/fifo' ] && echo OK".to_string()));
        assert!(!log.iter().any(|c| c.starts_with("rm ")));
        assert!(fake.has_special("sdcard/Documents/Archive/fifo"));
        assert_eq!(fake.files_in(ARCHIVE), vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn archive_within_bound_is_untouched() {
        let fake = FakeDevice::new(&[REPORTS, ARCHIVE]);
        fake.add_file("sdcard/Documents/Archive/1.pdf", b"x");
        let timeouts = CommandTimeouts::default();
        let engine = ArchiveEngine::new(RemoteFs::new(&fake, SERIAL, &timeouts), policy(1));

        assert_eq!(engine.prune().await.unwrap(), 0);
        assert_eq!(fake.files_in(ARCHIVE), vec!["1.pdf"]);
    }

    #[tokio::test]
    async fn listing_failure_stops_the_pass() {
        let fake = FakeDevice::new(&[REPORTS]);
        fake.add_file("sdcard/Documents/a.pdf", b"a");
        fake.break_listing(REPORTS);

        let result = archive(&fake, 100).await;

        assert!(matches!(result, Err(ArchiveError::ListingFailed(_))));
        assert!(fake.has_file("sdcard/Documents/a.pdf"));
    }
}
