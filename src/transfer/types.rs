//! Core types used by the transfer pipeline.

use std::path::PathBuf;
use uuid::Uuid;

/// One invocation of the fetch operation.
///
/// The file list and its count are fixed once the remote listing completes; only the
/// progress counter moves afterwards, and it never exceeds the count.
#[derive(Debug, Clone)]
pub struct TransferBatch {
    /// Correlates the log lines of one batch.
    pub id: Uuid,
    /// Remote file names, oldest first, directories excluded.
    pub files: Vec<String>,
    /// Host folder receiving the files (`<output>/Reports-<date>`).
    pub destination: PathBuf,
    /// Remote directory the files are read from.
    pub source: String,
    /// `yyyy-MM-dd` stamp used for archival renaming.
    pub date: String,
    current_file: usize,
}

impl TransferBatch {
    pub fn new(files: Vec<String>, destination: PathBuf, source: &str, date: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            files,
            destination,
            source: source.to_string(),
            date: date.to_string(),
            current_file: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.files.len()
    }

    pub fn current_file(&self) -> usize {
        self.current_file
    }

    /// Marks one more file as processed and returns `(done, total)`.
    pub fn advance(&mut self) -> (usize, usize) {
        self.current_file = (self.current_file + 1).min(self.count());
        (self.current_file, self.count())
    }
}

/// What happened to a single remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Downloaded,
    /// The renamed file already exists on the host.
    SkippedExisting,
    /// The remote entry turned out to be a directory.
    SkippedDirectory,
}

/// Summary of one transfer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub total: usize,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub skipped_directories: usize,
    pub failed: usize,
    pub destination: PathBuf,
}

impl TransferReport {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Downloaded => self.downloaded += 1,
            FileOutcome::SkippedExisting => self.skipped_existing += 1,
            FileOutcome::SkippedDirectory => self.skipped_directories += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_never_exceeds_count() {
        let mut batch = TransferBatch::new(
            vec!["a.pdf".into(), "b.csv".into()],
            PathBuf::from("/tmp/out"),
            "sdcard/Documents",
            "2024-01-01",
        );

        assert_eq!(batch.current_file(), 0);
        assert_eq!(batch.advance(), (1, 2));
        assert_eq!(batch.advance(), (2, 2));
        assert_eq!(batch.advance(), (2, 2));
    }
}
