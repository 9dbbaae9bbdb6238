use std::fmt;

/// Summary of one archive pass over the remote reports directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Copied into the archive, verified, and removed from the reports directory.
    pub archived: usize,
    /// Already present in the archive; only the source was removed.
    pub deduplicated: usize,
    /// Entries that were not regular files.
    pub skipped: usize,
    /// Entries that hit a timeout or command failure.
    pub failed: usize,
    /// Copies that did not land; the source was left in place.
    pub unverified: usize,
    /// Oldest archive entries removed to respect the retention bound.
    pub pruned: usize,
}

impl fmt::Display for ArchiveReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} archived, {} deduplicated, {} skipped, {} failed, {} unverified, {} pruned",
            self.archived, self.deduplicated, self.skipped, self.failed, self.unverified, self.pruned
        )
    }
}

/// Result of handling one entry of the reports directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Archived,
    Deduplicated,
    NotAFile,
    /// The copy could not be confirmed in the archive.
    Unverified,
}
