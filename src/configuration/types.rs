use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per call-site budgets for bridge commands, in milliseconds.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTimeouts {
    pub default_ms: u64,
    pub file_check_ms: u64,
    pub mkdir_ms: u64,
    pub copy_ms: u64,
    pub remove_ms: u64,
    pub cleanup_ms: u64,
    pub pull_ms: u64,
    /// Grace window after process exit for trailing output.
    pub output_flush_ms: u64,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            default_ms: 5000,
            file_check_ms: 2000,
            mkdir_ms: 3000,
            copy_ms: 5000,
            remove_ms: 2000,
            cleanup_ms: 3000,
            pull_ms: 60000,
            output_flush_ms: 500,
        }
    }
}

impl CommandTimeouts {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    pub fn file_check(&self) -> Duration {
        Duration::from_millis(self.file_check_ms)
    }

    pub fn mkdir(&self) -> Duration {
        Duration::from_millis(self.mkdir_ms)
    }

    pub fn copy(&self) -> Duration {
        Duration::from_millis(self.copy_ms)
    }

    pub fn remove(&self) -> Duration {
        Duration::from_millis(self.remove_ms)
    }

    pub fn cleanup(&self) -> Duration {
        Duration::from_millis(self.cleanup_ms)
    }

    pub fn pull(&self) -> Duration {
        Duration::from_millis(self.pull_ms)
    }

    pub fn output_flush(&self) -> Duration {
        Duration::from_millis(self.output_flush_ms)
    }
}

/// Retention rules for the remote archive directory.
#[derive(Debug, PartialEq, Clone)]
pub struct ArchivePolicy {
    pub max_archived_files: usize,
    pub reports_path: String,
    pub archive_path: String,
}

/// Extensions that receive the `_Archived_<date>` suffix when saved on the host.
#[derive(Debug, PartialEq, Clone)]
pub struct RenamePolicy {
    pub extensions: Vec<String>,
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self {
            extensions: vec![".pdf".to_string(), ".csv".to_string()],
        }
    }
}
