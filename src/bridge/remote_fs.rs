//! Typed view of the device filesystem.
//!
//! [`RemoteFs`] binds a [`DeviceBridge`] to one device serial and one set of timeouts, and
//! turns the textual replies of the device shell into values: listings become ordered name
//! lists, type checks become booleans. The parsing tolerates the stray `\r` and `\t`
//! characters the shell layer injects.

use log::{debug, info};
use regex::Regex;
use std::sync::OnceLock;

use crate::bridge::bridge_trait::DeviceBridge;
use crate::bridge::remote_command::RemoteCommand;
use crate::configuration::types::CommandTimeouts;
use crate::error_handling::types::CommandError;

/// Suffix `ls -F` appends to directory entries.
pub const DIRECTORY_MARKER: char = '/';

pub struct RemoteFs<'a, B: DeviceBridge> {
    bridge: &'a B,
    serial: &'a str,
    timeouts: &'a CommandTimeouts,
}

impl<'a, B: DeviceBridge> RemoteFs<'a, B> {
    pub fn new(bridge: &'a B, serial: &'a str, timeouts: &'a CommandTimeouts) -> Self {
        Self {
            bridge,
            serial,
            timeouts,
        }
    }

    /// Lists the files of `dir`, oldest first, sub-directories excluded.
    pub async fn list_files_by_age(&self, dir: &str) -> Result<Vec<String>, CommandError> {
        let output = self
            .bridge
            .shell(
                self.serial,
                &RemoteCommand::list_by_age(dir),
                self.timeouts.default_timeout(),
            )
            .await?;
        debug!("Raw listing of {}: {:?}", dir, output);
        let files = files_only(parse_listing(&output));
        debug!("{} file(s) listed in {}", files.len(), dir);
        Ok(files)
    }

    /// Lists every entry of `dir` one per line, directories keeping their `/` suffix.
    pub async fn list_entries(&self, dir: &str) -> Result<Vec<String>, CommandError> {
        let output = self
            .bridge
            .shell(
                self.serial,
                &RemoteCommand::list_entries(dir),
                self.timeouts.default_timeout(),
            )
            .await?;
        Ok(parse_listing(&output))
    }

    pub async fn is_directory(&self, path: &str) -> Result<bool, CommandError> {
        let output = self
            .bridge
            .shell(
                self.serial,
                &RemoteCommand::is_directory(path),
                self.timeouts.file_check(),
            )
            .await?;
        Ok(output.trim() == "DIR")
    }

    pub async fn is_file(&self, path: &str) -> Result<bool, CommandError> {
        let output = self
            .bridge
            .shell(
                self.serial,
                &RemoteCommand::is_file(path),
                self.timeouts.file_check(),
            )
            .await?;
        Ok(output.trim() == "OK")
    }

    /// Creates `path` and its parents. Existing directories are fine.
    pub async fn make_dir(&self, path: &str) -> Result<(), CommandError> {
        self.bridge
            .shell(self.serial, &RemoteCommand::make_dir(path), self.timeouts.mkdir())
            .await?;
        Ok(())
    }

    /// Copies `from` to `to` and returns whatever `cp` printed.
    pub async fn copy(&self, from: &str, to: &str) -> Result<String, CommandError> {
        self.bridge
            .shell(self.serial, &RemoteCommand::copy(from, to), self.timeouts.copy())
            .await
    }

    pub async fn remove(&self, path: &str) -> Result<(), CommandError> {
        self.bridge
            .shell(self.serial, &RemoteCommand::remove(path), self.timeouts.remove())
            .await?;
        Ok(())
    }

    /// Removal during archive trimming, which runs under its own budget.
    pub async fn remove_for_cleanup(&self, path: &str) -> Result<(), CommandError> {
        self.bridge
            .shell(self.serial, &RemoteCommand::remove(path), self.timeouts.cleanup())
            .await?;
        Ok(())
    }

    /// Returns the human readable size of `dir` as printed by `du -hs`.
    pub async fn disk_usage(&self, dir: &str) -> Result<String, CommandError> {
        let output = self
            .bridge
            .shell(
                self.serial,
                &RemoteCommand::disk_usage(dir),
                self.timeouts.default_timeout(),
            )
            .await?;
        let size = output.split('\t').next().unwrap_or_default().trim().to_string();
        info!("Remote folder {} uses {}B", dir, size);
        Ok(size)
    }

    pub async fn pull(
        &self,
        remote_path: &str,
        destination: &mut tokio::fs::File,
    ) -> Result<u64, CommandError> {
        self.bridge
            .pull(self.serial, remote_path, destination, self.timeouts.pull())
            .await
    }
}

fn control_chars() -> &'static Regex {
    static CONTROL: OnceLock<Regex> = OnceLock::new();
    CONTROL.get_or_init(|| Regex::new(r"\p{Cc}").expect("control character pattern is valid"))
}

/// Splits line-oriented listing output into cleaned, non-empty entries, keeping order.
pub fn parse_listing(output: &str) -> Vec<String> {
    output
        .split('\n')
        .map(|line| control_chars().replace_all(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn is_directory_entry(entry: &str) -> bool {
    entry.ends_with(DIRECTORY_MARKER)
}

/// Drops directory-suffixed entries.
pub fn files_only(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|entry| !is_directory_entry(entry))
        .collect()
}
