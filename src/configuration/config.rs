use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Args;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration of the report puller.
///
/// The structure is read from a TOML file with [`Config::from_file`] and every key may be
/// omitted, in which case the default below applies. Individual values can then be replaced
/// from the command line through [`ConfigOverrides`]. The engine itself never touches the
/// disk to read settings: the controller receives an already validated `Config`.
///
/// # Fields Overview
///
/// - `adb_path`: bridge executable to spawn (`adb` from `PATH` by default)
/// - `serial`: optional device serial; when unset the first enumerated device is used
/// - `reports_path`: device directory holding generated reports
/// - `archive_path`: device directory receiving processed reports
/// - `output_path`: host directory under which dated `Reports-<date>` folders are created
/// - `max_archived_files`: upper bound of files kept in `archive_path`
/// - `poll_interval_ms`: cadence of the connectivity poll
/// - `renamed_extensions`: extensions that get the archival date stamp on save
/// - `timeouts`: per call-site command budgets
///
/// # Examples
///
/// ```toml
/// adb_path = "/opt/platform-tools/adb"
/// reports_path = "sdcard/Documents/"
/// archive_path = "sdcard/Documents/Archive/"
/// output_path = "/home/me/Reports"
/// max_archived_files = 50
///
/// [timeouts]
/// copy_ms = 8000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub adb_path: String,
    pub serial: Option<String>,
    pub reports_path: String,
    pub archive_path: String,
    pub output_path: PathBuf,
    pub max_archived_files: usize,
    pub poll_interval_ms: u64,
    pub renamed_extensions: Vec<String>,
    pub timeouts: CommandTimeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adb_path: "adb".to_string(),
            serial: None,
            reports_path: "sdcard/Documents/".to_string(),
            archive_path: "sdcard/Documents/Archive/".to_string(),
            output_path: PathBuf::from("AemulusXRReporting"),
            max_archived_files: 100,
            poll_interval_ms: 1000,
            renamed_extensions: RenamePolicy::default().extensions,
            timeouts: CommandTimeouts::default(),
        }
    }
}

/// Command-line overrides applied on top of the file configuration.
///
/// Every flag is optional; only the flags actually passed replace file values.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Path of the bridge executable
    ///
    /// # Command Line
    /// Use `--adb-path <PATH>` or the `REPORTPULL_ADB` environment variable
    #[arg(long, env = "REPORTPULL_ADB")]
    pub adb_path: Option<String>,

    /// Serial of the device to talk to
    #[arg(long)]
    pub serial: Option<String>,

    /// Remote directory containing the reports
    #[arg(long)]
    pub reports_path: Option<String>,

    /// Remote directory receiving archived reports
    #[arg(long)]
    pub archive_path: Option<String>,

    /// Host directory receiving the dated report folders
    #[arg(long)]
    pub output_path: Option<PathBuf>,

    /// Maximum number of files kept in the remote archive
    #[arg(long)]
    pub max_archived_files: Option<usize>,

    /// Connectivity poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// Missing keys fall back to their defaults and unknown keys are ignored.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with the command-line overrides applied, re-validated.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
        if let Some(adb_path) = &overrides.adb_path {
            self.adb_path = adb_path.clone();
        }
        if let Some(serial) = &overrides.serial {
            self.serial = Some(serial.clone());
        }
        if let Some(reports_path) = &overrides.reports_path {
            self.reports_path = reports_path.clone();
        }
        if let Some(archive_path) = &overrides.archive_path {
            self.archive_path = archive_path.clone();
        }
        if let Some(output_path) = &overrides.output_path {
            self.output_path = output_path.clone();
        }
        if let Some(max) = overrides.max_archived_files {
            self.max_archived_files = max;
        }
        if let Some(interval) = overrides.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adb_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "adb_path must not be empty".to_string(),
            ));
        }
        if self.reports_path.trim().is_empty() || self.archive_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "reports_path and archive_path must not be empty".to_string(),
            ));
        }
        if self.max_archived_files == 0 {
            return Err(ConfigError::NotInRange(
                "max_archived_files must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NotInRange(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(ext) = self
            .renamed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::InvalidValue(format!(
                "renamed extension '{}' must start with '.'",
                ext
            )));
        }
        let t = &self.timeouts;
        for (name, value) in [
            ("default_ms", t.default_ms),
            ("file_check_ms", t.file_check_ms),
            ("mkdir_ms", t.mkdir_ms),
            ("copy_ms", t.copy_ms),
            ("remove_ms", t.remove_ms),
            ("cleanup_ms", t.cleanup_ms),
            ("pull_ms", t.pull_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::NotInRange(format!(
                    "timeouts.{} must be greater than 0",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn archive_policy(&self) -> ArchivePolicy {
        ArchivePolicy {
            max_archived_files: self.max_archived_files,
            reports_path: self.reports_path.clone(),
            archive_path: self.archive_path.clone(),
        }
    }

    pub fn rename_policy(&self) -> RenamePolicy {
        RenamePolicy {
            extensions: self.renamed_extensions.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap_or_else(|e| panic!("{}", e));

        assert_eq!(config, Config::default());
        assert_eq!(config.max_archived_files, 100);
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.renamed_extensions, vec![".pdf", ".csv"]);
        assert_eq!(config.timeouts.file_check_ms, 2000);
        assert_eq!(config.timeouts.mkdir_ms, 3000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            archive_path = "sdcard/Old/"
            max_archived_files = 5

            [timeouts]
            copy_ms = 9000
            "#,
        )
        .unwrap_or_else(|e| panic!("{}", e));

        assert_eq!(config.archive_path, "sdcard/Old/");
        assert_eq!(config.max_archived_files, 5);
        assert_eq!(config.timeouts.copy_ms, 9000);
        assert_eq!(config.timeouts.remove_ms, 2000);
        assert_eq!(config.reports_path, "sdcard/Documents/");
    }

    #[test]
    fn zero_archive_bound_is_rejected() {
        let result = Config::from_toml_str("max_archived_files = 0");
        assert!(matches!(result, Err(ConfigError::NotInRange(_))));
    }

    #[test]
    fn extension_without_dot_is_rejected() {
        let result = Config::from_toml_str(r#"renamed_extensions = ["pdf"]"#);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let result = Config::from_toml_str("max_archived_files = ");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let overrides = ConfigOverrides {
            serial: Some("1WMHH000000".to_string()),
            max_archived_files: Some(10),
            ..Default::default()
        };
        let config = Config::default()
            .with_overrides(&overrides)
            .unwrap_or_else(|e| panic!("{}", e));

        assert_eq!(config.serial.as_deref(), Some("1WMHH000000"));
        assert_eq!(config.max_archived_files, 10);
        assert_eq!(config.adb_path, "adb");
    }

    #[test]
    fn overrides_are_validated() {
        let overrides = ConfigOverrides {
            poll_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(Config::default().with_overrides(&overrides).is_err());
    }

    #[test]
    fn from_file_reads_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_path = \"/tmp/out\"").unwrap();

        let config = Config::from_file(file.path()).unwrap_or_else(|e| panic!("{}", e));
        assert_eq!(config.output_path, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let result = Config::from_file(Path::new("/nonexistent/reportpull.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
