use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NotInRange(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failure of a single bridge command invocation.
#[derive(Debug)]
pub enum CommandError {
    /// The process did not exit within its budget and was killed.
    Timeout { command: String, timeout_ms: u64 },
    /// The process exited non-zero and wrote to stderr.
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
    SpawnFailed(std::io::Error),
    Io(std::io::Error),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Timeout {
                command,
                timeout_ms,
            } => write!(f, "Command timed out after {}ms: {}", timeout_ms, command),
            CommandError::Failed { exit_code, stderr } => match exit_code {
                Some(code) => write!(f, "Command failed with exit code {}: {}", code, stderr),
                None => write!(f, "Command terminated by signal: {}", stderr),
            },
            CommandError::SpawnFailed(e) => write!(f, "Unable to spawn bridge process: {}", e),
            CommandError::Io(e) => write!(f, "Command IO error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::Io(err)
    }
}

#[derive(Debug)]
pub enum BridgeError {
    ServerStartFailed(String),
    EnumerationFailed(CommandError),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::ServerStartFailed(e) => write!(f, "Bridge server start failed: {}", e),
            BridgeError::EnumerationFailed(e) => write!(f, "Device enumeration failed: {}", e),
        }
    }
}

impl std::error::Error for BridgeError {}

#[derive(Debug)]
pub enum TransferError {
    /// Listing the remote reports directory failed; fatal to the batch.
    ListingFailed(CommandError),
    Io(std::io::Error),
    PullFailed(CommandError),
    /// Destination already present on the host. Callers treat it as a skip.
    AlreadyExists(PathBuf),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::ListingFailed(e) => write!(f, "Remote listing failed: {}", e),
            TransferError::Io(e) => write!(f, "Transfer IO error: {}", e),
            TransferError::PullFailed(e) => write!(f, "File pull failed: {}", e),
            TransferError::AlreadyExists(p) => {
                write!(f, "Destination already exists: {}", p.display())
            }
        }
    }
}

impl std::error::Error for TransferError {}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        TransferError::Io(err)
    }
}

#[derive(Debug)]
pub enum ArchiveError {
    ListingFailed(CommandError),
    Command(CommandError),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::ListingFailed(e) => write!(f, "Archive listing failed: {}", e),
            ArchiveError::Command(e) => write!(f, "Archive command failed: {}", e),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<CommandError> for ArchiveError {
    fn from(err: CommandError) -> Self {
        ArchiveError::Command(err)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    BridgeError(BridgeError),
    TransferError(TransferError),
    NoDevice,
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::BridgeError(e) => write!(f, "Bridge error: {}", e),
            ControllerError::TransferError(e) => write!(f, "Transfer error: {}", e),
            ControllerError::NoDevice => write!(f, "No online device available"),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<BridgeError> for ControllerError {
    fn from(err: BridgeError) -> Self {
        ControllerError::BridgeError(err)
    }
}

impl From<TransferError> for ControllerError {
    fn from(err: TransferError) -> Self {
        ControllerError::TransferError(err)
    }
}
