//! Structured shell commands sent to the device.
//!
//! Commands are built from this enum instead of interpolated strings so every path goes
//! through the same normalization and quoting. Paths are converted to forward slashes
//! (hosts may hand us `sdcard\Documents\`) and wrapped in single quotes so spaces and
//! punctuation reach the device shell literally.

use std::fmt;

/// A POSIX command understood by the device shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// `ls -F -tr`: entries oldest first, directories suffixed with `/`.
    ListByAge { dir: String },
    /// `ls -1F`: one entry per line, directories suffixed with `/`.
    ListEntries { dir: String },
    /// Prints `DIR` or `FILE`.
    IsDirectory { path: String },
    /// Prints `OK` when the path is a regular file, nothing otherwise.
    IsFile { path: String },
    MakeDir { path: String },
    /// Copy with stderr folded into stdout; the caller verifies the result.
    Copy { from: String, to: String },
    Remove { path: String },
    DiskUsage { path: String },
}

impl RemoteCommand {
    pub fn list_by_age(dir: &str) -> Self {
        RemoteCommand::ListByAge {
            dir: normalize_remote_dir(dir),
        }
    }

    pub fn list_entries(dir: &str) -> Self {
        RemoteCommand::ListEntries {
            dir: normalize_remote_dir(dir),
        }
    }

    pub fn is_directory(path: &str) -> Self {
        RemoteCommand::IsDirectory {
            path: normalize_remote_path(path),
        }
    }

    pub fn is_file(path: &str) -> Self {
        RemoteCommand::IsFile {
            path: normalize_remote_path(path),
        }
    }

    pub fn make_dir(path: &str) -> Self {
        RemoteCommand::MakeDir {
            path: normalize_remote_dir(path),
        }
    }

    pub fn copy(from: &str, to: &str) -> Self {
        RemoteCommand::Copy {
            from: normalize_remote_path(from),
            to: normalize_remote_path(to),
        }
    }

    pub fn remove(path: &str) -> Self {
        RemoteCommand::Remove {
            path: normalize_remote_path(path),
        }
    }

    pub fn disk_usage(path: &str) -> Self {
        RemoteCommand::DiskUsage {
            path: normalize_remote_dir(path),
        }
    }

    /// Renders the command line handed to the device shell.
    pub fn to_shell(&self) -> String {
        match self {
            RemoteCommand::ListByAge { dir } => format!("ls -F -tr {}", quote(dir)),
            RemoteCommand::ListEntries { dir } => format!("ls -1F {}", quote(dir)),
            RemoteCommand::IsDirectory { path } => {
                format!("[ -d {} ] && echo DIR || echo FILE", quote(path))
            }
            RemoteCommand::IsFile { path } => format!("[ -f {} ] && echo OK", quote(path)),
            RemoteCommand::MakeDir { path } => format!("mkdir -p {}", quote(path)),
            RemoteCommand::Copy { from, to } => format!("cp {} {} 2>&1", quote(from), quote(to)),
            RemoteCommand::Remove { path } => format!("rm {}", quote(path)),
            RemoteCommand::DiskUsage { path } => format!("du -hs {}", quote(path)),
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_shell())
    }
}

/// Converts host separators to `/`.
pub fn normalize_remote_path(path: &str) -> String {
    path.trim().replace('\\', "/")
}

/// Normalizes a directory path and drops trailing separators (a bare `/` is kept).
pub fn normalize_remote_dir(path: &str) -> String {
    let normalized = normalize_remote_path(path);
    let trimmed = normalized.trim_end_matches('/');
    if trimmed.is_empty() && normalized.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Joins a remote directory and an entry name with a single `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    let dir = normalize_remote_dir(dir);
    let name = name.trim().trim_start_matches('/');
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Wraps `value` in single quotes; embedded single quotes become `'\''`.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_separators_are_normalized() {
        assert_eq!(
            normalize_remote_dir("sdcard\\Documents\\Archive\\"),
            "sdcard/Documents/Archive"
        );
        assert_eq!(normalize_remote_dir("/"), "/");
        assert_eq!(
            join_remote("sdcard\\Documents\\", "report 1.pdf"),
            "sdcard/Documents/report 1.pdf"
        );
        assert_eq!(join_remote("/", "x"), "/x");
    }

    #[test]
    fn paths_are_single_quoted() {
        let cmd = RemoteCommand::copy("sdcard/Documents/a b.pdf", "sdcard/Documents/Archive/a b.pdf");
        assert_eq!(
            cmd.to_shell(),
            "cp 'sdcard/Documents/a b.pdf' 'sdcard/Documents/Archive/a b.pdf' 2>&1"
        );
    }

    #[test]
    fn embedded_quote_is_escaped() {
        assert_eq!(quote("it's.pdf"), r"'it'\''s.pdf'");
        assert_eq!(
            RemoteCommand::remove("dir/it's.pdf").to_shell(),
            r"rm 'dir/it'\''s.pdf'"
        );
    }

    #[test]
    fn type_checks_render_expected_markers() {
        assert_eq!(
            RemoteCommand::is_directory("sdcard\\Documents\\x").to_shell(),
            "[ -d 'sdcard/Documents/x' ] && echo DIR || echo FILE"
        );
        assert_eq!(
            RemoteCommand::is_file("a/b").to_shell(),
            "[ -f 'a/b' ] && echo OK"
        );
    }

    #[test]
    fn listings_drop_trailing_separator() {
        assert_eq!(
            RemoteCommand::list_by_age("sdcard/Documents/").to_shell(),
            "ls -F -tr 'sdcard/Documents'"
        );
        assert_eq!(
            RemoteCommand::list_entries("sdcard/Documents/").to_shell(),
            "ls -1F 'sdcard/Documents'"
        );
    }
}
