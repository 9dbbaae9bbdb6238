//! In-memory device used by the test suites.
//!
//! `FakeDevice` interprets [`RemoteCommand`]s against a tiny filesystem model and answers the
//! way the device shell does (same markers, same line-oriented listings with `\r\n`
//! endings). Faults can be injected per command so the pipelines can be exercised against a
//! flaky transport.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::bridge::bridge_trait::DeviceBridge;
use crate::bridge::remote_command::{join_remote, normalize_remote_dir, RemoteCommand};
use crate::bridge::types::{DeviceEntry, DeviceState, ServerStartOutcome};
use crate::error_handling::types::{BridgeError, CommandError};

pub const SERIAL: &str = "1WMHH815K10925";

#[derive(Default)]
struct FakeState {
    dirs: BTreeSet<String>,
    /// path -> (modification tick, content)
    files: BTreeMap<String, (u64, Vec<u8>)>,
    /// Entries that are neither files nor directories (fifos, sockets), listed without marker.
    specials: BTreeMap<String, u64>,
    tick: u64,
    devices: Vec<DeviceEntry>,
    server: Option<Result<ServerStartOutcome, String>>,
    /// Rendered commands containing one of these fragments time out.
    stalls: HashSet<String>,
    /// `cp` reports nothing but the destination never appears.
    lossy_copy: bool,
    /// Listings of these directories fail outright.
    broken_listings: HashSet<String>,
    log: Vec<String>,
}

pub struct FakeDevice {
    state: Mutex<FakeState>,
}

impl FakeDevice {
    /// A device that is online and holds the given directories.
    pub fn new(dirs: &[&str]) -> Self {
        let device = Self {
            state: Mutex::new(FakeState::default()),
        };
        {
            let mut state = device.lock();
            state.devices = vec![DeviceEntry {
                serial: SERIAL.to_string(),
                state: DeviceState::Online,
            }];
            state.server = Some(Ok(ServerStartOutcome::AlreadyRunning));
            for dir in dirs {
                insert_dir(&mut state, &normalize_remote_dir(dir));
            }
        }
        device
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a file; later calls are "newer" in listing order.
    pub fn add_file(&self, path: &str, content: &[u8]) {
        let mut state = self.lock();
        state.tick += 1;
        let tick = state.tick;
        state
            .files
            .insert(normalize_remote_dir(path), (tick, content.to_vec()));
    }

    pub fn add_special(&self, path: &str) {
        let mut state = self.lock();
        state.tick += 1;
        let tick = state.tick;
        state.specials.insert(normalize_remote_dir(path), tick);
    }

    pub fn has_special(&self, path: &str) -> bool {
        self.lock().specials.contains_key(&normalize_remote_dir(path))
    }

    pub fn add_dir(&self, path: &str) {
        let mut state = self.lock();
        insert_dir(&mut state, &normalize_remote_dir(path));
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.lock().files.contains_key(&normalize_remote_dir(path))
    }

    /// File names directly inside `dir`, oldest first.
    pub fn files_in(&self, dir: &str) -> Vec<String> {
        let state = self.lock();
        let dir = normalize_remote_dir(dir);
        children(&state, &dir)
            .into_iter()
            .filter(|(name, is_dir, _)| {
                !is_dir && state.files.contains_key(&join_remote(&dir, name))
            })
            .map(|(name, _, _)| name)
            .collect()
    }

    pub fn set_devices(&self, devices: Vec<DeviceEntry>) {
        self.lock().devices = devices;
    }

    pub fn set_server_result(&self, result: Result<ServerStartOutcome, String>) {
        self.lock().server = Some(result);
    }

    pub fn stall_on(&self, fragment: &str) {
        self.lock().stalls.insert(fragment.to_string());
    }

    pub fn set_lossy_copy(&self, lossy: bool) {
        self.lock().lossy_copy = lossy;
    }

    pub fn break_listing(&self, dir: &str) {
        self.lock()
            .broken_listings
            .insert(normalize_remote_dir(dir));
    }

    /// Every command received, rendered as shell text.
    pub fn command_log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    fn interpret(&self, command: &RemoteCommand, timeout: Duration) -> Result<String, CommandError> {
        let mut state = self.lock();
        let rendered = command.to_shell();
        state.log.push(rendered.clone());

        if state.stalls.iter().any(|fragment| rendered.contains(fragment)) {
            return Err(CommandError::Timeout {
                command: rendered,
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        match command {
            RemoteCommand::ListByAge { dir } | RemoteCommand::ListEntries { dir } => {
                if state.broken_listings.contains(dir) {
                    return Err(CommandError::Failed {
                        exit_code: Some(1),
                        stderr: "error: device offline".to_string(),
                    });
                }
                if !state.dirs.contains(dir) {
                    return Err(CommandError::Failed {
                        exit_code: Some(1),
                        stderr: format!("ls: {}: No such file or directory", dir),
                    });
                }
                let mut entries = children(&state, dir);
                if matches!(command, RemoteCommand::ListEntries { .. }) {
                    entries.sort_by(|a, b| a.0.cmp(&b.0));
                }
                Ok(entries
                    .into_iter()
                    .map(|(name, is_dir, _)| {
                        if is_dir {
                            format!("{}/\r\n", name)
                        } else {
                            format!("{}\r\n", name)
                        }
                    })
                    .collect())
            }
            RemoteCommand::IsDirectory { path } => Ok(if state.dirs.contains(path) {
                "DIR\r\n".to_string()
            } else {
                "FILE\r\n".to_string()
            }),
            RemoteCommand::IsFile { path } => Ok(if state.files.contains_key(path) {
                "OK\r\n".to_string()
            } else {
                String::new()
            }),
            RemoteCommand::MakeDir { path } => {
                insert_dir(&mut state, path);
                Ok(String::new())
            }
            RemoteCommand::Copy { from, to } => {
                let Some((_, content)) = state.files.get(from).cloned() else {
                    return Ok(format!("cp: {}: No such file or directory\r\n", from));
                };
                if state.lossy_copy {
                    return Ok(String::new());
                }
                state.tick += 1;
                let tick = state.tick;
                state.files.insert(to.clone(), (tick, content));
                Ok(String::new())
            }
            RemoteCommand::Remove { path } => {
                if state.files.remove(path).is_none() && state.specials.remove(path).is_none() {
                    return Err(CommandError::Failed {
                        exit_code: Some(1),
                        stderr: format!("rm: {}: No such file or directory", path),
                    });
                }
                Ok(String::new())
            }
            RemoteCommand::DiskUsage { path } => Ok(format!("12K\t{}\r\n", path)),
        }
    }
}

fn insert_dir(state: &mut FakeState, path: &str) {
    let mut current = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() || path.starts_with('/') {
            current.push('/');
        }
        current.push_str(part);
        state.dirs.insert(current.clone());
    }
}

/// Direct children of `dir` as (name, is_dir, tick), oldest first.
fn children(state: &FakeState, dir: &str) -> Vec<(String, bool, u64)> {
    let prefix = join_remote(dir, "");
    let mut entries: Vec<(String, bool, u64)> = state
        .files
        .iter()
        .filter_map(|(path, (tick, _))| {
            let name = path.strip_prefix(&prefix)?;
            (!name.contains('/')).then(|| (name.to_string(), false, *tick))
        })
        .collect();
    entries.extend(state.specials.iter().filter_map(|(path, tick)| {
        let name = path.strip_prefix(&prefix)?;
        (!name.contains('/')).then(|| (name.to_string(), false, *tick))
    }));
    entries.extend(state.dirs.iter().filter_map(|path| {
        let name = path.strip_prefix(&prefix)?;
        (!name.is_empty() && !name.contains('/')).then(|| (name.to_string(), true, 0))
    }));
    entries.sort_by_key(|(_, _, tick)| *tick);
    entries
}

impl DeviceBridge for FakeDevice {
    async fn start_server(&self) -> Result<ServerStartOutcome, BridgeError> {
        match self.lock().server.clone() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(reason)) => Err(BridgeError::ServerStartFailed(reason)),
            None => Ok(ServerStartOutcome::Started),
        }
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, BridgeError> {
        Ok(self.lock().devices.clone())
    }

    async fn shell(
        &self,
        serial: &str,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<String, CommandError> {
        assert_eq!(serial, SERIAL, "command routed to unexpected device");
        self.interpret(command, timeout)
    }

    async fn pull(
        &self,
        serial: &str,
        remote_path: &str,
        destination: &mut tokio::fs::File,
        timeout: Duration,
    ) -> Result<u64, CommandError> {
        assert_eq!(serial, SERIAL, "pull routed to unexpected device");
        let content = {
            let mut state = self.lock();
            let path = normalize_remote_dir(remote_path);
            state.log.push(format!("pull {}", path));
            if state.stalls.iter().any(|fragment| path.contains(fragment)) {
                return Err(CommandError::Timeout {
                    command: format!("pull {}", path),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            match state.files.get(&path) {
                Some((_, content)) => content.clone(),
                None => {
                    return Err(CommandError::Failed {
                        exit_code: Some(1),
                        stderr: format!("remote object '{}' does not exist", path),
                    })
                }
            }
        };
        destination.write_all(&content).await?;
        destination.flush().await?;
        Ok(content.len() as u64)
    }
}
