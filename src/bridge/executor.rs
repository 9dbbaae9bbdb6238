use log::{debug, error, warn};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::types::CommandResult;
use crate::error_handling::types::CommandError;

/// Runs bridge processes with a hard per-call timeout.
///
/// One process is spawned per call. When the budget elapses the process is killed and
/// reaped before the call returns, so a stuck bridge cannot pile up processes behind the
/// poller. After a normal exit the executor keeps collecting output for a short grace window,
/// since pipe data can arrive after the exit notification. Nothing is cached and nothing is
/// retried here: callers decide whether a failure is worth another attempt.
#[derive(Debug, Clone)]
pub struct Executor {
    program: String,
    output_flush: Duration,
}

impl Executor {
    pub fn new(program: impl Into<String>, output_flush: Duration) -> Self {
        Self {
            program: program.into(),
            output_flush,
        }
    }

    /// Runs the command and returns its stdout.
    ///
    /// Errors
    /// - [`CommandError::Timeout`] when the process is still running after `timeout`.
    /// - [`CommandError::Failed`] when it exits non-zero *and* wrote to stderr.
    ///   A non-zero exit with an empty stderr is returned as regular output, which is what
    ///   shell tests such as `[ -f x ] && echo OK` rely on.
    pub async fn execute(&self, args: &[String], timeout: Duration) -> Result<String, CommandError> {
        let result = self.run(args, timeout).await?;

        if result.timed_out {
            return Err(CommandError::Timeout {
                command: self.render(args),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        if result.exit_code != Some(0) && !result.stderr.trim().is_empty() {
            error!(
                "Bridge command failed with exit code {:?}: {}",
                result.exit_code,
                result.stderr.trim()
            );
            return Err(CommandError::Failed {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result.stdout)
    }

    /// Runs the command and returns the raw [`CommandResult`], timeouts included.
    pub async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandResult, CommandError> {
        debug!("Executing bridge command: {}", self.render(args));

        let mut child = self.spawn(args)?;
        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let mut stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(collect(out, Arc::clone(&stdout_buf))));
        let mut stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(collect(err, Arc::clone(&stderr_buf))));

        let started = Instant::now();
        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                error!(
                    "Bridge command timed out after {}ms: {}",
                    timeout.as_millis(),
                    self.render(args)
                );
                terminate(&mut child).await;
                abort(stdout_task);
                abort(stderr_task);
                return Ok(CommandResult {
                    stdout: drain(&stdout_buf),
                    stderr: drain(&stderr_buf),
                    exit_code: None,
                    timed_out: true,
                });
            }
        };

        // Readers may still be delivering the tail of the output.
        let flushed = tokio::time::timeout(self.output_flush, async {
            if let Some(task) = stdout_task.as_mut() {
                let _ = task.await;
            }
            if let Some(task) = stderr_task.as_mut() {
                let _ = task.await;
            }
        })
        .await;
        if flushed.is_err() {
            debug!("Output still open after grace window, returning collected output");
        }
        abort(stdout_task);
        abort(stderr_task);

        debug!(
            "Bridge command exited with {:?} in {}ms",
            status.code(),
            started.elapsed().as_millis()
        );

        Ok(CommandResult {
            stdout: drain(&stdout_buf),
            stderr: drain(&stderr_buf),
            exit_code: status.code(),
            timed_out: false,
        })
    }

    /// Runs the command and streams its stdout into `destination`.
    ///
    /// Used for file pulls where the payload is binary and must not be buffered as text.
    /// Returns the number of bytes written.
    pub async fn stream_to<W>(
        &self,
        args: &[String],
        destination: &mut W,
        timeout: Duration,
    ) -> Result<u64, CommandError>
    where
        W: tokio::io::AsyncWrite + Unpin + Send,
    {
        debug!("Streaming bridge command: {}", self.render(args));

        let mut child = self.spawn(args)?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CommandError::Io(std::io::Error::other("stdout not captured")))?;
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(collect(err, Arc::clone(&stderr_buf))));

        let transfer = async {
            let written = tokio::io::copy(&mut stdout, &mut *destination).await?;
            destination.flush().await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((written, status))
        };

        let outcome = tokio::time::timeout(timeout, transfer).await;
        let (written, status) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                error!(
                    "Bridge stream timed out after {}ms: {}",
                    timeout.as_millis(),
                    self.render(args)
                );
                terminate(&mut child).await;
                abort(stderr_task);
                return Err(CommandError::Timeout {
                    command: self.render(args),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        if let Some(task) = stderr_task {
            let _ = tokio::time::timeout(self.output_flush, task).await;
        }
        let stderr = drain(&stderr_buf);

        if !status.success() {
            error!(
                "Bridge stream failed with exit code {:?}: {}",
                status.code(),
                stderr.trim()
            );
            return Err(CommandError::Failed {
                exit_code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!("Streamed {} bytes", written);
        Ok(written)
    }

    fn spawn(&self, args: &[String]) -> Result<Child, CommandError> {
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!("Failed to spawn {}: {}", self.program, e);
                CommandError::SpawnFailed(e)
            })
    }

    fn render(&self, args: &[String]) -> String {
        let mut rendered = self.program.clone();
        for arg in args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}

async fn collect<R>(mut reader: R, buffer: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
}

fn drain(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    match buffer.lock() {
        Ok(mut buf) => String::from_utf8_lossy(&std::mem::take(&mut *buf)).into_owned(),
        Err(_) => String::new(),
    }
}

fn abort(task: Option<JoinHandle<()>>) {
    if let Some(task) = task {
        task.abort();
    }
}

/// Kills and reaps the child. Never skipped: a leaked bridge process starves later polls.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("Failed to kill timed-out bridge process: {}", e);
        // the process may have exited on its own between the timeout and the kill
        if let Err(e) = child.wait().await {
            error!("Unable to reap bridge process: {}", e);
        }
    } else {
        debug!("Timed-out bridge process terminated");
    }
}
