//! External process execution with concurrent stream capture.
//!
//! ```text
//!            ┌─ stdout task ─┐
//! spawn ─────┤               ├──> shared buffer (Mutex) ──> listeners
//!            └─ stderr task ─┘         │
//!                                      └──> console echo (unless filtered)
//! caller: wait for exit, then join both reader tasks
//! ```
//!
//! Filters and listeners are called outside the lock, on a snapshot taken
//! per line, so they may register further callbacks.
//!
//! Line order is preserved within a stream. Lines from stdout and stderr
//! interleave in arrival order with no further guarantee. There is no
//! timeout: a child that never exits blocks `run` forever.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use idc_core::HostOs;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Returns `true` to keep a line off the console. Captured output is unaffected.
pub type LineFilter = Arc<dyn Fn(StreamKind, &str) -> bool + Send + Sync>;

/// Receives every raw line as it arrives.
pub type LineListener = Arc<dyn Fn(StreamKind, &str) + Send + Sync>;

/// Outcome of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// Combined stdout and stderr, one line per `\n`, in arrival order
    pub output: String,
    /// Exit code; `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Both reader tasks finished without error
    pub drained: bool,
}

impl ProcessResult {
    pub fn completed(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(exit_code),
            drained: true,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("failed waiting for `{command}` to exit")]
    Wait {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to pass credentials to `{command}`")]
    StdinWrite {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` was spawned without a {stream} pipe")]
    MissingPipe {
        command: String,
        stream: &'static str,
    },
}

#[derive(Default)]
struct Shared {
    output: String,
    filters: Vec<LineFilter>,
    listeners: Vec<LineListener>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // A panicking listener must not take the captured output down with it.
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs exactly one external command. `run` consumes the executor.
pub struct ProcessExecutor {
    host_os: HostOs,
    elevation: Option<String>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
    shared: Arc<Mutex<Shared>>,
}

impl ProcessExecutor {
    pub fn new(host_os: HostOs) -> Self {
        Self {
            host_os,
            elevation: None,
            working_dir: None,
            env: Vec::new(),
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Run through `sudo -k -S` with this password (ignored on Windows hosts).
    pub fn elevated(mut self, password: Option<String>) -> Self {
        self.elevation = password;
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn add_filter<F>(&self, filter: F)
    where
        F: Fn(StreamKind, &str) -> bool + Send + Sync + 'static,
    {
        lock(&self.shared).filters.push(Arc::new(filter));
    }

    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(StreamKind, &str) + Send + Sync + 'static,
    {
        lock(&self.shared).listeners.push(Arc::new(listener));
    }

    fn command(&self, command_line: &str) -> Command {
        let mut cmd = match (self.host_os, &self.elevation) {
            (HostOs::Windows, elevation) => {
                if elevation.is_some() {
                    debug!("privilege elevation is not supported on Windows hosts");
                }
                let mut cmd = Command::new("cmd");
                cmd.arg("/c").arg(command_line);
                cmd
            }
            (HostOs::Linux, Some(_)) => {
                let mut cmd = Command::new("sudo");
                cmd.args(sudo_args(command_line));
                cmd
            }
            (HostOs::Linux, None) => {
                let mut cmd = Command::new("/bin/bash");
                cmd.arg("-c").arg(command_line);
                cmd
            }
        };

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }

    /// Spawn `command_line` through the host shell and wait until it exits
    /// and both output streams are drained.
    ///
    /// With `echo`, lines not excluded by a filter are written to the
    /// console (stdout lines to stdout, stderr lines to stderr).
    pub async fn run(self, command_line: &str, echo: bool) -> Result<ProcessResult, ProcessError> {
        let elevate = self.host_os == HostOs::Linux && self.elevation.is_some();

        let mut cmd = self.command(command_line);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if elevate { Stdio::piped() } else { Stdio::null() });

        debug!(command = command_line, elevated = elevate, "spawning");
        let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
            command: command_line.to_owned(),
            source: e,
        })?;

        if let (true, Some(password), Some(mut stdin)) =
            (elevate, self.elevation.as_deref(), child.stdin.take())
        {
            let write = async {
                stdin.write_all(password.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.shutdown().await
            };
            write.await.map_err(|e| ProcessError::StdinWrite {
                command: command_line.to_owned(),
                source: e,
            })?;
        }

        let stdout = child.stdout.take().ok_or_else(|| ProcessError::MissingPipe {
            command: command_line.to_owned(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ProcessError::MissingPipe {
            command: command_line.to_owned(),
            stream: "stderr",
        })?;

        let stdout_task = tokio::spawn(pump(
            stdout,
            StreamKind::Stdout,
            Arc::clone(&self.shared),
            echo,
        ));
        let stderr_task = tokio::spawn(pump(
            stderr,
            StreamKind::Stderr,
            Arc::clone(&self.shared),
            echo,
        ));

        let status = child.wait().await.map_err(|e| ProcessError::Wait {
            command: command_line.to_owned(),
            source: e,
        })?;

        let stdout_done = join_reader(stdout_task, StreamKind::Stdout).await;
        let stderr_done = join_reader(stderr_task, StreamKind::Stderr).await;

        let output = std::mem::take(&mut lock(&self.shared).output);
        debug!(
            command = command_line,
            exit_code = ?status.code(),
            lines = output.lines().count(),
            "process finished"
        );

        Ok(ProcessResult {
            output,
            exit_code: status.code(),
            drained: stdout_done && stderr_done,
        })
    }
}

async fn pump<R>(
    reader: R,
    kind: StreamKind,
    shared: Arc<Mutex<Shared>>,
    echo: bool,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\n', '\r']);

        let (filters, listeners) = {
            let mut guard = lock(&shared);
            guard.output.push_str(line);
            guard.output.push('\n');
            (guard.filters.clone(), guard.listeners.clone())
        };

        let excluded = filters.iter().any(|filter| filter(kind, line));
        if echo && !excluded {
            match kind {
                StreamKind::Stdout => println!("{line}"),
                StreamKind::Stderr => eprintln!("{line}"),
            }
        }
        for listener in &listeners {
            listener(kind, line);
        }
    }
}

/// `-k` ignores cached credentials so sudo always reads the password line
/// and it never reaches the command's stdin.
fn sudo_args(command_line: &str) -> [&str; 7] {
    ["-k", "-S", "-p", "", "/bin/bash", "-c", command_line]
}

async fn join_reader(task: JoinHandle<std::io::Result<()>>, kind: StreamKind) -> bool {
    match task.await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(stream = ?kind, error = %e, "output stream closed with an error");
            false
        }
        Err(e) => {
            warn!(stream = ?kind, error = %e, "output reader task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sudo_always_consumes_the_password() {
        assert_eq!(
            sudo_args("docker ps"),
            ["-k", "-S", "-p", "", "/bin/bash", "-c", "docker ps"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn callbacks_may_touch_the_executor_state() {
        let process = ProcessExecutor::new(HostOs::Linux);
        let shared = Arc::clone(&process.shared);
        let registered = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count = Arc::clone(&registered);

        process.add_listener(move |_, _| {
            let noop: LineListener = Arc::new(|_: StreamKind, _: &str| {});
            lock(&shared).listeners.push(noop);
            count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let result = process.run("echo one; echo two", false).await.unwrap();

        assert_eq!(result.output, "one\ntwo\n");
        assert_eq!(registered.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
