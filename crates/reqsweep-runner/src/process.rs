//! Supervised execution of one tool invocation

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use crate::ring_buffer::RingBuffer;
use crate::terminate::{ProcessGroupGuard, escalate};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::ChildStdin;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default time between SIGTERM and SIGKILL.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// How long to keep reading pipes after a forced termination.
const DRAIN_AFTER_KILL: Duration = Duration::from_millis(100);

/// How long to keep reading pipes after a normal exit, in case a forked
/// helper still holds them open.
const DRAIN_AFTER_EXIT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8192;

/// Capture limits for the child's output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    pub stdout_cap: usize,
    pub stderr_cap: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            stdout_cap: 2 * 1024 * 1024,
            stderr_cap: 256 * 1024,
        }
    }
}

/// What happened to one tool invocation.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Exit code, `None` if the process died from a signal or was never reaped
    pub exit_code: Option<i32>,
    /// The invocation hit its deadline and was terminated
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration: Duration,
}

impl RunResult {
    /// Exited on its own with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Last non-empty stderr line, for failure logs.
    #[must_use]
    pub fn stderr_tail(&self) -> Option<&str> {
        self.stderr.lines().rev().map(str::trim).find(|l| !l.is_empty())
    }
}

/// Seam between the orchestrator and the process layer, so worker logic can
/// be driven by a fake in tests.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run `command`, feed it `payload` on stdin, and enforce `timeout`.
    async fn invoke(
        &self,
        command: &CommandSpec,
        payload: &str,
        timeout: Duration,
    ) -> Result<RunResult, RunnerError>;
}

/// Spawns the tool with piped stdio in its own process group.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    buffers: BufferConfig,
    kill_grace: Duration,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(BufferConfig::default(), DEFAULT_KILL_GRACE)
    }
}

impl ToolRunner {
    #[must_use]
    pub const fn new(buffers: BufferConfig, kill_grace: Duration) -> Self {
        Self {
            buffers,
            kill_grace,
        }
    }

    /// Execute one invocation to completion.
    ///
    /// Stdin feeding and both pipe readers run concurrently with the wait, so
    /// a child that fills its stdout before reading stdin cannot deadlock the
    /// runner. A deadline hit is reported as `timed_out`, not as an error.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Spawn`] if the process cannot be started and
    /// [`RunnerError::Wait`] if the OS fails to report its status.
    pub async fn run(
        &self,
        cmd: &CommandSpec,
        payload: &str,
        timeout: Duration,
    ) -> Result<RunResult, RunnerError> {
        let program = cmd.program_name();
        let mut command = cmd.to_tokio_command();
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| RunnerError::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?;
        let mut guard = ProcessGroupGuard::new(child.id());
        debug!(pid = child.id(), command = %cmd.display(), "spawned tool");

        let stdout_buf = Arc::new(Mutex::new(RingBuffer::new(self.buffers.stdout_cap)));
        let stderr_buf = Arc::new(Mutex::new(RingBuffer::new(self.buffers.stderr_cap)));

        let feeder = child
            .stdin
            .take()
            .map(|stdin| tokio::spawn(feed_stdin(stdin, payload.as_bytes().to_vec())));
        let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(stdout, Arc::clone(&stdout_buf))));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(stderr, Arc::clone(&stderr_buf))));
        }

        let (exit_status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => (Some(status), false),
            Ok(Err(e)) => {
                abort_all(feeder, pumps);
                return Err(RunnerError::Wait {
                    program,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    program = %program,
                    timeout_secs = timeout.as_secs_f64(),
                    "tool exceeded its deadline, terminating"
                );
                (escalate(&mut child, self.kill_grace).await, true)
            }
        };
        guard.disarm();

        let drain = if timed_out {
            DRAIN_AFTER_KILL
        } else {
            DRAIN_AFTER_EXIT
        };
        if let Some(feeder) = feeder {
            feeder.abort();
        }
        drain_pumps(pumps, drain).await;

        let (stdout, stdout_truncated) = snapshot(&stdout_buf);
        let (stderr, stderr_truncated) = snapshot(&stderr_buf);

        Ok(RunResult {
            exit_code: exit_status.and_then(|s| s.code()),
            timed_out,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            duration: started.elapsed(),
        })
    }
}

#[async_trait]
impl ToolInvoker for ToolRunner {
    async fn invoke(
        &self,
        command: &CommandSpec,
        payload: &str,
        timeout: Duration,
    ) -> Result<RunResult, RunnerError> {
        self.run(command, payload, timeout).await
    }
}

async fn feed_stdin(mut stdin: ChildStdin, payload: Vec<u8>) {
    match stdin.write_all(&payload).await {
        Ok(()) => {}
        // the tool is allowed to exit without reading its instructions
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("tool closed stdin before reading the full payload");
        }
        Err(e) => warn!(error = %e, "failed to write payload to tool stdin"),
    }
    if let Err(e) = stdin.shutdown().await {
        debug!(error = %e, "closing tool stdin");
    }
}

async fn pump<R>(mut reader: R, sink: Arc<Mutex<RingBuffer>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write(&chunk[..n]),
            Err(e) => {
                debug!(error = %e, "pipe read ended");
                break;
            }
        }
    }
}

async fn drain_pumps(pumps: Vec<JoinHandle<()>>, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    for mut handle in pumps {
        if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}

fn abort_all(feeder: Option<JoinHandle<()>>, pumps: Vec<JoinHandle<()>>) {
    if let Some(feeder) = feeder {
        feeder.abort();
    }
    for handle in pumps {
        handle.abort();
    }
}

fn snapshot(buffer: &Mutex<RingBuffer>) -> (String, bool) {
    let guard = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    (guard.contents(), guard.was_truncated())
}
