//! Bounded execution of recipe shell steps.
//!
//! A non-zero exit is a normal, expected outcome and is encoded in the
//! returned [`StepResult`]; only the inability to spawn the shell itself is
//! an error. Command text comes from trusted recipe data — the runner does
//! no sanitization, that responsibility sits with the recipe layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;

use crate::error::{Result, ToolupError};

/// Synthetic exit code for a step that exceeded its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Synthetic exit code for a step aborted by user cancellation.
pub const CANCELLED_EXIT_CODE: i32 = 130;
/// Synthetic exit code recorded when the shell could not be spawned.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Default cap on captured bytes per stream (stdout and stderr each).
pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Result of one executed command. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// A result that never ran because the shell could not be spawned.
    /// Recorded in the outcome so status stays a pure function of steps.
    pub fn spawn_failure(message: &str) -> Self {
        Self {
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: format!("failed to spawn command: {}", message),
            duration_ms: 0,
            timed_out: false,
        }
    }
}

/// Cooperative cancellation shared between the signal handler, the manager
/// and the in-flight child process.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Executes one shell command with a bounded timeout.
///
/// The trait is the seam between the lifecycle machinery and the host:
/// installer and manager tests drive a scripted implementation instead of
/// spawning real processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, timeout: Duration) -> Result<StepResult>;
}

/// Real runner backed by the platform shell (`sh -c` / `cmd /C`).
pub struct ShellRunner {
    max_capture_bytes: usize,
    cancel: CancelToken,
}

impl ShellRunner {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
            cancel,
        }
    }

    pub fn with_max_capture(mut self, bytes: usize) -> Self {
        self.max_capture_bytes = bytes;
        self
    }

    fn shell_command(command: &str) -> tokio::process::Command {
        let mut cmd = if cfg!(windows) {
            let mut c = tokio::process::Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = tokio::process::Command::new("sh");
            c.arg("-c").arg(command);
            c
        };
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, timeout: Duration) -> Result<StepResult> {
        if self.cancel.is_cancelled() {
            return Ok(StepResult {
                exit_code: CANCELLED_EXIT_CODE,
                stdout: String::new(),
                stderr: "cancelled before start".to_string(),
                duration_ms: 0,
                timed_out: false,
            });
        }

        let start = Instant::now();
        tracing::debug!(command, timeout_secs = timeout.as_secs(), "running step");

        let mut child = Self::shell_command(command)
            .spawn()
            .map_err(|e| ToolupError::Spawn(e.to_string()))?;

        // Drain both pipes concurrently so a chatty child never blocks on a
        // full pipe while we wait for it to exit.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let cap = self.max_capture_bytes;
        let stdout_task =
            tokio::spawn(async move { read_capped(stdout_pipe, cap).await });
        let stderr_task =
            tokio::spawn(async move { read_capped(stderr_pipe, cap).await });

        enum Ended {
            Exited(std::process::ExitStatus),
            TimedOut,
            Cancelled,
        }

        let ended = tokio::select! {
            status = child.wait() => Ended::Exited(status?),
            _ = tokio::time::sleep(timeout) => Ended::TimedOut,
            _ = self.cancel.cancelled() => Ended::Cancelled,
        };

        if !matches!(ended, Ended::Exited(_)) {
            // Terminate the child so it does not outlive the step; waiting
            // afterwards reaps the zombie and closes the pipes.
            let _ = child.kill().await;
            let _ = child.wait().await;
        }

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match ended {
            Ended::Exited(status) => StepResult {
                exit_code: exit_code_of(status),
                stdout,
                stderr,
                duration_ms,
                timed_out: false,
            },
            Ended::TimedOut => {
                tracing::warn!(command, "step timed out after {}s", timeout.as_secs());
                StepResult {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout,
                    stderr,
                    duration_ms,
                    timed_out: true,
                }
            }
            Ended::Cancelled => {
                tracing::warn!(command, "step cancelled");
                StepResult {
                    exit_code: CANCELLED_EXIT_CODE,
                    stdout,
                    stderr,
                    duration_ms,
                    timed_out: false,
                }
            }
        };

        Ok(result)
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    // Terminated by signal (unix); mirror the shell convention of 128 + N.
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Read a child stream to completion, keeping at most `cap` bytes.
///
/// The stream is always drained fully even past the cap, otherwise the child
/// would stall on a full pipe.
async fn read_capped(
    pipe: Option<impl tokio::io::AsyncRead + Unpin>,
    cap: usize,
) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };

    let mut captured: Vec<u8> = Vec::new();
    let mut buf = [0u8; 8192];
    let mut truncated = false;

    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if captured.len() < cap {
                    let take = n.min(cap - captured.len());
                    captured.extend_from_slice(&buf[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
        }
    }

    let mut text = String::from_utf8_lossy(&captured).into_owned();
    if truncated {
        text.push_str("\n... [output truncated]");
    }
    text
}

/// Scripted runner for lifecycle tests: maps exact command text to canned
/// responses and records every call in order.
#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{Result, ToolupError};

    use super::{CommandRunner, StepResult, TIMEOUT_EXIT_CODE};

    #[derive(Clone)]
    pub enum Scripted {
        Result(StepResult),
        SpawnError(String),
    }

    pub fn ok() -> Scripted {
        status(0)
    }

    pub fn status(exit_code: i32) -> Scripted {
        Scripted::Result(StepResult {
            exit_code,
            stdout: String::new(),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("step failed with status {}", exit_code)
            },
            duration_ms: 1,
            timed_out: false,
        })
    }

    pub fn timed_out() -> Scripted {
        Scripted::Result(StepResult {
            exit_code: TIMEOUT_EXIT_CODE,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
            timed_out: true,
        })
    }

    pub fn spawn_error(message: &str) -> Scripted {
        Scripted::SpawnError(message.to_string())
    }

    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: HashMap<String, Scripted>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(mut self, command: &str, response: Scripted) -> Self {
            self.responses.insert(command.to_string(), response);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, command: &str, _timeout: Duration) -> Result<StepResult> {
            self.calls.lock().unwrap().push(command.to_string());
            match self.responses.get(command) {
                Some(Scripted::Result(result)) => Ok(result.clone()),
                Some(Scripted::SpawnError(message)) => {
                    Err(ToolupError::Spawn(message.clone()))
                }
                None => panic!("unscripted command: {}", command),
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner() -> ShellRunner {
        ShellRunner::new(CancelToken::new())
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let result = runner()
            .run("echo hello", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.succeeded());
        assert_eq!(result.stdout.trim(), "hello");
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_captures_stderr_and_exit_code() {
        let result = runner()
            .run("echo oops >&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert!(!result.succeeded());
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        // The runner must never raise for a failing command.
        let result = runner().run("false", Duration::from_secs(5)).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().exit_code, 1);
    }

    #[tokio::test]
    async fn test_timeout_kills_child_and_marks_result() {
        let start = Instant::now();
        let result = runner()
            .run("sleep 30", Duration::from_millis(200))
            .await
            .unwrap();
        assert!(result.timed_out);
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert!(!result.succeeded());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_output_capture_is_bounded() {
        let result = ShellRunner::new(CancelToken::new())
            .with_max_capture(1024)
            .run("yes a | head -n 10000", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(result.stdout.len() < 2048);
        assert!(result.stdout.contains("[output truncated]"));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_running_command() {
        let cancel = CancelToken::new();
        let runner = ShellRunner::new(cancel.clone());

        let handle = tokio::spawn(async move {
            runner.run("sleep 30", Duration::from_secs(60)).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.exit_code, CANCELLED_EXIT_CODE);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_spawn_failure_helper() {
        let result = StepResult::spawn_failure("no such shell");
        assert_eq!(result.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(result.stderr.contains("no such shell"));
    }

    #[test]
    fn test_cancel_token_flag() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
