//! Bounded subprocess execution.
//!
//! Provides [`run_command`]: spawn, capture stdout/stderr, enforce a
//! timeout. The child gets a null stdin, so tools that prompt fail fast
//! instead of hanging until the timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output exceeding this limit is truncated; package managers can be very
/// verbose.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Execution parameters for a subprocess.
#[derive(Debug, Clone)]
pub struct CommandInput {
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<String>,
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Duration,
}

/// Captured output from a completed subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawn `cmd`, capture stdout/stderr, and enforce the configured timeout.
///
/// The caller sets the program and arguments; environment variables and
/// working directory from [`CommandInput`] are applied here. A non-zero exit
/// is not an error at this level; inspect [`CommandOutput::exit_code`].
pub async fn run_command(
    cmd: &mut Command,
    input: CommandInput,
) -> Result<CommandOutput, CommandError> {
    // `kill_on_drop(true)` ensures the child is killed when dropped (e.g. on timeout).
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }

    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();

    let mut child = cmd.spawn()?;

    // Read the streams in spawned tasks so `child.wait()` can borrow `&mut child`.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let wait_result = tokio::time::timeout(input.timeout, child.wait()).await;

    match wait_result {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();

            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        Ok(Err(e)) => Err(CommandError::Io(e)),
        Err(_elapsed) => {
            // `child` is dropped on return, which kills the process.
            Err(CommandError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::provisioning::test_helpers::default_input;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let output = run_command(&mut sh("echo out; echo err >&2"), default_input())
            .await
            .expect("run");
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn reports_nonzero_exit() {
        let output = run_command(&mut sh("exit 42"), default_input())
            .await
            .expect("run");
        assert_eq!(output.exit_code, 42);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn applies_env_vars() {
        let input = CommandInput {
            env_vars: vec![("GREETING".to_string(), "hello_world".to_string())],
            ..default_input()
        };
        let output = run_command(&mut sh("echo $GREETING"), input)
            .await
            .expect("run");
        assert_eq!(output.stdout.trim(), "hello_world");
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("marker.txt"), "here").expect("write marker");
        let input = CommandInput {
            working_directory: Some(dir.path().to_str().expect("path").to_string()),
            ..default_input()
        };
        let output = run_command(&mut sh("cat marker.txt"), input)
            .await
            .expect("run");
        assert_eq!(output.stdout, "here");
    }

    #[tokio::test]
    async fn stdin_is_closed() {
        let output = run_command(&mut sh("cat"), default_input())
            .await
            .expect("run");
        assert!(output.success());
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn kills_on_timeout() {
        let input = CommandInput {
            timeout: Duration::from_millis(200),
            ..default_input()
        };
        let result = run_command(&mut sh("sleep 60"), input).await;
        assert_matches!(result, Err(CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let mut cmd = Command::new("/nonexistent/program");
        let result = run_command(&mut cmd, default_input()).await;
        assert_matches!(result, Err(CommandError::Io(_)));
    }
}
