//! Process-launching capability.
//!
//! The supervisor never touches `tokio::process` directly; it drives a
//! [`ProcessLauncher`] with three operations (spawn, await readiness,
//! terminate). [`crate::command_launcher::CommandLauncher`] is the real
//! implementation; tests plug in fakes built on [`ProcessHandle::channel`].

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use apiforge_core::types::InstanceId;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::supervisor::StartError;

/// Lines of process output retained for diagnostics.
pub const OUTPUT_TAIL_LINES: usize = 50;

/// Extra time allowed, after the grace period, for a killed process to be
/// reaped.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to launch one instance.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub instance_id: InstanceId,
    pub directory: PathBuf,
    pub port: u16,
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when terminated by a signal or unknown.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub const UNKNOWN: Self = Self { code: None };

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Bounded ring of the most recent output lines of a process.
#[derive(Debug, Clone, Default)]
pub struct OutputTail {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl OutputTail {
    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == OUTPUT_TAIL_LINES {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Retained lines joined with newlines.
    pub fn joined(&self) -> String {
        self.lines().join("\n")
    }
}

/// Shared, cloneable reference to a launched process.
///
/// The owning side (a monitor task) holds the matching [`ProcessControl`]
/// and reports the exit; any number of handles can wait for it or ask for
/// termination.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: Option<u32>,
    exit: watch::Receiver<Option<ProcessExit>>,
    shutdown: CancellationToken,
    output: OutputTail,
}

/// Owner side of a [`ProcessHandle`].
#[derive(Debug)]
pub struct ProcessControl {
    exit: watch::Sender<Option<ProcessExit>>,
    shutdown: CancellationToken,
    output: OutputTail,
}

impl ProcessHandle {
    /// Create a connected handle/control pair for a process with `pid`.
    pub fn channel(pid: Option<u32>) -> (Self, ProcessControl) {
        let (exit_tx, exit_rx) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let output = OutputTail::default();

        let handle = Self {
            pid,
            exit: exit_rx,
            shutdown: shutdown.clone(),
            output: output.clone(),
        };
        let control = ProcessControl {
            exit: exit_tx,
            shutdown,
            output,
        };
        (handle, control)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn exit_status(&self) -> Option<ProcessExit> {
        *self.exit.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    pub fn output(&self) -> &OutputTail {
        &self.output
    }

    /// Wait until the process has exited.
    ///
    /// If the owning side disappears without reporting, the exit is
    /// [`ProcessExit::UNKNOWN`].
    pub async fn wait_exit(&self) -> ProcessExit {
        let mut exit = self.exit.clone();
        if let Ok(status) = exit.wait_for(Option::is_some).await {
            return (*status).unwrap_or(ProcessExit::UNKNOWN);
        }
        ProcessExit::UNKNOWN
    }

    /// Ask the owner to stop the process without waiting.
    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Ask the owner to stop the process and wait for it to exit.
    ///
    /// The owner is expected to escalate to a forced kill after `grace`.
    /// Returns `None` if no exit was observed in time.
    pub async fn terminate(&self, grace: Duration) -> Option<ProcessExit> {
        self.request_shutdown();
        tokio::time::timeout(grace + KILL_REAP_TIMEOUT, self.wait_exit())
            .await
            .ok()
    }
}

impl ProcessControl {
    /// Resolves once some handle asked for termination.
    pub async fn shutdown_requested(&self) {
        self.shutdown.cancelled().await;
    }

    pub fn output(&self) -> OutputTail {
        self.output.clone()
    }

    /// Publish the exit to every handle.
    pub fn exited(self, exit: ProcessExit) {
        self.exit.send_replace(Some(exit));
    }
}

/// Spawn / readiness / termination capability used by the supervisor.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start the instance process with `request.port` injected.
    async fn spawn(&self, request: &LaunchRequest) -> Result<ProcessHandle, StartError>;

    /// Wait, bounded by `timeout`, for positive evidence the instance serves
    /// requests on `port`.
    async fn await_ready(
        &self,
        handle: &ProcessHandle,
        port: u16,
        timeout: Duration,
    ) -> Result<(), StartError>;

    /// Stop the process, escalating after `grace`.
    async fn terminate(&self, handle: &ProcessHandle, grace: Duration) -> Option<ProcessExit> {
        handle.terminate(grace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Owner task that exits with `code` once termination is requested.
    fn spawn_owner(control: ProcessControl, code: Option<i32>) {
        tokio::spawn(async move {
            control.shutdown_requested().await;
            control.exited(ProcessExit { code });
        });
    }

    #[tokio::test]
    async fn terminate_waits_for_reported_exit() {
        let (handle, control) = ProcessHandle::channel(Some(42));
        spawn_owner(control, None);

        assert!(!handle.has_exited());
        let exit = handle.terminate(Duration::from_millis(100)).await;

        assert_eq!(exit, Some(ProcessExit::UNKNOWN));
        assert!(handle.has_exited());
        assert_eq!(handle.pid(), Some(42));
    }

    #[tokio::test]
    async fn clones_observe_the_same_exit() {
        let (handle, control) = ProcessHandle::channel(None);
        let other = handle.clone();

        control.exited(ProcessExit { code: Some(3) });

        assert_eq!(handle.wait_exit().await, ProcessExit { code: Some(3) });
        assert_eq!(other.exit_status(), Some(ProcessExit { code: Some(3) }));
    }

    #[tokio::test]
    async fn terminate_on_exited_process_returns_immediately() {
        let (handle, control) = ProcessHandle::channel(None);
        control.exited(ProcessExit { code: Some(0) });

        let exit = handle.terminate(Duration::from_secs(60)).await;
        assert!(exit.is_some_and(|e| e.success()));
    }

    #[tokio::test]
    async fn dropped_control_reads_as_unknown_exit() {
        let (handle, control) = ProcessHandle::channel(None);
        drop(control);
        assert_eq!(handle.wait_exit().await, ProcessExit::UNKNOWN);
    }

    #[test]
    fn output_tail_keeps_most_recent_lines() {
        let tail = OutputTail::default();
        for i in 0..OUTPUT_TAIL_LINES + 5 {
            tail.push(format!("line {i}"));
        }
        let lines = tail.lines();
        assert_eq!(lines.len(), OUTPUT_TAIL_LINES);
        assert_eq!(lines[0], "line 5");
        assert_eq!(
            lines.last().map(String::as_str),
            Some(format!("line {}", OUTPUT_TAIL_LINES + 4).as_str())
        );
    }

    #[test]
    fn exit_display() {
        assert_eq!(ProcessExit { code: Some(1) }.to_string(), "exit code 1");
        assert_eq!(ProcessExit::UNKNOWN.to_string(), "terminated by signal");
    }
}
