//! Real-process [`ProcessLauncher`].
//!
//! Spawns the configured launch command inside the artifact directory with
//! `PORT` set, forwards stdout/stderr into `tracing`, and runs a monitor task
//! per child that owns the [`tokio::process::Child`]: it reports the exit and,
//! on a termination request, sends SIGTERM, waits out the grace period, then
//! kills.

use std::process::Stdio;
use std::time::Duration;

use apiforge_core::provisioning::command::CommandSpec;
use apiforge_core::types::InstanceId;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;

use crate::launcher::{
    LaunchRequest, OutputTail, ProcessControl, ProcessExit, ProcessHandle, ProcessLauncher,
};
use crate::readiness::ReadinessProbe;
use crate::supervisor::StartError;

/// Environment variable the generated entrypoint reads its port from.
pub const PORT_ENV: &str = "PORT";

pub struct CommandLauncher {
    command: CommandSpec,
    probe: ReadinessProbe,
    stop_grace: Duration,
}

impl CommandLauncher {
    pub fn new(command: CommandSpec, probe: ReadinessProbe, stop_grace: Duration) -> Self {
        Self {
            command,
            probe,
            stop_grace,
        }
    }
}

#[async_trait]
impl ProcessLauncher for CommandLauncher {
    async fn spawn(&self, request: &LaunchRequest) -> Result<ProcessHandle, StartError> {
        let mut cmd = self.command.to_command();
        cmd.current_dir(&request.directory)
            .env(PORT_ENV, request.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(StartError::Spawn)?;
        let (handle, control) = ProcessHandle::channel(child.id());

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(
                request.instance_id.clone(),
                "stdout",
                stdout,
                control.output(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(
                request.instance_id.clone(),
                "stderr",
                stderr,
                control.output(),
            ));
        }

        tokio::spawn(monitor(
            request.instance_id.clone(),
            child,
            control,
            self.stop_grace,
        ));

        Ok(handle)
    }

    async fn await_ready(
        &self,
        handle: &ProcessHandle,
        port: u16,
        timeout: Duration,
    ) -> Result<(), StartError> {
        self.probe.wait_until_ready(handle, port, timeout).await
    }
}

/// Own `child` until it exits, escalating SIGTERM -> kill on request.
async fn monitor(instance_id: InstanceId, mut child: Child, control: ProcessControl, grace: Duration) {
    let status = tokio::select! {
        status = child.wait() => status,
        () = control.shutdown_requested() => {
            send_terminate(&mut child);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!(
                        instance_id = %instance_id,
                        grace_ms = grace.as_millis() as u64,
                        "Instance ignored termination signal, killing",
                    );
                    let _ = child.start_kill();
                    child.wait().await
                }
            }
        }
    };

    let exit = match status {
        Ok(status) => ProcessExit::from(status),
        Err(e) => {
            tracing::error!(instance_id = %instance_id, error = %e, "Failed to wait for instance process");
            ProcessExit::UNKNOWN
        }
    };

    tracing::debug!(instance_id = %instance_id, %exit, "Instance process exited");
    control.exited(exit);
}

/// Ask the child to shut down gracefully.
fn send_terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // Safety: `pid` is our own un-reaped child, so it cannot have been
            // recycled for another process.
            let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if ret == 0 {
                return;
            }
        }
    }

    let _ = child.start_kill();
}

/// Forward each output line into tracing and the diagnostic tail.
async fn forward_output<R: AsyncRead + Unpin>(
    instance_id: InstanceId,
    stream: &'static str,
    reader: R,
    tail: OutputTail,
) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!(instance_id = %instance_id, stream, "{line}");
        tail.push(line);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
