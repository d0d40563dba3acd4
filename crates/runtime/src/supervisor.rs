//! Process supervisor: port reservation, spawn, readiness.
//!
//! The port is reserved in the registry before anything is spawned, so two
//! concurrent starts can never observe the same free port. Every failure
//! path terminates whatever was spawned and returns the port.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use apiforge_core::types::InstanceId;

use crate::launcher::{LaunchRequest, ProcessExit, ProcessHandle, ProcessLauncher};
use crate::registry::InstanceRegistry;

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("no free port left in the instance port range")]
    PortsExhausted,

    #[error("failed to spawn instance process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("instance process exited before becoming ready ({exit})")]
    ExitedEarly { exit: ProcessExit, output: String },

    #[error("instance did not become ready within {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub readiness_timeout: Duration,
    /// Grace between the termination signal and a forced kill.
    pub stop_grace: Duration,
}

/// A process that passed its readiness check.
#[derive(Debug, Clone)]
pub struct StartedProcess {
    pub port: u16,
    pub handle: ProcessHandle,
}

pub struct Supervisor {
    launcher: Arc<dyn ProcessLauncher>,
    registry: Arc<InstanceRegistry>,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        registry: Arc<InstanceRegistry>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            launcher,
            registry,
            config,
        }
    }

    /// Reserve a port, spawn the instance in `directory` and wait for it to
    /// become ready.
    ///
    /// On success the port stays reserved; registering the instance is the
    /// caller's job.
    pub async fn start(
        &self,
        instance_id: &InstanceId,
        directory: &Path,
    ) -> Result<StartedProcess, StartError> {
        let port = self
            .registry
            .reserve_port()
            .await
            .map_err(|_| StartError::PortsExhausted)?;

        let request = LaunchRequest {
            instance_id: instance_id.clone(),
            directory: directory.to_path_buf(),
            port,
        };

        let handle = match self.launcher.spawn(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(instance_id = %instance_id, port, error = %e, "Spawn failed");
                self.registry.release_port(port).await;
                return Err(e);
            }
        };

        tracing::info!(
            instance_id = %instance_id,
            port,
            pid = ?handle.pid(),
            "Instance process spawned, waiting for readiness",
        );

        if let Err(e) = self
            .launcher
            .await_ready(&handle, port, self.config.readiness_timeout)
            .await
        {
            tracing::error!(
                instance_id = %instance_id,
                port,
                error = %e,
                output = %handle.output().joined(),
                "Instance failed to become ready",
            );
            self.stop_and_release(instance_id, &handle, port).await;
            return Err(e);
        }

        tracing::info!(instance_id = %instance_id, port, "Instance ready");
        Ok(StartedProcess { port, handle })
    }

    /// Terminate a started process that will not be registered, returning
    /// its port once it has exited.
    pub async fn abandon(&self, instance_id: &InstanceId, started: StartedProcess) {
        self.stop_and_release(instance_id, &started.handle, started.port)
            .await;
    }

    async fn stop_and_release(&self, instance_id: &InstanceId, handle: &ProcessHandle, port: u16) {
        match self.launcher.terminate(handle, self.config.stop_grace).await {
            Some(exit) => {
                tracing::debug!(instance_id = %instance_id, port, %exit, "Instance process terminated");
                self.registry.release_port(port).await;
            }
            None => {
                tracing::warn!(
                    instance_id = %instance_id,
                    port,
                    "Instance process did not exit, port withheld from the pool",
                );
            }
        }
    }
}
