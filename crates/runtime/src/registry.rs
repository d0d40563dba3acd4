//! Instance registry.
//!
//! [`InstanceRegistry`] is the single owner of the live-instance table and
//! the port pool. Both sit behind one lock, so port reservation, register,
//! stop and exit reaping are serialized against each other. Process waits
//! always happen after the lock is released.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use apiforge_core::error::CoreError;
use apiforge_core::lifecycle::InstanceStatus;
use apiforge_core::types::{InstanceId, Timestamp};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::launcher::{ProcessExit, ProcessHandle};
use crate::ports::PortPool;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("instance {0} is already registered")]
    Conflict(InstanceId),

    #[error("instance {0} not found")]
    NotFound(InstanceId),

    #[error("no free port left in the instance port range")]
    PortsExhausted,
}

impl From<RegistryError> for CoreError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Conflict(_) => CoreError::Conflict(err.to_string()),
            RegistryError::NotFound(id) => CoreError::NotFound {
                entity: "Instance",
                id: id.to_string(),
            },
            RegistryError::PortsExhausted => CoreError::Internal(err.to_string()),
        }
    }
}

/// A running instance as stored in the registry.
#[derive(Debug)]
pub struct Instance {
    pub id: InstanceId,
    pub directory: PathBuf,
    pub port: u16,
    pub url: String,
    pub status: InstanceStatus,
    pub started_at: Timestamp,
    handle: ProcessHandle,
}

impl Instance {
    /// A freshly started instance, `Running` as of now.
    pub fn running(
        id: InstanceId,
        directory: PathBuf,
        port: u16,
        url: String,
        handle: ProcessHandle,
    ) -> Self {
        Self {
            id,
            directory,
            port,
            url,
            status: InstanceStatus::Running,
            started_at: Utc::now(),
            handle,
        }
    }

    fn summary(&self, now: Timestamp) -> InstanceSummary {
        InstanceSummary {
            id: self.id.clone(),
            port: self.port,
            uptime_ms: (now - self.started_at).num_milliseconds().max(0) as u64,
            status: self.status,
            started_at: self.started_at,
            url: self.url.clone(),
        }
    }
}

/// Point-in-time view of one instance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub id: InstanceId,
    pub port: u16,
    #[serde(rename = "uptime")]
    pub uptime_ms: u64,
    pub status: InstanceStatus,
    pub started_at: Timestamp,
    pub url: String,
}

struct RegistryState {
    instances: HashMap<InstanceId, Instance>,
    ports: PortPool,
}

pub struct InstanceRegistry {
    state: RwLock<RegistryState>,
    stop_grace: Duration,
}

impl InstanceRegistry {
    pub fn new(ports: PortPool, stop_grace: Duration) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                instances: HashMap::new(),
                ports,
            }),
            stop_grace,
        }
    }

    pub async fn reserve_port(&self) -> Result<u16, RegistryError> {
        let port = self
            .state
            .write()
            .await
            .ports
            .reserve()
            .ok_or(RegistryError::PortsExhausted)?;
        tracing::debug!(port, "Port reserved");
        Ok(port)
    }

    pub async fn release_port(&self, port: u16) {
        if self.state.write().await.ports.release(port) {
            tracing::debug!(port, "Port released");
        }
    }

    /// Insert a started instance. Its port must already be reserved.
    pub async fn register(&self, instance: Instance) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        if state.instances.contains_key(&instance.id) {
            return Err(RegistryError::Conflict(instance.id));
        }

        tracing::info!(instance_id = %instance.id, port = instance.port, "Instance registered");
        state.instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    /// All live instances, oldest first.
    pub async fn list(&self) -> Vec<InstanceSummary> {
        let now = Utc::now();
        let state = self.state.read().await;
        let mut summaries: Vec<_> = state.instances.values().map(|i| i.summary(now)).collect();
        summaries.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    pub async fn contains(&self, id: &InstanceId) -> bool {
        self.state.read().await.instances.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.instances.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove `id` and terminate its process.
    ///
    /// The entry is removed even if the process had already exited. The
    /// port goes back to the pool only once the process is gone.
    pub async fn stop(&self, id: &InstanceId) -> Result<(), RegistryError> {
        let mut instance = self
            .state
            .write()
            .await
            .instances
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        if let Err(e) = instance.status.transition(InstanceStatus::Stopped) {
            tracing::warn!(instance_id = %id, error = %e, "Stopping instance in unexpected state");
        }

        tracing::info!(instance_id = %id, port = instance.port, "Stopping instance");
        self.terminate_and_release(&instance).await;
        Ok(())
    }

    /// Record an unexpected process exit.
    ///
    /// Returns `false` if `id` is no longer registered (it was stopped).
    pub async fn reap(&self, id: &InstanceId, exit: ProcessExit) -> bool {
        let mut state = self.state.write().await;
        let Some(mut instance) = state.instances.remove(id) else {
            return false;
        };

        let _ = instance.status.transition(InstanceStatus::Failed);
        state.ports.release(instance.port);

        tracing::warn!(
            instance_id = %id,
            port = instance.port,
            %exit,
            output = %instance.handle.output().joined(),
            "Instance exited unexpectedly, removed from registry",
        );
        true
    }

    /// Stop every instance concurrently. Used on orchestrator shutdown.
    pub async fn stop_all(&self) {
        let instances: Vec<Instance> = {
            let mut state = self.state.write().await;
            state.instances.drain().map(|(_, instance)| instance).collect()
        };

        tracing::info!(count = instances.len(), "Stopping all instances");
        futures::future::join_all(instances.iter().map(|i| self.terminate_and_release(i))).await;
    }

    async fn terminate_and_release(&self, instance: &Instance) {
        match instance.handle.terminate(self.stop_grace).await {
            Some(exit) => {
                tracing::info!(instance_id = %instance.id, %exit, "Instance process exited");
                self.release_port(instance.port).await;
            }
            None => {
                tracing::warn!(
                    instance_id = %instance.id,
                    port = instance.port,
                    "Instance process did not exit, port withheld from the pool",
                );
            }
        }
    }
}
