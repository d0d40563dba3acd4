//! End-to-end provisioning pipeline.
//!
//! validate -> synthesize -> write -> install -> start -> register ->
//! catalog. Each stage fails fast; anything after synthesis that fails
//! tears down what the attempt created (process, port, artifact directory).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use apiforge_core::catalog::{build_catalog, EndpointEntry};
use apiforge_core::lifecycle::InstanceStatus;
use apiforge_core::naming;
use apiforge_core::provisioning::installer::{DependencyInstaller, InstallError};
use apiforge_core::schema::Schema;
use apiforge_core::synthesis::synthesize;
use apiforge_core::types::InstanceId;
use apiforge_core::validation::{validate_schema, ValidationError};

use crate::launcher::ProcessHandle;
use crate::registry::{Instance, InstanceRegistry, RegistryError};
use crate::supervisor::{StartError, StartedProcess, Supervisor};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to write generated artifacts: {0}")]
    Artifacts(#[source] std::io::Error),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Parent of the per-instance artifact directories.
    pub generated_dir: PathBuf,
    /// Host used in instance URLs.
    pub instance_host: String,
    /// Delete the artifact directory of a failed attempt.
    pub cleanup_failed_artifacts: bool,
}

/// A provisioned, running and registered service.
#[derive(Debug, Clone)]
pub struct ProvisionedApi {
    pub id: InstanceId,
    pub name: String,
    pub port: u16,
    pub url: String,
    pub directory: PathBuf,
    pub schema: Schema,
    pub endpoints: Vec<EndpointEntry>,
}

impl ProvisionedApi {
    pub fn entity_names(&self) -> Vec<String> {
        self.schema.entities.iter().map(|e| e.name.clone()).collect()
    }
}

/// Drives one generation attempt from raw schema to registered instance.
///
/// [`Provisioner::provision`] must be run to completion: callers that may be
/// cancelled (HTTP handlers) should spawn it as its own task.
pub struct Provisioner {
    config: ProvisionerConfig,
    installer: DependencyInstaller,
    supervisor: Supervisor,
    registry: Arc<InstanceRegistry>,
}

impl Provisioner {
    pub fn new(
        config: ProvisionerConfig,
        installer: DependencyInstaller,
        supervisor: Supervisor,
        registry: Arc<InstanceRegistry>,
    ) -> Self {
        Self {
            config,
            installer,
            supervisor,
            registry,
        }
    }

    pub async fn provision(
        &self,
        raw_schema: &serde_json::Value,
        display_name: &str,
    ) -> Result<ProvisionedApi, ProvisionError> {
        let schema = validate_schema(raw_schema)?;
        let (id, directory) = self.fresh_instance_dir().await;
        let mut status = InstanceStatus::Installing;

        tracing::info!(
            instance_id = %id,
            name = display_name,
            entities = schema.entities.len(),
            "Provisioning instance",
        );

        let artifacts = synthesize(&schema, display_name);
        if let Err(e) = artifacts.write_to(&directory).await {
            self.fail(&id, &mut status, &directory).await;
            return Err(ProvisionError::Artifacts(e));
        }

        match self.installer.install(&directory).await {
            Ok(report) => {
                tracing::info!(instance_id = %id, install_ms = report.duration_ms, "Install stage complete");
            }
            Err(e) => {
                self.fail(&id, &mut status, &directory).await;
                return Err(e.into());
            }
        }

        advance(&id, &mut status, InstanceStatus::Starting);
        let StartedProcess { port, handle } = match self.supervisor.start(&id, &directory).await {
            Ok(started) => started,
            Err(e) => {
                self.fail(&id, &mut status, &directory).await;
                return Err(e.into());
            }
        };

        advance(&id, &mut status, InstanceStatus::Running);
        let url = naming::base_url(&self.config.instance_host, port);
        let instance = Instance::running(
            id.clone(),
            directory.clone(),
            port,
            url.clone(),
            handle.clone(),
        );
        if let Err(e) = self.registry.register(instance).await {
            self.supervisor
                .abandon(&id, StartedProcess { port, handle })
                .await;
            self.fail(&id, &mut status, &directory).await;
            return Err(e.into());
        }

        self.watch_exit(id.clone(), handle);

        let endpoints = build_catalog(&schema, &self.config.instance_host, port);
        tracing::info!(instance_id = %id, port, url = %url, "Instance provisioned");

        Ok(ProvisionedApi {
            id,
            name: display_name.to_string(),
            port,
            url,
            directory,
            schema,
            endpoints,
        })
    }

    /// Mint an id whose artifact directory does not exist yet.
    async fn fresh_instance_dir(&self) -> (InstanceId, PathBuf) {
        loop {
            let id = InstanceId::generate();
            let directory = self.config.generated_dir.join(id.as_str());
            if !matches!(tokio::fs::try_exists(&directory).await, Ok(true)) {
                return (id, directory);
            }
        }
    }

    /// Reap the instance from the registry if its process dies on its own.
    fn watch_exit(&self, id: InstanceId, handle: ProcessHandle) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let exit = handle.wait_exit().await;
            registry.reap(&id, exit).await;
        });
    }

    async fn fail(&self, id: &InstanceId, status: &mut InstanceStatus, directory: &Path) {
        advance(id, status, InstanceStatus::Failed);
        if self.config.cleanup_failed_artifacts {
            remove_artifacts(id, directory).await;
        }
    }
}

fn advance(id: &InstanceId, status: &mut InstanceStatus, next: InstanceStatus) {
    match status.transition(next) {
        Ok(()) => tracing::debug!(instance_id = %id, status = %next, "Instance status changed"),
        Err(e) => tracing::error!(instance_id = %id, error = %e, "Rejected status change"),
    }
}

async fn remove_artifacts(id: &InstanceId, directory: &Path) {
    match tokio::fs::remove_dir_all(directory).await {
        Ok(()) => tracing::debug!(instance_id = %id, "Removed artifacts of failed attempt"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            instance_id = %id,
            directory = %directory.display(),
            error = %e,
            "Failed to remove artifacts of failed attempt",
        ),
    }
}
