use std::sync::Arc;

use apiforge_core::provisioning::installer::DependencyInstaller;
use apiforge_runtime::command_launcher::CommandLauncher;
use apiforge_runtime::launcher::ProcessLauncher;
use apiforge_runtime::ports::PortPool;
use apiforge_runtime::provisioner::{Provisioner, ProvisionerConfig};
use apiforge_runtime::readiness::ReadinessProbe;
use apiforge_runtime::registry::InstanceRegistry;
use apiforge_runtime::supervisor::{Supervisor, SupervisorConfig};

use crate::config::ServerConfig;
use crate::inference::SchemaInference;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live instance table and port pool.
    pub registry: Arc<InstanceRegistry>,
    /// validate -> synthesize -> install -> start -> register pipeline.
    pub provisioner: Arc<Provisioner>,
    /// Requirements -> schema collaborator.
    pub inference: Arc<dyn SchemaInference>,
}

impl AppState {
    /// Wire the runtime from `config`, launching instances with `launcher`.
    pub fn new(
        config: ServerConfig,
        inference: Arc<dyn SchemaInference>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        let registry = Arc::new(InstanceRegistry::new(
            PortPool::new(config.instance_port_base, config.instance_port_span),
            config.stop_grace(),
        ));

        let supervisor = Supervisor::new(
            launcher,
            Arc::clone(&registry),
            SupervisorConfig {
                readiness_timeout: config.readiness_timeout(),
                stop_grace: config.stop_grace(),
            },
        );

        let provisioner = Provisioner::new(
            ProvisionerConfig {
                generated_dir: config.generated_dir.clone(),
                instance_host: config.instance_host.clone(),
                cleanup_failed_artifacts: config.cleanup_failed_artifacts,
            },
            DependencyInstaller::new(config.install_command.clone(), config.install_timeout()),
            supervisor,
            Arc::clone(&registry),
        );

        Self {
            config: Arc::new(config),
            registry,
            provisioner: Arc::new(provisioner),
            inference,
        }
    }

    /// The production launcher: runs `LAUNCH_COMMAND` and probes `/health`.
    pub fn command_launcher(config: &ServerConfig) -> Arc<dyn ProcessLauncher> {
        Arc::new(CommandLauncher::new(
            config.launch_command.clone(),
            ReadinessProbe::new(config.instance_host.clone(), config.readiness_interval()),
            config.stop_grace(),
        ))
    }
}
