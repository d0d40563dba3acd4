#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apiforge_core::provisioning::command::CommandSpec;
use apiforge_core::provisioning::installer::DependencyInstaller;
use apiforge_runtime::launcher::{LaunchRequest, ProcessExit, ProcessHandle, ProcessLauncher};
use apiforge_runtime::ports::PortPool;
use apiforge_runtime::provisioner::{Provisioner, ProvisionerConfig};
use apiforge_runtime::registry::InstanceRegistry;
use apiforge_runtime::supervisor::{StartError, Supervisor, SupervisorConfig};
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

pub const PORT_BASE: u16 = 4000;

/// How a [`FakeLauncher`] process behaves.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Becomes ready after a short delay and runs until terminated.
    Ready,
    /// Exits with the given code before ever becoming ready.
    ExitBeforeReady(i32),
    /// Runs but never passes readiness.
    NeverReady,
    /// The launch command cannot be spawned at all.
    SpawnFails,
}

/// In-memory launcher: no real processes, but the same handle/exit
/// semantics the real one has.
pub struct FakeLauncher {
    behavior: Behavior,
    live: Arc<AtomicUsize>,
    next_pid: AtomicU32,
    spawned: Mutex<Vec<(u16, ProcessHandle)>>,
}

impl FakeLauncher {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            live: Arc::new(AtomicUsize::new(0)),
            next_pid: AtomicU32::new(1000),
            spawned: Mutex::new(Vec::new()),
        })
    }

    /// Fake processes that have not exited.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Ports every spawn was asked to listen on, in spawn order.
    pub fn spawned_ports(&self) -> Vec<u16> {
        self.spawned.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }

    /// Make the process listening on `port` exit on its own.
    pub fn crash(&self, port: u16) {
        let spawned = self.spawned.lock().unwrap();
        let (_, handle) = spawned.iter().find(|(p, _)| *p == port).expect("spawned port");
        handle.request_shutdown();
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn spawn(&self, request: &LaunchRequest) -> Result<ProcessHandle, StartError> {
        if let Behavior::SpawnFails = self.behavior {
            return Err(StartError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "node: command not found",
            )));
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let (handle, control) = ProcessHandle::channel(Some(pid));
        let live = Arc::clone(&self.live);
        live.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::ExitBeforeReady(code) => {
                tokio::spawn(async move {
                    control.output().push("Error: listen EADDRINUSE");
                    live.fetch_sub(1, Ordering::SeqCst);
                    control.exited(ProcessExit { code: Some(code) });
                });
            }
            _ => {
                tokio::spawn(async move {
                    control.shutdown_requested().await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    control.exited(ProcessExit::UNKNOWN);
                });
            }
        }

        self.spawned
            .lock()
            .unwrap()
            .push((request.port, handle.clone()));
        Ok(handle)
    }

    async fn await_ready(
        &self,
        handle: &ProcessHandle,
        _port: u16,
        timeout: Duration,
    ) -> Result<(), StartError> {
        match self.behavior {
            Behavior::Ready | Behavior::SpawnFails => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            }
            Behavior::ExitBeforeReady(_) => Err(StartError::ExitedEarly {
                exit: handle.wait_exit().await,
                output: handle.output().joined(),
            }),
            Behavior::NeverReady => {
                tokio::time::sleep(timeout).await;
                Err(StartError::Timeout {
                    elapsed_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

pub fn registry() -> Arc<InstanceRegistry> {
    Arc::new(InstanceRegistry::new(
        PortPool::new(PORT_BASE, 50).without_bind_probe(),
        Duration::from_millis(200),
    ))
}

pub fn supervisor(launcher: Arc<FakeLauncher>, registry: Arc<InstanceRegistry>) -> Supervisor {
    Supervisor::new(
        launcher,
        registry,
        SupervisorConfig {
            readiness_timeout: Duration::from_millis(300),
            stop_grace: Duration::from_millis(200),
        },
    )
}

/// Installer running a shell script instead of a package manager.
pub fn installer(script: &str) -> DependencyInstaller {
    DependencyInstaller::new(
        CommandSpec::new("sh", ["-c", script]),
        Duration::from_secs(5),
    )
}

pub struct Harness {
    pub provisioner: Arc<Provisioner>,
    pub registry: Arc<InstanceRegistry>,
    pub launcher: Arc<FakeLauncher>,
    pub generated: TempDir,
}

pub fn harness(behavior: Behavior, install_script: &str) -> Harness {
    let generated = tempfile::tempdir().expect("temp dir");
    let registry = registry();
    let launcher = FakeLauncher::new(behavior);

    let provisioner = Provisioner::new(
        ProvisionerConfig {
            generated_dir: generated.path().to_path_buf(),
            instance_host: "localhost".to_string(),
            cleanup_failed_artifacts: true,
        },
        installer(install_script),
        supervisor(Arc::clone(&launcher), Arc::clone(&registry)),
        Arc::clone(&registry),
    );

    Harness {
        provisioner: Arc::new(provisioner),
        registry,
        launcher,
        generated,
    }
}

pub fn task_schema() -> serde_json::Value {
    json!({
        "entities": [{
            "name": "Task",
            "fields": [
                {"name": "id", "type": "integer", "primaryKey": true, "autoIncrement": true},
                {"name": "title", "type": "string", "required": true}
            ]
        }]
    })
}

/// Number of entries in the generated artifacts root.
pub fn artifact_dirs(harness: &Harness) -> usize {
    std::fs::read_dir(harness.generated.path())
        .map(|entries| entries.count())
        .unwrap_or(0)
}
