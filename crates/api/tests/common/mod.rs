#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use apiforge_api::config::ServerConfig;
use apiforge_api::inference::{InferenceConfig, InferenceError, InferenceRequest, SchemaInference};
use apiforge_api::router::build_app_router;
use apiforge_api::state::AppState;
use apiforge_core::provisioning::command::CommandSpec;
use apiforge_runtime::launcher::{LaunchRequest, ProcessExit, ProcessHandle, ProcessLauncher};
use apiforge_runtime::supervisor::StartError;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Artifacts go to `generated`; installs run a shell script instead of a
/// package manager.
pub fn test_config(generated: &TempDir, install_script: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        generated_dir: generated.path().to_path_buf(),
        static_dir: None,
        instance_host: "localhost".to_string(),
        instance_port_base: 41000,
        instance_port_span: 100,
        install_command: CommandSpec::new("sh", ["-c", install_script]),
        install_timeout_secs: 10,
        launch_command: CommandSpec::new("node", ["index.js"]),
        readiness_timeout_secs: 2,
        readiness_interval_ms: 50,
        stop_grace_secs: 1,
        cleanup_failed_artifacts: true,
        inference: InferenceConfig::default(),
    }
}

/// Inference double returning a fixed document and counting calls.
pub struct FakeInference {
    result: Result<serde_json::Value, String>,
    calls: AtomicUsize,
}

impl FakeInference {
    pub fn returning(schema: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(schema),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn rejecting(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaInference for FakeInference {
    async fn infer(&self, _request: &InferenceRequest) -> Result<serde_json::Value, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(InferenceError::Rejected)
    }
}

/// Launcher whose processes are ready at once and run until terminated.
pub struct ReadyLauncher {
    next_pid: AtomicU32,
    live: Arc<AtomicUsize>,
}

impl ReadyLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_pid: AtomicU32::new(2000),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessLauncher for ReadyLauncher {
    async fn spawn(&self, _request: &LaunchRequest) -> Result<ProcessHandle, StartError> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let (handle, control) = ProcessHandle::channel(Some(pid));
        let live = Arc::clone(&self.live);
        live.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            control.shutdown_requested().await;
            live.fetch_sub(1, Ordering::SeqCst);
            control.exited(ProcessExit::UNKNOWN);
        });

        Ok(handle)
    }

    async fn await_ready(
        &self,
        _handle: &ProcessHandle,
        _port: u16,
        _timeout: Duration,
    ) -> Result<(), StartError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub inference: Arc<FakeInference>,
    pub launcher: Arc<ReadyLauncher>,
    pub generated: TempDir,
}

/// Build the full application router with all middleware layers.
///
/// Uses the same [`build_app_router`] as `main.rs`, so integration tests
/// exercise the production middleware stack.
pub fn build_test_app(inference: Arc<FakeInference>, install_script: &str) -> TestApp {
    let generated = tempfile::tempdir().expect("temp dir");
    let config = test_config(&generated, install_script);
    let launcher = ReadyLauncher::new();

    let state = AppState::new(config.clone(), inference.clone(), launcher.clone());
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        inference,
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
                {"name": "title", "type": "string", "required": true},
                {"name": "done", "type": "boolean"}
            ]
        }]
    })
}

pub fn generate_body() -> serde_json::Value {
    json!({
        "businessName": "Todo Co",
        "description": "Track tasks",
        "dataEntities": "Task with a title and a done flag"
    })
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Number of entries in the generated artifacts root.
pub fn artifact_dirs(app: &TestApp) -> usize {
    std::fs::read_dir(app.generated.path())
        .map(|entries| entries.count())
        .unwrap_or(0)
}
