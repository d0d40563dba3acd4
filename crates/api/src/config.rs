use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use apiforge_core::provisioning::command::CommandSpec;

use crate::inference::InferenceConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Generation includes a full dependency
    /// install, so this is generous.
    pub request_timeout_secs: u64,
    /// Upper bound on stopping all instances after the listener closes.
    pub shutdown_timeout_secs: u64,
    /// Parent directory of per-instance artifact directories.
    pub generated_dir: PathBuf,
    /// Optional presentation layer served at `/`.
    pub static_dir: Option<PathBuf>,
    /// Host used in instance URLs and readiness probes.
    pub instance_host: String,
    pub instance_port_base: u16,
    pub instance_port_span: u16,
    pub install_command: CommandSpec,
    pub install_timeout_secs: u64,
    pub launch_command: CommandSpec,
    pub readiness_timeout_secs: u64,
    pub readiness_interval_ms: u64,
    /// Grace between the termination signal and a forced kill.
    pub stop_grace_secs: u64,
    /// Delete the artifact directory of a failed generation.
    pub cleanup_failed_artifacts: bool,
    /// Schema inference backend settings.
    pub inference: InferenceConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `600`                   |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                    |
    /// | `GENERATED_DIR`             | `generated`             |
    /// | `STATIC_DIR`                | unset                   |
    /// | `INSTANCE_HOST`             | `localhost`             |
    /// | `INSTANCE_PORT_BASE`        | `4000`                  |
    /// | `INSTANCE_PORT_SPAN`        | `1000`                  |
    /// | `INSTALL_COMMAND`           | `npm install`           |
    /// | `INSTALL_TIMEOUT_SECS`      | `300`                   |
    /// | `LAUNCH_COMMAND`            | `node index.js`         |
    /// | `READINESS_TIMEOUT_SECS`    | `30`                    |
    /// | `READINESS_INTERVAL_MS`     | `250`                   |
    /// | `STOP_GRACE_SECS`           | `5`                     |
    /// | `CLEANUP_FAILED_ARTIFACTS`  | `true`                  |
    ///
    /// Inference settings are documented on [`InferenceConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("PORT", "3000");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "600"),
            shutdown_timeout_secs: parse_var("SHUTDOWN_TIMEOUT_SECS", "30"),
            generated_dir: PathBuf::from(
                std::env::var("GENERATED_DIR").unwrap_or_else(|_| "generated".into()),
            ),
            static_dir,
            instance_host: std::env::var("INSTANCE_HOST").unwrap_or_else(|_| "localhost".into()),
            instance_port_base: parse_var("INSTANCE_PORT_BASE", "4000"),
            instance_port_span: parse_var("INSTANCE_PORT_SPAN", "1000"),
            install_command: command_var("INSTALL_COMMAND", "npm install"),
            install_timeout_secs: parse_var("INSTALL_TIMEOUT_SECS", "300"),
            launch_command: command_var("LAUNCH_COMMAND", "node index.js"),
            readiness_timeout_secs: parse_var("READINESS_TIMEOUT_SECS", "30"),
            readiness_interval_ms: parse_var("READINESS_INTERVAL_MS", "250"),
            stop_grace_secs: parse_var("STOP_GRACE_SECS", "5"),
            cleanup_failed_artifacts: parse_var("CLEANUP_FAILED_ARTIFACTS", "true"),
            inference: InferenceConfig::from_env(),
        }
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }
}

/// Parse `key` (or `default`), panicking on a malformed value.
fn parse_var<T: FromStr>(key: &str, default: &str) -> T {
    std::env::var(key)
        .unwrap_or_else(|_| default.into())
        .trim()
        .parse()
        .unwrap_or_else(|_| {
            panic!(
                "{key} must be a valid {}",
                std::any::type_name::<T>()
            )
        })
}

fn command_var(key: &str, default: &str) -> CommandSpec {
    let line = std::env::var(key).unwrap_or_else(|_| default.into());
    CommandSpec::parse(&line).unwrap_or_else(|| panic!("{key} must not be empty"))
}
