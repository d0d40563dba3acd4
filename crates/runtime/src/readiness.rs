//! HTTP readiness probing.
//!
//! A spawned instance counts as ready only after its liveness endpoint
//! answers with a success status. Probing stops early if the process exits.

use std::time::{Duration, Instant};

use apiforge_core::naming;

use crate::launcher::ProcessHandle;
use crate::supervisor::StartError;

/// Upper bound on a single probe request.
const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    client: reqwest::Client,
    host: String,
    interval: Duration,
}

impl ReadinessProbe {
    pub fn new(host: impl Into<String>, interval: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            host: host.into(),
            interval,
        }
    }

    pub fn health_url(&self, port: u16) -> String {
        format!(
            "{}{}",
            naming::base_url(&self.host, port),
            naming::HEALTH_PATH
        )
    }

    /// Poll the liveness endpoint until it succeeds, the process exits, or
    /// `timeout` elapses.
    pub async fn wait_until_ready(
        &self,
        handle: &ProcessHandle,
        port: u16,
        timeout: Duration,
    ) -> Result<(), StartError> {
        let url = self.health_url(port);
        let start = Instant::now();

        loop {
            if let Some(exit) = handle.exit_status() {
                return Err(StartError::ExitedEarly {
                    exit,
                    output: handle.output().joined(),
                });
            }

            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    tracing::debug!(port, status = %response.status(), "Readiness probe rejected");
                }
                Err(e) => {
                    tracing::trace!(port, error = %e, "Instance not ready yet");
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(StartError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }

            let pause = self.interval.min(timeout - elapsed);
            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                exit = handle.wait_exit() => {
                    return Err(StartError::ExitedEarly {
                        exit,
                        output: handle.output().joined(),
                    });
                }
            }
        }
    }
}
