//! Schema inference clients.
//!
//! Turning free-text business requirements into a schema is delegated to an
//! external collaborator. [`SchemaInference`] is the seam; the orchestrator
//! only consumes its output, which is validated like any other input.

pub mod openai;
pub mod remote;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use openai::OpenAiInference;
pub use remote::RemoteInference;

/// Operations requested when the caller does not list any.
pub const DEFAULT_OPERATIONS: [&str; 4] = ["create", "read", "update", "delete"];

/// Requirements handed to the inference backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub business_name: String,
    pub description: String,
    pub data_entities: String,
    pub operations: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("schema inference is not configured (set INFERENCE_URL or OPENAI_API_KEY)")]
    NotConfigured,

    #[error("inference request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference backend rejected the request: {0}")]
    Rejected(String),

    #[error("inference returned an unparseable schema: {0}")]
    InvalidResponse(String),
}

/// Requirements -> raw schema document.
#[async_trait]
pub trait SchemaInference: Send + Sync {
    async fn infer(&self, request: &InferenceRequest) -> Result<serde_json::Value, InferenceError>;
}

/// Backend that fails every call; used when nothing is configured.
pub struct UnconfiguredInference;

#[async_trait]
impl SchemaInference for UnconfiguredInference {
    async fn infer(&self, _request: &InferenceRequest) -> Result<serde_json::Value, InferenceError> {
        Err(InferenceError::NotConfigured)
    }
}

/// Inference backend settings.
#[derive(Debug, Clone, Default)]
pub struct InferenceConfig {
    /// Remote endpoint speaking the `{success, schema}` contract.
    pub url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub timeout_secs: u64,
}

impl InferenceConfig {
    /// Load from environment variables.
    ///
    /// | Env Var                  | Default                     |
    /// |--------------------------|-----------------------------|
    /// | `INFERENCE_URL`          | unset                       |
    /// | `OPENAI_API_KEY`         | unset                       |
    /// | `OPENAI_BASE_URL`        | `https://api.openai.com/v1` |
    /// | `OPENAI_MODEL`           | `gpt-4`                     |
    /// | `INFERENCE_TIMEOUT_SECS` | `120`                       |
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let timeout_secs: u64 = std::env::var("INFERENCE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("INFERENCE_TIMEOUT_SECS must be a valid u64");

        Self {
            url: non_empty("INFERENCE_URL"),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into()),
            openai_model: non_empty("OPENAI_MODEL").unwrap_or_else(|| "gpt-4".into()),
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pick a backend: a remote endpoint wins over OpenAI; with neither, every
/// call fails with [`InferenceError::NotConfigured`].
pub fn from_config(config: &InferenceConfig) -> Arc<dyn SchemaInference> {
    if let Some(url) = &config.url {
        tracing::info!(url = %url, "Using remote schema inference");
        return Arc::new(RemoteInference::new(url.clone(), config.timeout()));
    }

    if let Some(api_key) = &config.openai_api_key {
        tracing::info!(model = %config.openai_model, "Using OpenAI schema inference");
        return Arc::new(OpenAiInference::new(
            config.openai_base_url.clone(),
            api_key.clone(),
            config.openai_model.clone(),
            config.timeout(),
        ));
    }

    tracing::warn!("No schema inference backend configured; generation requests will fail");
    Arc::new(UnconfiguredInference)
}

/// HTTP client with a whole-request timeout.
fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request() -> InferenceRequest {
        InferenceRequest {
            business_name: "Acme".into(),
            description: "Track tasks".into(),
            data_entities: "Task".into(),
            operations: DEFAULT_OPERATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn unconfigured_backend_always_fails() {
        let inference = from_config(&InferenceConfig::default());
        assert_matches!(
            inference.infer(&request()).await,
            Err(InferenceError::NotConfigured)
        );
    }

    #[test]
    fn request_serializes_camel_case() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["businessName"], "Acme");
        assert_eq!(json["dataEntities"], "Task");
        assert_eq!(json["operations"][3], "delete");
    }
}
