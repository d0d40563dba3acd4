//! Remote inference endpoint.
//!
//! Speaks the collaborator contract directly: the request body is the
//! requirements document, the reply is `{success: true, schema}` or
//! `{success: false, error}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{http_client, InferenceError, InferenceRequest, SchemaInference};

#[derive(Debug, Deserialize)]
struct InferenceReply {
    success: bool,
    #[serde(default)]
    schema: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct RemoteInference {
    client: reqwest::Client,
    url: String,
}

impl RemoteInference {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url,
        }
    }
}

#[async_trait]
impl SchemaInference for RemoteInference {
    async fn infer(&self, request: &InferenceRequest) -> Result<serde_json::Value, InferenceError> {
        let reply: InferenceReply = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .json()
            .await?;

        match reply {
            InferenceReply {
                success: true,
                schema: Some(schema),
                ..
            } => Ok(schema),
            InferenceReply { success: true, .. } => Err(InferenceError::InvalidResponse(
                "reply is missing the schema".to_string(),
            )),
            InferenceReply { error, .. } => Err(InferenceError::Rejected(
                error.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }
}
