//! Chat-completions inference backend.
//!
//! Asks the model for a schema in a fixed JSON shape, then strips any
//! markdown fences from the reply before parsing.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{http_client, InferenceError, InferenceRequest, SchemaInference};

const SYSTEM_PROMPT: &str =
    "you are an API schema designer. return only valid JSON, no markdown formatting.";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2000;

/// Shape the model is asked to return.
const SCHEMA_SHAPE: &str = r#"{
  "entities": [
    {
      "name": "EntityName",
      "fields": [
        {
          "name": "id",
          "type": "integer",
          "primaryKey": true,
          "autoIncrement": true
        },
        {
          "name": "fieldName",
          "type": "string|integer|boolean|date",
          "required": true|false,
          "unique": true|false
        }
      ]
    }
  ],
  "relationships": [
    {
      "from": "EntityA",
      "to": "EntityB",
      "type": "oneToMany|manyToOne|manyToMany",
      "foreignKey": "entity_b_id"
    }
  ]
}"#;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiInference {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiInference {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl SchemaInference for OpenAiInference {
    async fn infer(&self, request: &InferenceRequest) -> Result<serde_json::Value, InferenceError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(request)},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Chat completion request failed");
            return Err(InferenceError::Rejected(format!("{status}: {detail}")));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InferenceError::InvalidResponse("empty completion".to_string()))?;

        serde_json::from_str(strip_code_fences(&content))
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))
    }
}

/// Architect prompt describing the requirements and the required output.
pub fn build_prompt(request: &InferenceRequest) -> String {
    format!(
        "you are an expert API architect. analyze this business requirement and generate a \
         structured JSON schema for a REST API.\n\
         \n\
         business name: {name}\n\
         description: {description}\n\
         data entities: {entities}\n\
         required operations: {operations}\n\
         \n\
         return ONLY valid JSON (no markdown, no explanation) with this exact structure:\n\
         {shape}\n\
         \n\
         rules:\n\
         - always include an \"id\" field as primary key with autoIncrement\n\
         - infer reasonable field types from context\n\
         - include timestamps (created_at, updated_at) when relevant\n\
         - detect relationships from entity descriptions\n\
         - use snake_case for field names\n\
         - keep it simple and practical",
        name = request.business_name,
        description = request.description,
        entities = request.data_entities,
        operations = request.operations.join(", "),
        shape = SCHEMA_SHAPE,
    )
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    fn request() -> InferenceRequest {
        InferenceRequest {
            business_name: "Acme Bikes".into(),
            description: "Rent bikes to customers".into(),
            data_entities: "Bike, Customer, Rental".into(),
            operations: vec!["create".into(), "read".into()],
        }
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn prompt_carries_requirements() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("business name: Acme Bikes"));
        assert!(prompt.contains("data entities: Bike, Customer, Rental"));
        assert!(prompt.contains("required operations: create, read"));
        assert!(prompt.contains("\"primaryKey\": true"));
        assert!(prompt.contains("use snake_case for field names"));
    }

    #[tokio::test]
    async fn parses_fenced_completion() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], "gpt-4");
                Json(json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": "```json\n{\"entities\": []}\n```"}
                    }]
                }))
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let inference = OpenAiInference::new(
            format!("http://{addr}/v1/"),
            "sk-test".into(),
            "gpt-4".into(),
            Duration::from_secs(5),
        );
        let schema = inference.infer(&request()).await.unwrap();
        assert_eq!(schema, json!({"entities": []}));
    }
}
