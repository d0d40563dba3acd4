//! Handlers for API generation and instance lifecycle.
//!
//! Routes:
//! - `POST   /api/generate`        infer a schema and provision a service
//! - `GET    /api/status`          list running services
//! - `DELETE /api/stop/{api_id}`   stop a running service

use std::sync::Arc;

use apiforge_core::error::CoreError;
use apiforge_core::types::InstanceId;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::inference::{InferenceRequest, DEFAULT_OPERATIONS};
use crate::response::{GenerateResponse, StatusResponse, StopResponse};
use crate::state::AppState;

const MISSING_FIELDS: &str =
    "missing required fields (required: businessName, description, dataEntities)";

/// Body of `POST /api/generate`.
///
/// Fields are optional at the serde level so that a missing field is a
/// validation failure rather than a body rejection.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[validate(required, length(min = 1))]
    pub business_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub description: Option<String>,
    #[validate(required, length(min = 1))]
    pub data_entities: Option<String>,
    #[serde(default)]
    pub operations: Option<Vec<String>>,
}

impl GenerateRequest {
    fn into_inference_request(self) -> InferenceRequest {
        let operations = match self.operations {
            Some(ops) if !ops.is_empty() => ops,
            _ => DEFAULT_OPERATIONS.iter().map(|s| s.to_string()).collect(),
        };
        InferenceRequest {
            business_name: self.business_name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            data_entities: self.data_entities.unwrap_or_default(),
            operations,
        }
    }
}

/// POST /api/generate
///
/// Infers a schema from the requirements, then provisions a running
/// service from it. Provisioning runs in its own task so a client
/// disconnect cannot leave a half-started instance behind.
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    input
        .validate()
        .map_err(|_| CoreError::Validation(MISSING_FIELDS.to_string()))?;

    let request = input.into_inference_request();
    tracing::info!(business_name = %request.business_name, "Parsing requirements");
    let raw_schema = state.inference.infer(&request).await?;

    let provisioner = Arc::clone(&state.provisioner);
    let schema = raw_schema.clone();
    let name = request.business_name;
    let api = tokio::spawn(async move { provisioner.provision(&schema, &name).await })
        .await
        .map_err(|e| AppError::InternalError(format!("Provisioning task failed: {e}")))??;

    Ok(Json(GenerateResponse::new(api, raw_schema)))
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let apis = state.registry.list().await;
    Json(StatusResponse {
        count: apis.len(),
        apis,
    })
}

/// DELETE /api/stop/{api_id}
pub async fn stop(
    State(state): State<AppState>,
    Path(api_id): Path<String>,
) -> AppResult<Json<StopResponse>> {
    let id = InstanceId::from(api_id);
    state.registry.stop(&id).await?;

    Ok(Json(StopResponse {
        message: "api stopped successfully",
        api_id: id,
    }))
}
