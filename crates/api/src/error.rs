use apiforge_core::error::CoreError;
use apiforge_core::provisioning::installer::InstallError;
use apiforge_runtime::provisioner::ProvisionError;
use apiforge_runtime::registry::RegistryError;
use apiforge_runtime::supervisor::StartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::inference::InferenceError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds the pipeline stages'
/// errors plus HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent `{ "error", "code" }` JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `apiforge_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The inference collaborator failed or returned garbage.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Dependency installation failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The generated service never became ready.
    #[error(transparent)]
    Start(#[from] StartError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        AppError::Core(err.into())
    }
}

impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Validation(e) => AppError::Core(e.into()),
            ProvisionError::Install(e) => AppError::Install(e),
            ProvisionError::Start(e) => AppError::Start(e),
            ProvisionError::Registry(e) => e.into(),
            ProvisionError::Artifacts(e) => {
                AppError::InternalError(format!("failed to write generated artifacts: {e}"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Pipeline stages ---
            AppError::Inference(err) => {
                tracing::error!(error = %err, "Schema inference failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INFERENCE_ERROR",
                    format!("failed to parse requirements: {err}"),
                )
            }
            AppError::Install(err) => {
                tracing::error!(error = %err, "Dependency install failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INSTALL_ERROR",
                    err.to_string(),
                )
            }
            AppError::Start(err) => {
                tracing::error!(error = %err, "Instance start failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "START_ERROR",
                    err.to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
