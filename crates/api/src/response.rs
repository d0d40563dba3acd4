//! Response bodies of the orchestrator API.

use apiforge_core::catalog::EndpointEntry;
use apiforge_core::types::InstanceId;
use apiforge_runtime::provisioner::ProvisionedApi;
use apiforge_runtime::registry::InstanceSummary;
use serde::Serialize;

/// `POST /api/generate` success body.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub api: GeneratedApi,
}

#[derive(Debug, Serialize)]
pub struct GeneratedApi {
    pub id: InstanceId,
    pub name: String,
    pub url: String,
    pub entities: Vec<String>,
    /// The schema exactly as inferred.
    pub schema: serde_json::Value,
    pub endpoints: Vec<EndpointEntry>,
}

impl GenerateResponse {
    pub fn new(api: ProvisionedApi, raw_schema: serde_json::Value) -> Self {
        Self {
            success: true,
            api: GeneratedApi {
                entities: api.entity_names(),
                id: api.id,
                name: api.name,
                url: api.url,
                schema: raw_schema,
                endpoints: api.endpoints,
            },
        }
    }
}

/// `GET /api/status` body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub apis: Vec<InstanceSummary>,
    pub count: usize,
}

/// `DELETE /api/stop/{apiId}` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub message: &'static str,
    pub api_id: InstanceId,
}
