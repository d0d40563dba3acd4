//! Endpoint catalog: the externally callable routes of an instance.
//!
//! Derived from the schema with the same naming rules the synthesizer uses,
//! so the catalog always matches the generated route modules.

use serde::{Deserialize, Serialize};

use crate::naming;
use crate::schema::Schema;

/// Routes produced for every entity.
pub const ROUTES_PER_ENTITY: usize = 5;

/// One callable route of a generated instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub method: String,
    pub path: String,
    pub url: String,
    pub description: String,
}

/// Build the catalog for an instance reachable at `host:port`.
///
/// Returns [`ROUTES_PER_ENTITY`] entries per entity, in schema order.
pub fn build_catalog(schema: &Schema, host: &str, port: u16) -> Vec<EndpointEntry> {
    let base_url = naming::base_url(host, port);
    let mut entries = Vec::with_capacity(schema.entities.len() * ROUTES_PER_ENTITY);

    for entity in &schema.entities {
        let collection = naming::route_base_path(&entity.name);
        let item = format!("{collection}/:id");
        let plural = naming::table_name(&entity.name);
        let name = &entity.name;

        let routes = [
            ("GET", &collection, format!("get all {plural}")),
            ("GET", &item, format!("get single {name}")),
            ("POST", &collection, format!("create {name}")),
            ("PUT", &item, format!("update {name}")),
            ("DELETE", &item, format!("delete {name}")),
        ];

        for (method, path, description) in routes {
            entries.push(EndpointEntry {
                method: method.to_string(),
                path: path.clone(),
                url: format!("{base_url}{path}"),
                description,
            });
        }
    }

    entries
}
