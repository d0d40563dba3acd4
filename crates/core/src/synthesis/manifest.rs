//! Package manifest (`package.json`) for the generated project.

use serde_json::json;

use crate::naming;

/// Declared dependencies, pinned to compatible version ranges.
pub const DEPENDENCIES: [(&str, &str); 4] = [
    ("express", "^4.18.2"),
    ("cors", "^2.8.5"),
    ("sqlite3", "^5.1.6"),
    ("body-parser", "^1.20.2"),
];

/// Render the manifest. The content does not depend on the schema; only
/// the package name and description carry the display name.
pub fn render_manifest(display_name: &str) -> String {
    let dependencies: serde_json::Map<String, serde_json::Value> = DEPENDENCIES
        .iter()
        .map(|(name, version)| ((*name).to_string(), json!(version)))
        .collect();

    let manifest = json!({
        "name": naming::package_name(display_name),
        "version": "1.0.0",
        "description": format!("generated api for {display_name}"),
        "main": "index.js",
        "private": true,
        "scripts": {
            "start": "node index.js"
        },
        "dependencies": dependencies,
    });

    let mut text = serde_json::to_string_pretty(&manifest).unwrap_or_default();
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_framework_and_storage_driver() {
        let manifest: serde_json::Value =
            serde_json::from_str(&render_manifest("Acme Tasks")).unwrap();

        assert_eq!(manifest["name"], "acme-tasks-api");
        assert_eq!(manifest["scripts"]["start"], "node index.js");
        assert_eq!(manifest["dependencies"]["express"], "^4.18.2");
        assert_eq!(manifest["dependencies"]["sqlite3"], "^5.1.6");
        assert_eq!(manifest["dependencies"].as_object().unwrap().len(), 4);
    }

    #[test]
    fn display_name_is_escaped() {
        let manifest: serde_json::Value =
            serde_json::from_str(&render_manifest("Quote \"Co\"")).unwrap();
        assert_eq!(manifest["description"], "generated api for Quote \"Co\"");
    }
}
