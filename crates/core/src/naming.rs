//! Naming convention engine for generated artifacts.
//!
//! Every derived name starts from the entity name lower-cased. Tables and
//! route base paths append `s` unconditionally; irregular plurals are not
//! handled, so `Person` becomes `persons`.

/// Directory holding one data-access module per entity.
pub const MODELS_DIR: &str = "models";

/// Directory holding one route module per entity.
pub const ROUTES_DIR: &str = "routes";

/// Prefix under which every entity's routes are mounted.
pub const API_PREFIX: &str = "/api";

/// Liveness endpoint exposed by every generated service.
pub const HEALTH_PATH: &str = "/health";

/// Lower-cased entity name, used for file names.
///
/// ```
/// use apiforge_core::naming::entity_slug;
///
/// assert_eq!(entity_slug("OrderItem"), "orderitem");
/// ```
pub fn entity_slug(entity_name: &str) -> String {
    entity_name.to_lowercase()
}

/// Storage table name: lower-cased entity name plus `s`.
///
/// ```
/// use apiforge_core::naming::table_name;
///
/// assert_eq!(table_name("Task"), "tasks");
/// assert_eq!(table_name("Category"), "categorys");
/// ```
pub fn table_name(entity_name: &str) -> String {
    format!("{}s", entity_slug(entity_name))
}

/// Route base path the entity's router is mounted under.
///
/// ```
/// use apiforge_core::naming::route_base_path;
///
/// assert_eq!(route_base_path("Task"), "/api/tasks");
/// ```
pub fn route_base_path(entity_name: &str) -> String {
    format!("{API_PREFIX}/{}", table_name(entity_name))
}

/// Relative path of the entity's data-access module.
pub fn model_path(entity_name: &str) -> String {
    format!("{MODELS_DIR}/{}.js", entity_slug(entity_name))
}

/// Relative path of the entity's route module.
pub fn route_path(entity_name: &str) -> String {
    format!("{ROUTES_DIR}/{}.js", entity_slug(entity_name))
}

/// JavaScript binding for an entity's model: the name with its first
/// character upper-cased, which keeps it clear of lowercase reserved words.
pub fn model_binding(entity_name: &str) -> String {
    let mut chars = entity_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// JavaScript binding for an entity's router in the entrypoint.
pub fn router_binding(entity_name: &str) -> String {
    format!("{}Routes", entity_slug(entity_name))
}

/// Package name for the generated manifest, derived from the display name.
///
/// Runs of non-alphanumeric characters collapse into a single hyphen.
///
/// ```
/// use apiforge_core::naming::package_name;
///
/// assert_eq!(package_name("Joe's Coffee  Shop"), "joe-s-coffee-shop-api");
/// assert_eq!(package_name("!!!"), "generated-api");
/// ```
pub fn package_name(display_name: &str) -> String {
    let mut slug = String::new();
    for c in display_name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        "generated-api".to_string()
    } else {
        format!("{slug}-api")
    }
}

/// SQL identifier in double quotes, so keywords such as `order` or `group`
/// can name tables and columns.
///
/// ```
/// use apiforge_core::naming::quote_identifier;
///
/// assert_eq!(quote_identifier("order"), "\"order\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Base URL of an instance listening on `host:port`.
pub fn base_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}
