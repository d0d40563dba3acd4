//! Structural validation of an inferred schema.
//!
//! Runs over the raw JSON returned by the inference collaborator so that a
//! missing or mistyped `entities` key is reported as a validation failure
//! rather than a deserialization error. On success the typed [`Schema`] is
//! returned.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;
use crate::schema::Schema;

/// Entity and field names end up in file names, JavaScript bindings and SQL.
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IDENTIFIER_PATTERN).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing or invalid entities array")]
    MissingEntities,

    #[error("entities array must not be empty")]
    EmptyEntities,

    #[error("invalid entity structure at index {index}: {reason}")]
    InvalidEntity { index: usize, reason: String },

    #[error("entity name '{0}' is not a valid identifier")]
    InvalidEntityName(String),

    #[error("duplicate entity name '{0}' (names are compared case-insensitively)")]
    DuplicateEntity(String),

    #[error("entity {entity} has an invalid field at index {index}: {reason}")]
    InvalidField {
        entity: String,
        index: usize,
        reason: String,
    },

    #[error("entity {entity} declares field '{field}' more than once (names are compared case-insensitively)")]
    DuplicateField { entity: String, field: String },

    #[error("entity {0} missing primary key")]
    MissingPrimaryKey(String),

    #[error("entity {0} declares more than one primary key")]
    MultiplePrimaryKeys(String),

    #[error("malformed schema: {0}")]
    Malformed(String),
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Check whether `name` can be used as an entity or field identifier.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Validate a raw schema document and return its typed form.
///
/// Fails when:
/// - `entities` is missing, not an array, or empty;
/// - an entity lacks `name` or `fields`, or its name is not an identifier;
/// - two entities share a name (case-insensitively);
/// - a field lacks a name, its name is not an identifier, or two fields of
///   one entity share a name (case-insensitively);
/// - an entity has no field with `primaryKey: true`, or more than one.
pub fn validate_schema(raw: &Value) -> Result<Schema, ValidationError> {
    let entities = raw
        .get("entities")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingEntities)?;

    if entities.is_empty() {
        return Err(ValidationError::EmptyEntities);
    }

    let mut seen = HashSet::new();
    for (index, entity) in entities.iter().enumerate() {
        let name = entity
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ValidationError::InvalidEntity {
                index,
                reason: "missing name".to_string(),
            })?;

        let fields = entity
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::InvalidEntity {
                index,
                reason: format!("entity {name} is missing its fields array"),
            })?;

        if !is_identifier(name) {
            return Err(ValidationError::InvalidEntityName(name.to_string()));
        }

        if !seen.insert(name.to_lowercase()) {
            return Err(ValidationError::DuplicateEntity(name.to_string()));
        }

        validate_fields(name, fields)?;
    }

    serde_json::from_value(raw.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn validate_fields(entity: &str, fields: &[Value]) -> Result<(), ValidationError> {
    let mut primary_keys = 0;
    let mut seen = HashSet::new();

    for (index, field) in fields.iter().enumerate() {
        let invalid = |reason: String| ValidationError::InvalidField {
            entity: entity.to_string(),
            index,
            reason,
        };

        let name = field
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing name".to_string()))?;

        if !is_identifier(name) {
            return Err(invalid(format!("'{name}' is not a valid identifier")));
        }

        if !seen.insert(name.to_lowercase()) {
            return Err(ValidationError::DuplicateField {
                entity: entity.to_string(),
                field: name.to_string(),
            });
        }

        if field.get("primaryKey").and_then(Value::as_bool) == Some(true) {
            primary_keys += 1;
        }
    }

    match primary_keys {
        0 => Err(ValidationError::MissingPrimaryKey(entity.to_string())),
        1 => Ok(()),
        _ => Err(ValidationError::MultiplePrimaryKeys(entity.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
