//! Structured schema model consumed by the synthesizer.
//!
//! The wire shape matches what the schema-inference collaborator returns
//! (camelCase keys, `type` for the field type). A [`Schema`] is normally
//! obtained through [`crate::validation::validate_schema`], which checks the
//! structural invariants before deserializing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root input to synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub entities: Vec<Entity>,
    /// Carried into the generated documentation only.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// One data type, mapped to one storage table and one route group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Entity {
    /// The field marked as primary key.
    ///
    /// Validation guarantees exactly one exists; `None` only for schemas
    /// built by hand without going through the validator.
    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "literal_true")]
    pub primary_key: bool,
    #[serde(default, deserialize_with = "literal_true")]
    pub auto_increment: bool,
    #[serde(default, deserialize_with = "literal_true")]
    pub required: bool,
    #[serde(default, deserialize_with = "literal_true")]
    pub unique: bool,
}

/// A flag is set only by a literal `true`; any other value reads as unset.
fn literal_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value == serde_json::Value::Bool(true))
}

impl Field {
    /// Convenience constructor for a plain optional field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            auto_increment: false,
            required: false,
            unique: false,
        }
    }

    /// An auto-incrementing integer primary key.
    pub fn id(name: impl Into<String>) -> Self {
        Self {
            primary_key: true,
            auto_increment: true,
            ..Self::new(name, FieldType::Integer)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Declared field type.
///
/// Unrecognised names are kept verbatim in [`FieldType::Other`] and fall
/// back to a text column during synthesis. A `type` that is not a string at
/// all (`null`, a number, an array) is kept as its JSON text in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "String")]
pub enum FieldType {
    Integer,
    #[default]
    String,
    Boolean,
    Date,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "integer" => Self::Integer,
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            _ => Self::Other(value),
        }
    }
}

impl From<serde_json::Value> for FieldType {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(name) => name.into(),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared association between two entities.
///
/// Not enforced structurally; only documented in the generated README.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_flags() {
        let field: Field = serde_json::from_value(serde_json::json!({
            "name": "id",
            "type": "integer",
            "primaryKey": true,
            "autoIncrement": true
        }))
        .unwrap();

        assert_eq!(field, Field::id("id"));
    }

    #[test]
    fn unknown_type_is_preserved() {
        let field: Field =
            serde_json::from_value(serde_json::json!({"name": "price", "type": "decimal"}))
                .unwrap();
        assert_eq!(field.field_type, FieldType::Other("decimal".into()));
        assert_eq!(serde_json::to_value(&field).unwrap()["type"], "decimal");
    }

    #[test]
    fn non_string_type_becomes_other() {
        for (raw, expected) in [
            (serde_json::json!(null), "null"),
            (serde_json::json!(5), "5"),
            (serde_json::json!(["string"]), r#"["string"]"#),
        ] {
            let field: Field =
                serde_json::from_value(serde_json::json!({"name": "note", "type": raw})).unwrap();
            assert_eq!(field.field_type, FieldType::Other(expected.into()));
        }
    }

    #[test]
    fn flags_other_than_literal_true_are_unset() {
        let field: Field = serde_json::from_value(serde_json::json!({
            "name": "title",
            "required": "yes",
            "unique": 1,
            "autoIncrement": null,
            "primaryKey": true
        }))
        .unwrap();
        assert!(field.primary_key);
        assert!(!field.required);
        assert!(!field.unique);
        assert!(!field.auto_increment);
    }

    #[test]
    fn missing_flags_default_to_false() {
        let field: Field =
            serde_json::from_value(serde_json::json!({"name": "title", "type": "string"}))
                .unwrap();
        assert!(!field.primary_key);
        assert!(!field.auto_increment);
        assert!(!field.required);
        assert!(!field.unique);
    }

    #[test]
    fn relationships_are_optional() {
        let schema: Schema = serde_json::from_value(serde_json::json!({
            "entities": [{"name": "Task", "fields": [{"name": "id", "primaryKey": true}]}]
        }))
        .unwrap();
        assert!(schema.relationships.is_empty());
    }

    #[test]
    fn relationship_reads_foreign_key() {
        let rel: Relationship = serde_json::from_value(serde_json::json!({
            "from": "Project",
            "to": "Task",
            "type": "oneToMany",
            "foreignKey": "project_id"
        }))
        .unwrap();
        assert_eq!(rel.kind, "oneToMany");
        assert_eq!(rel.foreign_key.as_deref(), Some("project_id"));
    }

    #[test]
    fn primary_key_lookup() {
        let entity = Entity {
            name: "Task".into(),
            fields: vec![
                Field::new("title", FieldType::String),
                Field::id("task_id"),
            ],
        };
        assert_eq!(entity.primary_key().map(|f| f.name.as_str()), Some("task_id"));
    }
}
