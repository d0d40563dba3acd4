//! Human-readable documentation (`README.md`) for a generated service.

use crate::naming;
use crate::schema::{Entity, Field, Schema};

use super::entrypoint::DEFAULT_PORT;
use super::writer::SourceWriter;

pub fn render_readme(schema: &Schema, display_name: &str) -> String {
    let mut w = SourceWriter::new();

    w.line(format!("# {display_name} API"))
        .blank()
        .line("## Getting started")
        .blank()
        .line("```bash")
        .line("npm install")
        .line("npm start")
        .line("```")
        .blank()
        .line(format!(
            "The server listens on the port given by `PORT` (default {DEFAULT_PORT})."
        ))
        .line(format!(
            "`GET {}` reports liveness.",
            naming::HEALTH_PATH
        ))
        .blank()
        .line("## Available endpoints")
        .blank();

    for entity in &schema.entities {
        entity_section(&mut w, entity);
    }

    if !schema.relationships.is_empty() {
        w.line("## Relationships").blank();
        for rel in &schema.relationships {
            let mut line = format!("- `{}` → `{}` ({})", rel.from, rel.to, rel.kind);
            if let Some(fk) = &rel.foreign_key {
                line.push_str(&format!(", foreign key `{fk}`"));
            }
            w.line(line);
        }
        w.blank();
    }

    if let Some(first) = schema.entities.first() {
        let base = naming::route_base_path(&first.name);
        let url = format!("{}{base}", naming::base_url("localhost", DEFAULT_PORT));
        w.line("## Example requests")
            .blank()
            .line("### Create a record")
            .line("```bash")
            .line(format!("curl -X POST {url} \\"))
            .line("  -H \"Content-Type: application/json\" \\")
            .line("  -d '{\"field\": \"value\"}'")
            .line("```")
            .blank()
            .line("### List records")
            .line("```bash")
            .line(format!("curl {url}"))
            .line("```")
            .blank();
    }

    w.line("## Notes")
        .blank()
        .line("- Storage: SQLite (`database.db`, override with `DATABASE_PATH`)")
        .line("- All responses are JSON; errors carry an `error` field")
        .line("- Request bodies are stored as given: every key except `id` is written as a column");

    w.finish()
}

fn entity_section(w: &mut SourceWriter, entity: &Entity) {
    let base = naming::route_base_path(&entity.name);
    let plural = naming::table_name(&entity.name);
    let name = &entity.name;

    w.line(format!("### {name}"))
        .blank()
        .line("**Endpoints:**")
        .line(format!("- `GET {base}` - get all {plural}"))
        .line(format!("- `GET {base}/:id` - get single {name}"))
        .line(format!("- `POST {base}` - create new {name}"))
        .line(format!("- `PUT {base}/:id` - update {name}"))
        .line(format!("- `DELETE {base}/:id` - delete {name}"))
        .blank()
        .line("**Fields:**");

    for field in &entity.fields {
        w.line(field_line(field));
    }
    w.blank();
}

fn field_line(field: &Field) -> String {
    let mut markers = Vec::new();
    if field.primary_key {
        markers.push("primary key");
    }
    if field.auto_increment && field.primary_key {
        markers.push("auto-increment");
    }
    if field.required && !field.primary_key {
        markers.push("required");
    }
    if field.unique {
        markers.push("unique");
    }

    let mut line = format!("- `{}` ({})", field.name, field.field_type);
    if !markers.is_empty() {
        line.push_str(&format!(" *{}*", markers.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, Relationship};

    fn schema() -> Schema {
        Schema {
            entities: vec![Entity {
                name: "Task".into(),
                fields: vec![
                    Field::id("id"),
                    Field::new("title", FieldType::String).required(),
                ],
            }],
            relationships: vec![Relationship {
                from: "Project".into(),
                to: "Task".into(),
                kind: "oneToMany".into(),
                foreign_key: Some("project_id".into()),
            }],
        }
    }

    #[test]
    fn lists_endpoints_and_fields() {
        let readme = render_readme(&schema(), "Acme");

        assert!(readme.starts_with("# Acme API\n"));
        assert!(readme.contains("- `GET /api/tasks` - get all tasks"));
        assert!(readme.contains("- `DELETE /api/tasks/:id` - delete Task"));
        assert!(readme.contains("- `id` (integer) *primary key, auto-increment*"));
        assert!(readme.contains("- `title` (string) *required*"));
    }

    #[test]
    fn documents_relationships() {
        let readme = render_readme(&schema(), "Acme");
        assert!(readme.contains("- `Project` → `Task` (oneToMany), foreign key `project_id`"));
    }

    #[test]
    fn example_uses_first_entity() {
        let readme = render_readme(&schema(), "Acme");
        assert!(readme.contains("curl http://localhost:4000/api/tasks"));
    }
}
