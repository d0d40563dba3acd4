//! Entrypoint module (`index.js`).
//!
//! Mounts every entity router under its base path, exposes the liveness
//! endpoint, and starts listening on `PORT` only once storage
//! initialization has succeeded.

use crate::naming;
use crate::schema::Schema;

use super::writer::SourceWriter;

/// Port the generated service falls back to when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 4000;

pub fn render_entrypoint(schema: &Schema) -> String {
    let mut w = SourceWriter::new();

    w.line("const express = require('express');")
        .line("const cors = require('cors');")
        .line("const bodyParser = require('body-parser');")
        .line("const db = require('./database');")
        .blank();

    for entity in &schema.entities {
        w.line(format!(
            "const {} = require('./{}');",
            naming::router_binding(&entity.name),
            naming::route_path(&entity.name).trim_end_matches(".js"),
        ));
    }
    w.blank();

    w.line("const app = express();")
        .line(format!("const PORT = Number(process.env.PORT) || {DEFAULT_PORT};"))
        .blank()
        .line("app.use(cors());")
        .line("app.use(bodyParser.json());")
        .blank();

    for entity in &schema.entities {
        w.line(format!(
            "app.use('{}', {});",
            naming::route_base_path(&entity.name),
            naming::router_binding(&entity.name),
        ));
    }
    w.blank();

    w.block(
        format!("app.get('{}', (req, res) => {{", naming::HEALTH_PATH),
        "});",
        |w| {
            w.line("res.json({ status: 'running', timestamp: new Date().toISOString() });");
        },
    );
    w.blank();

    w.block("app.use((err, req, res, next) => {", "});", |w| {
        w.line("console.error(err.stack);")
            .line("res.status(500).json({ error: 'something went wrong', message: err.message });");
    });
    w.blank();

    w.line("db.initialize()");
    w.indented(|w| {
        w.block(".then(() => {", "})", |w| {
            w.block("app.listen(PORT, () => {", "});", |w| {
                w.line("console.log(`api server running on port ${PORT}`);");
            });
        });
        w.block(".catch((err) => {", "});", |w| {
            w.line("console.error('database initialization failed:', err);")
                .line("process.exit(1);");
        });
    });
    w.blank();

    w.line("module.exports = app;");
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Entity, Field};

    fn schema(names: &[&str]) -> Schema {
        Schema {
            entities: names
                .iter()
                .map(|n| Entity {
                    name: (*n).into(),
                    fields: vec![Field::id("id")],
                })
                .collect(),
            relationships: vec![],
        }
    }

    #[test]
    fn mounts_each_entity_under_plural_path() {
        let module = render_entrypoint(&schema(&["Task", "Project"]));

        assert!(module.contains("const taskRoutes = require('./routes/task');"));
        assert!(module.contains("const projectRoutes = require('./routes/project');"));
        assert!(module.contains("app.use('/api/tasks', taskRoutes);"));
        assert!(module.contains("app.use('/api/projects', projectRoutes);"));
    }

    #[test]
    fn reads_port_from_environment() {
        let module = render_entrypoint(&schema(&["Task"]));
        assert!(module.contains("const PORT = Number(process.env.PORT) || 4000;"));
    }

    #[test]
    fn listens_only_after_storage_initialization() {
        let module = render_entrypoint(&schema(&["Task"]));
        let init = module.find("db.initialize()").expect("initialize call");
        let listen = module.find("app.listen(PORT").expect("listen call");
        assert!(init < listen);
        assert!(module.contains("app.get('/health', (req, res) => {"));
    }
}
