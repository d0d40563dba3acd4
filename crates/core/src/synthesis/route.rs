//! Per-entity route module (`routes/<entity>.js`).
//!
//! The canonical five-route CRUD surface, delegating straight to the
//! entity's data-access module.

use crate::naming;
use crate::schema::Entity;

use super::writer::SourceWriter;

pub fn render_route_module(entity: &Entity) -> String {
    let slug = naming::entity_slug(&entity.name);
    let plural = naming::table_name(&entity.name);
    let model = naming::model_binding(&entity.name);

    let mut w = SourceWriter::new();

    w.line("const express = require('express');")
        .line(format!("const {model} = require('../models/{slug}');"))
        .blank()
        .line("const router = express.Router();")
        .blank();

    handler(&mut w, &format!("get all {plural}"), "get('/'", 500, |w| {
        w.line(format!("const rows = await {model}.findAll();"))
            .line("res.json({ data: rows, count: rows.length });");
    });

    handler(&mut w, &format!("get single {slug}"), "get('/:id'", 500, |w| {
        w.line(format!("const row = await {model}.findById(req.params.id);"));
        not_found_guard(w, &slug);
        w.line("res.json({ data: row });");
    });

    handler(&mut w, &format!("create {slug}"), "post('/'", 400, |w| {
        w.line(format!("const row = await {model}.create(req.body);"))
            .line("res.status(201).json({ data: row });");
    });

    handler(&mut w, &format!("update {slug}"), "put('/:id'", 400, |w| {
        w.line(format!(
            "const row = await {model}.update(req.params.id, req.body);"
        ));
        not_found_guard(w, &slug);
        w.line("res.json({ data: row });");
    });

    handler(&mut w, &format!("delete {slug}"), "delete('/:id'", 500, |w| {
        w.line(format!("await {model}.remove(req.params.id);"))
            .line(format!(
                "res.json({{ message: '{slug} deleted successfully' }});"
            ));
    });

    w.line("module.exports = router;");
    w.finish()
}

/// One async Express handler wrapped in try/catch; failures answer with
/// `error_status` and the error message.
fn handler(
    w: &mut SourceWriter,
    comment: &str,
    route: &str,
    error_status: u16,
    body: impl FnOnce(&mut SourceWriter),
) {
    w.line(format!("// {comment}"));
    w.block(format!("router.{route}, async (req, res) => {{"), "});", |w| {
        w.block("try {", "} catch (err) {", body);
        w.indented(|w| {
            w.line(format!(
                "res.status({error_status}).json({{ error: err.message }});"
            ));
        });
        w.line("}");
    });
    w.blank();
}

fn not_found_guard(w: &mut SourceWriter, slug: &str) {
    w.block("if (!row) {", "}", |w| {
        w.line(format!(
            "return res.status(404).json({{ error: '{slug} not found' }});"
        ));
    });
}
