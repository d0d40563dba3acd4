//! Per-entity data-access module (`models/<entity>.js`).
//!
//! Exposes five promise-returning operations: `findAll`, `findById`,
//! `create`, `update` and `remove`. `create` and `update` persist the
//! caller's payload verbatim (every key except `id` becomes a column), after
//! checking each key is a plain identifier. Table and column names are
//! double-quoted in every statement so keyword names such as `order` work.

use crate::naming;
use crate::schema::Entity;

use super::writer::SourceWriter;

/// Names of the operations every data-access module exports.
pub const OPERATIONS: [&str; 5] = ["findAll", "findById", "create", "update", "remove"];

pub fn render_model_module(entity: &Entity) -> String {
    let table = naming::table_name(&entity.name);
    let primary_key = entity
        .primary_key()
        .map(|f| f.name.as_str())
        .unwrap_or("id");

    let mut w = SourceWriter::new();

    w.line("const { run, all, get } = require('../database');")
        .blank()
        .line(format!("const TABLE = '{}';", naming::quote_identifier(&table)))
        .line(format!("const PRIMARY_KEY = '{primary_key}';"))
        .line("const KEY = quote(PRIMARY_KEY);")
        .line("const COLUMN_NAME = /^[A-Za-z_][A-Za-z0-9_]*$/;")
        .blank();

    w.block("function quote(column) {", "}", |w| {
        w.line("return `\"${column}\"`;");
    });
    w.blank();

    w.block("function payloadColumns(data) {", "}", |w| {
        w.line("const columns = Object.keys(data || {}).filter((key) => key !== 'id');");
        w.block("for (const column of columns) {", "}", |w| {
            w.block("if (!COLUMN_NAME.test(column)) {", "}", |w| {
                w.line("throw new Error(`invalid column name: ${column}`);");
            });
        });
        w.line("return columns;");
    });
    w.blank();

    w.block("async function findAll() {", "}", |w| {
        w.line("return all(`SELECT * FROM ${TABLE}`);");
    });
    w.blank();

    w.block("async function findById(id) {", "}", |w| {
        w.line("return get(`SELECT * FROM ${TABLE} WHERE ${KEY} = ?`, [id]);");
    });
    w.blank();

    w.block("async function create(data) {", "}", |w| {
        w.line("const columns = payloadColumns(data);")
            .line("const placeholders = columns.map(() => '?').join(', ');")
            .line("const sql = columns.length === 0")
            .indented(|w| {
                w.line("? `INSERT INTO ${TABLE} DEFAULT VALUES`")
                    .line(": `INSERT INTO ${TABLE} (${columns.map(quote).join(', ')}) VALUES (${placeholders})`;");
            })
            .line("const result = await run(sql, columns.map((column) => data[column]));")
            .line("return get(`SELECT * FROM ${TABLE} WHERE rowid = ?`, [result.lastID]);");
    });
    w.blank();

    w.block("async function update(id, data) {", "}", |w| {
        w.line("const columns = payloadColumns(data);");
        w.block("if (columns.length === 0) {", "}", |w| {
            w.line("throw new Error('no fields to update');");
        });
        w.line("const assignments = columns.map((column) => `${quote(column)} = ?`).join(', ');")
            .line("const values = columns.map((column) => data[column]);")
            .line("const result = await run(")
            .indented(|w| {
                w.line("`UPDATE ${TABLE} SET ${assignments} WHERE ${KEY} = ?`,")
                    .line("[...values, id],");
            })
            .line(");");
        w.block("if (result.changes === 0) {", "}", |w| {
            w.line("return null;");
        });
        w.line("return findById(columns.includes(PRIMARY_KEY) ? data[PRIMARY_KEY] : id);");
    });
    w.blank();

    w.block("async function remove(id) {", "}", |w| {
        w.line("return run(`DELETE FROM ${TABLE} WHERE ${KEY} = ?`, [id]);");
    });
    w.blank();

    w.line(format!("module.exports = {{ {} }};", OPERATIONS.join(", ")));
    w.finish()
}
