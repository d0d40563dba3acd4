//! Storage definitions and the storage-initialization module.
//!
//! Table and column definitions are typed values rendered to SQL, so the
//! column rules (type mapping, modifier order) can be tested without
//! parsing generated JavaScript.

use std::fmt;

use crate::naming;
use crate::schema::{Entity, Field, FieldType, Schema};

use super::writer::SourceWriter;

/// Storage class of a generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Fixed-width numeric storage.
    Integer,
    Text,
}

impl ColumnType {
    /// Map a declared field type to its storage column type.
    ///
    /// Integers and booleans are numeric; strings, dates and anything
    /// unrecognised are stored as text.
    pub fn for_field(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Integer | FieldType::Boolean => Self::Integer,
            FieldType::String | FieldType::Date | FieldType::Other(_) => Self::Text,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

/// One column of a generated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub not_null: bool,
    pub unique: bool,
}

impl ColumnDef {
    /// Derive the column for a field.
    ///
    /// `autoIncrement` is only honoured on an integer primary key, the one
    /// place the storage engine accepts it. `required` is dropped on the
    /// primary key, which is implicitly non-null.
    pub fn from_field(field: &Field) -> Self {
        let column_type = ColumnType::for_field(&field.field_type);
        Self {
            name: field.name.clone(),
            column_type,
            primary_key: field.primary_key,
            auto_increment: field.auto_increment
                && field.primary_key
                && column_type == ColumnType::Integer,
            not_null: field.required && !field.primary_key,
            unique: field.unique,
        }
    }
}

impl fmt::Display for ColumnDef {
    /// Modifiers are emitted in a fixed order: primary key, auto-increment,
    /// not-null, unique.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            naming::quote_identifier(&self.name),
            self.column_type.as_sql()
        )?;
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        if self.auto_increment {
            f.write_str(" AUTOINCREMENT")?;
        }
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        Ok(())
    }
}

/// A generated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn for_entity(entity: &Entity) -> Self {
        Self {
            name: naming::table_name(&entity.name),
            columns: entity.fields.iter().map(ColumnDef::from_field).collect(),
        }
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` statement, one column per line.
    /// Table and column names are quoted.
    pub fn create_statement(&self) -> String {
        let mut w = SourceWriter::new();
        w.line(format!(
            "CREATE TABLE IF NOT EXISTS {} (",
            naming::quote_identifier(&self.name)
        ));
        w.indented(|w| {
            let last = self.columns.len().saturating_sub(1);
            for (i, column) in self.columns.iter().enumerate() {
                let sep = if i == last { "" } else { "," };
                w.line(format!("{column}{sep}"));
            }
        });
        w.line(")");
        w.finish().trim_end().to_string()
    }
}

/// Table definitions for every entity, in schema order.
pub fn table_definitions(schema: &Schema) -> Vec<TableDef> {
    schema.entities.iter().map(TableDef::for_entity).collect()
}

/// Render `database.js`: promise helpers over the storage driver and an
/// `initialize()` that creates every table inside one transaction.
pub fn render_storage_module(schema: &Schema) -> String {
    let tables = table_definitions(schema);
    let mut w = SourceWriter::new();

    w.line("const path = require('path');")
        .line("const sqlite3 = require('sqlite3');")
        .blank()
        .line("const dbPath = process.env.DATABASE_PATH || path.join(__dirname, 'database.db');")
        .line("const db = new sqlite3.Database(dbPath);")
        .blank();

    w.block("const TABLES = [", "];", |w| {
        for table in &tables {
            let statement = table.create_statement();
            let mut lines = statement.lines();
            if let Some(first) = lines.next() {
                w.line(format!("`{first}"));
            }
            let rest: Vec<&str> = lines.collect();
            let last = rest.len().saturating_sub(1);
            for (i, line) in rest.iter().enumerate() {
                if i == last {
                    w.line(format!("{line}`,"));
                } else {
                    w.line(*line);
                }
            }
        }
    });
    w.blank();

    w.block("function run(sql, params = []) {", "}", |w| {
        w.block("return new Promise((resolve, reject) => {", "});", |w| {
            w.block("db.run(sql, params, function (err) {", "});", |w| {
                w.line("if (err) return reject(err);")
                    .line("resolve({ lastID: this.lastID, changes: this.changes });");
            });
        });
    });
    w.blank();

    for method in ["all", "get"] {
        w.block(format!("function {method}(sql, params = []) {{"), "}", |w| {
            w.block("return new Promise((resolve, reject) => {", "});", |w| {
                w.block(format!("db.{method}(sql, params, (err, result) => {{"), "});", |w| {
                    w.line("if (err) return reject(err);").line("resolve(result);");
                });
            });
        });
        w.blank();
    }

    w.block("async function initialize() {", "}", |w| {
        w.line("await run('BEGIN');");
        w.block("try {", "} catch (err) {", |w| {
            w.block("for (const statement of TABLES) {", "}", |w| {
                w.line("await run(statement);");
            });
            w.line("await run('COMMIT');");
        });
        w.indented(|w| {
            w.line("await run('ROLLBACK');").line("throw err;");
        });
        w.line("}");
        w.line("console.log('database initialized successfully');");
    });
    w.blank();

    w.line("module.exports = { db, run, all, get, initialize };");
    w.finish()
}
