//! Code synthesis: validated schema → named source artifacts.
//!
//! [`synthesize`] is a pure function; it never touches the filesystem and
//! never fails on a validated schema. Writing the result to disk is a
//! separate step ([`ArtifactSet::write_to`]) so the mapping can be tested on
//! its own.

pub mod entrypoint;
pub mod manifest;
pub mod model;
pub mod readme;
pub mod route;
pub mod storage;
pub mod writer;

use std::path::Path;

use indexmap::IndexMap;
use tokio::io::AsyncWriteExt;

use crate::naming;
use crate::schema::Schema;

pub const MANIFEST_FILE: &str = "package.json";
pub const ENTRYPOINT_FILE: &str = "index.js";
pub const STORAGE_FILE: &str = "database.js";
pub const README_FILE: &str = "README.md";

/// Mapping from relative file path to file content, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: IndexMap<String, String>,
}

impl ArtifactSet {
    fn insert(&mut self, path: impl Into<String>, content: String) {
        self.files.insert(path.into(), content);
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths under `dir/` (e.g. [`naming::MODELS_DIR`]).
    pub fn paths_in<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.paths().filter(move |p| {
            p.strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Write every artifact under `root`, creating subdirectories as needed.
    ///
    /// Files are created with create-new semantics: an existing file is an
    /// error, never overwritten.
    pub async fn write_to(&self, root: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(root).await?;

        for (relative, content) in &self.files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
        }

        tracing::debug!(root = %root.display(), files = self.files.len(), "Artifacts written");
        Ok(())
    }
}

/// Generate the complete artifact set for a validated schema.
///
/// Produces, in order: manifest, entrypoint, storage-initialization module,
/// documentation, then one data-access module and one route module per
/// entity.
pub fn synthesize(schema: &Schema, display_name: &str) -> ArtifactSet {
    let mut artifacts = ArtifactSet::default();

    artifacts.insert(MANIFEST_FILE, manifest::render_manifest(display_name));
    artifacts.insert(ENTRYPOINT_FILE, entrypoint::render_entrypoint(schema));
    artifacts.insert(STORAGE_FILE, storage::render_storage_module(schema));
    artifacts.insert(README_FILE, readme::render_readme(schema, display_name));

    for entity in &schema.entities {
        artifacts.insert(
            naming::model_path(&entity.name),
            model::render_model_module(entity),
        );
    }

    for entity in &schema.entities {
        artifacts.insert(
            naming::route_path(&entity.name),
            route::render_route_module(entity),
        );
    }

    artifacts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
