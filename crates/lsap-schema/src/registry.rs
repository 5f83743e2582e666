//! # Schema Registry
//!
//! Parses every document of a [`SchemaTree`] up front and indexes it for
//! `$ref` resolution. Documents are registered under their `/`-separated
//! path relative to the source root and, when they declare an absolute
//! `$id`, under that URI as well.
//!
//! Loading everything before compiling any module means a malformed file
//! anywhere in the tree aborts the run before a single output is written.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{CompileError, Result};
use crate::source::SchemaTree;

/// All parsed schema documents of a source tree.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    /// Map from relative document key (e.g. `locate/Range.json`) to parsed JSON.
    documents: HashMap<String, Value>,
    /// Map from declared `$id` URI to document key.
    ids: HashMap<String, String>,
}

impl SchemaRegistry {
    /// Read and parse every schema file of `tree`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::Io` if a file cannot be read and
    /// `CompileError::Parse` if a file is not valid JSON.
    pub fn load(tree: &SchemaTree) -> Result<Self> {
        let mut registry = Self::default();
        for file in tree.files() {
            let content = std::fs::read_to_string(&file.path).map_err(|source| {
                CompileError::Io {
                    path: file.path.clone(),
                    source,
                }
            })?;
            let value: Value =
                serde_json::from_str(&content).map_err(|source| CompileError::Parse {
                    path: file.path.clone(),
                    source,
                })?;
            tracing::debug!(document = %file.key, "loaded schema document");
            registry.insert(file.key.clone(), value);
        }
        Ok(registry)
    }

    /// Register a parsed document under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(id) = value.get("$id").and_then(Value::as_str) {
            if is_absolute_uri(id) {
                self.ids
                    .insert(id.trim_end_matches('#').to_string(), key.clone());
            }
        }
        self.documents.insert(key, value);
    }

    /// Look up a document by its relative key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.documents.get(key)
    }

    /// Map an absolute `$id` URI to the key of the document declaring it.
    pub fn key_for_id(&self, uri: &str) -> Option<&str> {
        self.ids.get(uri).map(String::as_str)
    }

    /// Number of loaded documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no document is loaded.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Keys of all loaded documents, sorted alphabetically.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.documents.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Returns true for references carrying a URI scheme (`https://...`, `urn:...`).
pub(crate) fn is_absolute_uri(reference: &str) -> bool {
    match reference.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        }
        None => false,
    }
}
