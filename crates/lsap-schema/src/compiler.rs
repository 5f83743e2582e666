//! # Schema Compiler
//!
//! Drives a full run: scan the source tree, load every document, compile
//! each one into a module, and write the modules plus one `index.ts` per
//! schema-bearing directory into the output tree.
//!
//! ## Failure atomicity
//!
//! The complete [`OutputPlan`] is built in memory before anything touches
//! the output directory. A parse, reference or conversion error anywhere in
//! the tree therefore aborts the run with the output left as it was. Only a
//! write failure can leave a partially updated tree, and it is reported as
//! `CompileError::Write` so the invoker re-runs after fixing the path.
//!
//! ## Determinism
//!
//! Directories, files and index entries are emitted in sorted order and no
//! timestamps are embedded, so two runs over the same input produce
//! byte-identical trees.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{CompileError, ReferenceError, Result};
use crate::module::{compile_dereferenced, render_index, INDEX_FILE};
use crate::reference::dereference;
use crate::registry::SchemaRegistry;
use crate::source::scan;

/// Options for a compiler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Additionally compile every dereferenced document with the
    /// `jsonschema` crate and reject malformed schemas.
    pub strict: bool,
}

/// Every file a run will produce, keyed by path relative to the output root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPlan {
    files: BTreeMap<PathBuf, String>,
    modules: usize,
    indexes: usize,
    directories: usize,
}

impl OutputPlan {
    /// Iterate `(relative path, contents)` in sorted path order.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    /// Contents planned for `path` (relative to the output root).
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Number of planned files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the plan produces nothing.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of planned validator modules.
    pub fn module_count(&self) -> usize {
        self.modules
    }

    /// Number of planned directory indexes.
    pub fn index_count(&self) -> usize {
        self.indexes
    }
}

/// Summary of a completed [`compile`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileReport {
    /// Output root written to.
    pub output_dir: PathBuf,
    /// Validator modules written.
    pub modules: usize,
    /// Directory indexes written.
    pub indexes: usize,
    /// Output directories holding an index.
    pub directories: usize,
}

/// State of one planned file relative to the output tree on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Drift {
    /// The file does not exist.
    Missing {
        /// Path relative to the output root.
        path: PathBuf,
        /// Contents a run would write.
        expected: String,
    },
    /// The file exists with different contents.
    Stale {
        /// Path relative to the output root.
        path: PathBuf,
        /// Contents currently on disk.
        actual: String,
        /// Contents a run would write.
        expected: String,
    },
}

impl Drift {
    /// Path relative to the output root.
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path, .. } | Self::Stale { path, .. } => path,
        }
    }
}

/// Result of a [`check`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Number of planned files compared.
    pub checked: usize,
    /// Files that a run would create or change, in path order.
    pub drift: Vec<Drift>,
}

impl CheckReport {
    /// Returns true if the output tree matches the plan.
    pub fn is_up_to_date(&self) -> bool {
        self.drift.is_empty()
    }
}

/// Build the complete output plan for the schema tree at `source`.
///
/// # Errors
///
/// Any scan, parse, reference, naming or conversion error (and in strict
/// mode, schema compilation errors). Nothing is written.
pub fn plan(source: &Path, options: &CompileOptions) -> Result<OutputPlan> {
    let tree = scan(source)?;
    let registry = SchemaRegistry::load(&tree)?;
    tracing::debug!(
        source = %source.display(),
        documents = registry.len(),
        directories = tree.dir_count(),
        "loaded schema tree"
    );

    let mut plan = OutputPlan::default();
    for (dir, files) in tree.dirs() {
        let index = render_index(files.iter().map(|f| &f.name));
        plan.files.insert(dir.join(INDEX_FILE), index);
        plan.indexes += 1;
        plan.directories += 1;

        for file in files {
            let value = registry.get(&file.key).ok_or_else(|| ReferenceError::MissingDocument {
                document: file.key.clone(),
                reference: file.key.clone(),
                target: file.key.clone(),
            })?;
            let dereferenced = dereference(&file.key, value, &registry)?;
            if options.strict {
                check_schema(&file.key, &dereferenced)?;
            }
            let module = compile_dereferenced(&file.name, &file.key, &dereferenced)?;
            plan.files.insert(dir.join(module.file_name()), module.render());
            plan.modules += 1;
        }
    }
    Ok(plan)
}

/// Compile the schema tree at `source` into `output`.
///
/// Existing files at planned paths are overwritten; other files under
/// `output` are left alone.
///
/// # Errors
///
/// See [`plan`]; additionally `CompileError::Write` if an output path
/// cannot be created or written.
pub fn compile(source: &Path, output: &Path, options: &CompileOptions) -> Result<CompileReport> {
    let plan = plan(source, options)?;
    write_plan(&plan, output)
}

/// Write every file of `plan` below `output`.
pub fn write_plan(plan: &OutputPlan, output: &Path) -> Result<CompileReport> {
    for (rel, contents) in plan.files() {
        let path = output.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CompileError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, contents).map_err(|source| CompileError::Write {
            path: path.clone(),
            source,
        })?;
        if rel.file_name().is_some_and(|n| n == INDEX_FILE) {
            tracing::info!(path = %path.display(), "generated index");
        } else {
            tracing::info!(path = %path.display(), "generated module");
        }
    }

    Ok(CompileReport {
        output_dir: output.to_path_buf(),
        modules: plan.modules,
        indexes: plan.indexes,
        directories: plan.directories,
    })
}

/// Compare the plan for `source` with the files under `output` without
/// writing anything.
///
/// # Errors
///
/// See [`plan`]; additionally `CompileError::Io` if an existing output file
/// cannot be read.
pub fn check(source: &Path, output: &Path, options: &CompileOptions) -> Result<CheckReport> {
    let plan = plan(source, options)?;
    let mut drift = Vec::new();

    for (rel, expected) in plan.files() {
        let path = output.join(rel);
        match std::fs::read_to_string(&path) {
            Ok(actual) if actual == expected => {}
            Ok(actual) => drift.push(Drift::Stale {
                path: rel.to_path_buf(),
                actual,
                expected: expected.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => drift.push(Drift::Missing {
                path: rel.to_path_buf(),
                expected: expected.to_string(),
            }),
            Err(source) => return Err(CompileError::Io { path, source }),
        }
    }

    if !drift.is_empty() {
        tracing::warn!(outdated = drift.len(), "generated output is out of date");
    }
    Ok(CheckReport {
        checked: plan.len(),
        drift,
    })
}

/// Compile `schema` as a Draft 7 schema to reject malformed documents.
fn check_schema(document: &str, schema: &Value) -> Result<()> {
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft7);
    opts.build(schema)
        .map(|_| ())
        .map_err(|e| CompileError::InvalidSchema {
            document: document.to_string(),
            reason: e.to_string(),
        })
}
