//! # Source Tree Scan
//!
//! Enumerates the schema source directory into a [`SchemaTree`]: a mapping
//! from each directory (relative to the source root) to the schema files it
//! directly contains. Directories without schema files never appear in the
//! tree, which is what suppresses empty output directories and indexes.
//!
//! The walk uses an explicit stack, so deeply nested trees do not grow the
//! call stack. Every listing is sorted by name before use.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{CompileError, Result};

/// File extension of schema documents (case sensitive).
pub const SCHEMA_EXTENSION: &str = ".json";

/// Base name reserved for the generated directory index.
pub const INDEX_NAME: &str = "index";

/// ECMAScript reserved words that cannot name an exported `const`.
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Base name of a schema file, validated as an exportable identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaName(String);

impl SchemaName {
    /// Validate `name` (a file name without `.json`) found at `path`.
    pub fn parse(name: &str, path: &Path) -> Result<Self> {
        let invalid = |reason| CompileError::InvalidName {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason,
        };

        let mut chars = name.chars();
        match chars.next() {
            None => return Err(invalid("name is empty")),
            Some(c) if !(c.is_ascii_alphabetic() || c == '_' || c == '$') => {
                return Err(invalid("name must start with a letter, '_' or '$'"));
            }
            Some(_) => {}
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(invalid("name may only contain letters, digits, '_' and '$'"));
        }
        if name == INDEX_NAME {
            return Err(invalid("'index' is reserved for the directory index"));
        }
        if RESERVED_WORDS.contains(&name) {
            return Err(invalid("name is a reserved word"));
        }
        Ok(Self(name.to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A schema document discovered in the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    /// Validated base name.
    pub name: SchemaName,
    /// Path on disk.
    pub path: PathBuf,
    /// `/`-separated path relative to the source root, e.g. `abc/PaginatedRequest.json`.
    pub key: String,
}

/// Directories of the source tree that directly contain schema files.
#[derive(Debug, Clone, Default)]
pub struct SchemaTree {
    root: PathBuf,
    dirs: BTreeMap<PathBuf, Vec<SchemaFile>>,
}

impl SchemaTree {
    /// Source root the tree was scanned from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Iterate `(relative directory, files)` pairs in sorted directory order.
    /// Files within a directory are sorted by base name.
    pub fn dirs(&self) -> impl Iterator<Item = (&Path, &[SchemaFile])> {
        self.dirs.iter().map(|(dir, files)| (dir.as_path(), files.as_slice()))
    }

    /// Iterate every schema file of the tree.
    pub fn files(&self) -> impl Iterator<Item = &SchemaFile> {
        self.dirs.values().flatten()
    }

    /// Number of schema files.
    pub fn file_count(&self) -> usize {
        self.dirs.values().map(Vec::len).sum()
    }

    /// Number of directories holding at least one schema file.
    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Returns true if the tree holds no schema at all.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Scan `root` for schema files.
///
/// # Errors
///
/// Returns `CompileError::Io` if a directory cannot be listed and
/// `CompileError::InvalidName` if a schema file name is not a usable
/// identifier.
pub fn scan(root: &Path) -> Result<SchemaTree> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| CompileError::Io { path, source }
    };

    let mut dirs = BTreeMap::new();
    let mut stack = vec![PathBuf::new()];

    while let Some(rel_dir) = stack.pop() {
        let dir = root.join(&rel_dir);
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err(&dir))? {
            let entry = entry.map_err(io_err(&dir))?;
            let file_type = entry.file_type().map_err(io_err(&entry.path()))?;
            entries.push((entry.file_name(), file_type));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut files = Vec::new();
        for (file_name, file_type) in entries {
            let path = dir.join(&file_name);
            if file_type.is_dir() {
                stack.push(rel_dir.join(&file_name));
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let Some(base) = file_name
                .to_str()
                .and_then(|n| n.strip_suffix(SCHEMA_EXTENSION))
            else {
                continue;
            };
            let name = SchemaName::parse(base, &path)?;
            let key = document_key(&rel_dir, &format!("{base}{SCHEMA_EXTENSION}"));
            files.push(SchemaFile { name, path, key });
        }

        if files.is_empty() {
            tracing::debug!(dir = %dir.display(), "no schema files, skipping directory");
        } else {
            files.sort_by(|a, b| a.name.cmp(&b.name));
            dirs.insert(rel_dir, files);
        }
    }

    Ok(SchemaTree {
        root: root.to_path_buf(),
        dirs,
    })
}

/// Build the `/`-separated registry key for `file_name` inside `rel_dir`.
pub fn document_key(rel_dir: &Path, file_name: &str) -> String {
    let mut parts: Vec<String> = rel_dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.push(file_name.to_string());
    parts.join("/")
}
