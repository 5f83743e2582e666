//! # Error Types
//!
//! Every failure of the schema compiler is fatal for the whole run. Errors
//! identify the offending file (relative to the source root where possible)
//! so the invoker can fix the input and re-run.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a compiler run.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A `.json` file is not valid JSON.
    #[error("parse error in '{path}': {source}")]
    Parse {
        /// Path of the malformed document.
        path: PathBuf,
        /// Underlying JSON error with line and column.
        #[source]
        source: serde_json::Error,
    },

    /// A `$ref` could not be resolved.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// An output file or directory could not be written.
    #[error("write error for '{path}': {source}")]
    Write {
        /// Output path that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A schema file name cannot become an exported identifier.
    #[error("invalid schema name '{name}' ({path}): {reason}")]
    InvalidName {
        /// Offending base name.
        name: String,
        /// Path of the schema file.
        path: PathBuf,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// The schema uses a construct the zod emitter cannot express.
    #[error("unsupported schema construct in '{document}' at '{pointer}': {reason}")]
    Unsupported {
        /// Document the construct was found in.
        document: String,
        /// JSON Pointer to the node within the dereferenced document.
        pointer: String,
        /// Description of the construct.
        reason: String,
    },

    /// Strict mode: the dereferenced document is not a well-formed schema.
    #[error("invalid schema '{document}': {reason}")]
    InvalidSchema {
        /// Document that failed to compile.
        document: String,
        /// Message from the schema compiler.
        reason: String,
    },

    /// The source tree could not be read.
    #[error("io error reading '{path}': {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Failure to resolve a single `$ref`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The reference names a document that is not part of the schema tree.
    #[error("reference '{reference}' in '{document}' points to a missing document '{target}'")]
    MissingDocument {
        /// Document containing the `$ref`.
        document: String,
        /// Raw `$ref` value.
        reference: String,
        /// Normalized target document path.
        target: String,
    },

    /// The target document exists but the JSON Pointer does not.
    #[error("reference '{reference}' in '{document}' points to a missing path '{pointer}'")]
    MissingPointer {
        /// Document containing the `$ref`.
        document: String,
        /// Raw `$ref` value.
        reference: String,
        /// Fragment pointer that was not found.
        pointer: String,
    },

    /// The reference re-enters a target that is still being expanded.
    #[error("cyclic reference in '{document}': {}", chain.join(" -> "))]
    Cycle {
        /// Document in which the cycle was detected.
        document: String,
        /// Targets on the expansion stack, ending with the repeated one.
        chain: Vec<String>,
    },

    /// The reference form is not supported (remote URL, escaping path, non-string).
    #[error("unsupported reference '{reference}' in '{document}': {reason}")]
    Unsupported {
        /// Document containing the `$ref`.
        document: String,
        /// Raw `$ref` value.
        reference: String,
        /// Why the reference cannot be resolved locally.
        reason: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;
