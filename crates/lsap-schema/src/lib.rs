//! # lsap-schema: Schema Compiler for LSAP
//!
//! Converts the LSAP JSON Schema tree into TypeScript validator modules
//! written in the `zod` idiom. The documentation site and SDK import the
//! generated modules statically; the schemas stay the single source of
//! truth for every request and response shape of the protocol.
//!
//! ## Pipeline
//!
//! 1. [`source::scan`] enumerates the source tree into a [`SchemaTree`],
//!    keeping only directories that directly hold `.json` files.
//! 2. [`SchemaRegistry::load`] parses every document up front and indexes
//!    it by relative path and declared `$id`.
//! 3. [`reference::dereference`] inlines every `$ref` (in-document,
//!    cross-file, or by `$id`), rejecting dangling and cyclic references.
//! 4. [`node::RootSchema`] converts the dereferenced JSON into typed
//!    [`SchemaNode`]s, lifting the `markdown` templates side-channel into an
//!    explicit optional field.
//! 5. [`zod::expression`] renders the node tree; [`GeneratedModule`] wraps
//!    it into module text and [`module::render_index`] builds `index.ts`.
//! 6. [`compiler::compile`] assembles the whole [`OutputPlan`] in memory
//!    and only then writes it, so input errors never leave partial output.
//!
//! ## Crate Policy
//!
//! - No process-wide state: [`compile_document`] is a pure function of a
//!   document and a [`ResolveRef`] implementation.
//! - Output is deterministic: sorted listings, no timestamps.
//! - Every failure is fatal and reported through [`CompileError`].

pub mod compiler;
pub mod error;
pub mod module;
pub mod node;
pub mod reference;
pub mod registry;
pub mod source;
pub mod zod;

pub use compiler::{
    check, compile, plan, write_plan, CheckReport, CompileOptions, CompileReport, Drift,
    OutputPlan,
};
pub use error::{CompileError, ReferenceError};
pub use module::{compile_document, render_index, GeneratedModule, INDEX_FILE, MODULE_EXTENSION};
pub use node::{RootSchema, SchemaKind, SchemaNode, TEMPLATES_KEY};
pub use reference::{dereference, ResolveRef, Target};
pub use registry::SchemaRegistry;
pub use source::{scan, SchemaFile, SchemaName, SchemaTree};
