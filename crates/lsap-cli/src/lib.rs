//! # lsap-cli
//!
//! Command-line front end for `lsap-schema`. Regenerates the TypeScript zod
//! validators from the JSON Schema tree, or verifies that the checked-in
//! output is current.
//!
//! ## Subcommands
//!
//! - `generate` (the default) compiles `schemas/` into `src/schema/`.
//! - `check` compares the output tree against a fresh compile and exits 1 on
//!   drift.
//!
//! Argument parsing lives in `main.rs`; the handlers here only resolve
//! settings and delegate to the library.

use std::path::{Path, PathBuf};

pub mod check;
pub mod config;
pub mod generate;

/// Walk up from `start` to the nearest directory holding `schemas/` or an
/// `lsap.yaml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            dir.join(config::DEFAULT_SCHEMAS_DIR).is_dir() || dir.join(config::CONFIG_FILE).is_file()
        })
        .map(Path::to_path_buf)
}
