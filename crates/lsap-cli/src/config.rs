//! # Generator Configuration
//!
//! Settings come from three layers, highest precedence first:
//!
//! 1. Command-line flags (`--schemas`, `--out`, `--strict`).
//! 2. A YAML config file: `--config <file>`, or `lsap.yaml` at the project
//!    root when present.
//! 3. Built-in defaults: `schemas/` in, `src/schema/` out.
//!
//! Paths from the config file and defaults resolve against the project root;
//! paths given as flags are used as typed, relative to the working directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use lsap_schema::CompileOptions;

/// Config file looked up at the project root.
pub const CONFIG_FILE: &str = "lsap.yaml";

/// Default schema source directory, relative to the project root.
pub const DEFAULT_SCHEMAS_DIR: &str = "schemas";

/// Default output directory, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = "src/schema";

/// Contents of `lsap.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Schema source directory.
    pub schemas_dir: PathBuf,
    /// Output directory for generated modules.
    pub output_dir: PathBuf,
    /// Compile every dereferenced schema with `jsonschema` before emitting.
    pub strict: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            schemas_dir: PathBuf::from(DEFAULT_SCHEMAS_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            strict: false,
        }
    }
}

impl GeneratorConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Load `explicit` if given, else `lsap.yaml` under `root` if it exists,
    /// else the defaults.
    pub fn discover(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = root.join(CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using project config");
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }
}

/// Directory and mode flags shared by `generate` and `check`.
#[derive(Args, Debug, Default, Clone)]
pub struct DirArgs {
    /// Schema source directory (default: `schemas/` under the project root).
    #[arg(long, value_name = "DIR")]
    pub schemas: Option<PathBuf>,

    /// Output directory (default: `src/schema/` under the project root).
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Reject documents that are not well-formed Draft 7 schemas.
    #[arg(long)]
    pub strict: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub schemas_dir: PathBuf,
    pub output_dir: PathBuf,
    pub options: CompileOptions,
}

impl Settings {
    /// Merge flags over the config file, resolving config paths against `root`.
    pub fn resolve(args: &DirArgs, config: &GeneratorConfig, root: &Path) -> Self {
        let schemas_dir = args
            .schemas
            .clone()
            .unwrap_or_else(|| root.join(&config.schemas_dir));
        let output_dir = args
            .out
            .clone()
            .unwrap_or_else(|| root.join(&config.output_dir));
        Self {
            schemas_dir,
            output_dir,
            options: CompileOptions {
                strict: args.strict || config.strict,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_layout() {
        let config = GeneratorConfig::default();
        assert_eq!(config.schemas_dir, PathBuf::from("schemas"));
        assert_eq!(config.output_dir, PathBuf::from("src/schema"));
        assert!(!config.strict);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config: GeneratorConfig = serde_yaml::from_str("output_dir: web/src/schema\n").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("web/src/schema"));
        assert_eq!(config.schemas_dir, PathBuf::from(DEFAULT_SCHEMAS_DIR));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<GeneratorConfig, _> = serde_yaml::from_str("templates_key: lsap_templates\n");
        assert!(result.is_err());
    }

    #[test]
    fn discover_prefers_explicit_then_project_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            GeneratorConfig::discover(None, dir.path()).unwrap(),
            GeneratorConfig::default()
        );

        std::fs::write(dir.path().join(CONFIG_FILE), "strict: true\n").unwrap();
        assert!(GeneratorConfig::discover(None, dir.path()).unwrap().strict);

        let explicit = dir.path().join("other.yaml");
        std::fs::write(&explicit, "schemas_dir: spec/schemas\n").unwrap();
        let config = GeneratorConfig::discover(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.schemas_dir, PathBuf::from("spec/schemas"));
        assert!(!config.strict);
    }

    #[test]
    fn discover_missing_explicit_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = GeneratorConfig::discover(Some(&dir.path().join("nope.yaml")), dir.path())
            .unwrap_err();
        assert!(format!("{err:#}").contains("nope.yaml"));
    }

    #[test]
    fn flags_override_config() {
        let root = Path::new("/project");
        let config = GeneratorConfig {
            strict: true,
            ..GeneratorConfig::default()
        };
        let settings = Settings::resolve(&DirArgs::default(), &config, root);
        assert_eq!(settings.schemas_dir, root.join("schemas"));
        assert_eq!(settings.output_dir, root.join("src/schema"));
        assert!(settings.options.strict);

        let args = DirArgs {
            schemas: Some(PathBuf::from("in")),
            out: Some(PathBuf::from("out")),
            strict: false,
        };
        let settings = Settings::resolve(&args, &GeneratorConfig::default(), root);
        assert_eq!(settings.schemas_dir, PathBuf::from("in"));
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert!(!settings.options.strict);
    }
}
