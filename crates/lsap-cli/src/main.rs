//! # lsap-gen entry point
//!
//! Parses command-line arguments, sets up logging on stderr, and dispatches
//! to the generate or check handler. Running with no subcommand generates.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lsap_cli::check::{run_check, CheckArgs};
use lsap_cli::config::{DirArgs, GeneratorConfig, Settings};
use lsap_cli::find_project_root;
use lsap_cli::generate::{run_generate, GenerateArgs};

/// Compile the LSAP JSON Schemas into TypeScript zod validators.
#[derive(Parser, Debug)]
#[command(name = "lsap-gen", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a configuration file (default: `lsap.yaml` at the project root).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Regenerate every validator module and directory index.
    Generate(GenerateArgs),

    /// Verify the generated tree is up to date without writing.
    Check(CheckArgs),
}

impl Commands {
    fn dirs(&self) -> &DirArgs {
        match self {
            Commands::Generate(args) => &args.dirs,
            Commands::Check(args) => &args.dirs,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // stdout carries the report; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let root = find_project_root(&cwd).unwrap_or_else(|| {
        tracing::debug!("no project root found; using current directory");
        cwd.clone()
    });
    tracing::debug!(root = %root.display(), "resolved project root");

    match run(cli, &root) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli, root: &Path) -> anyhow::Result<u8> {
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Generate(GenerateArgs::default()));
    let config = GeneratorConfig::discover(cli.config.as_deref(), root)?;
    let settings = Settings::resolve(command.dirs(), &config, root);

    match &command {
        Commands::Generate(args) => run_generate(args, &settings),
        Commands::Check(args) => run_check(args, &settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_generate() {
        let cli = Cli::try_parse_from(["lsap-gen"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_generate_flags() {
        let cli = Cli::try_parse_from([
            "lsap-gen", "generate", "--schemas", "spec", "--out", "web/src/schema", "--strict", "--json",
        ])
        .unwrap();
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.dirs.schemas, Some(PathBuf::from("spec")));
        assert_eq!(args.dirs.out, Some(PathBuf::from("web/src/schema")));
        assert!(args.dirs.strict);
        assert!(args.json);
    }

    #[test]
    fn parse_check_with_global_flags() {
        let cli = Cli::try_parse_from(["lsap-gen", "check", "-vv", "--config", "ci.yaml", "--quiet"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("ci.yaml")));
        assert!(matches!(cli.command, Some(Commands::Check(ref args)) if args.quiet));
    }

    #[test]
    fn check_rejects_json_flag() {
        assert!(Cli::try_parse_from(["lsap-gen", "check", "--json"]).is_err());
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["lsap-gen", "validate"]).is_err());
    }

    #[test]
    fn run_without_subcommand_generates_into_default_layout() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("schemas/abc")).unwrap();
        std::fs::write(
            root.path().join("schemas/abc/Cursor.json"),
            r#"{"type":["string","null"],"default":null}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from(["lsap-gen"]).unwrap();
        assert_eq!(run(cli, root.path()).unwrap(), 0);

        let module = std::fs::read_to_string(root.path().join("src/schema/abc/Cursor.ts")).unwrap();
        assert!(module.contains("export const Cursor = z.union([z.string(), z.null()]).default(null);"));
        assert_eq!(
            std::fs::read_to_string(root.path().join("src/schema/abc/index.ts")).unwrap(),
            "export * from \"./Cursor\";\n"
        );

        let cli = Cli::try_parse_from(["lsap-gen", "check"]).unwrap();
        assert_eq!(run(cli, root.path()).unwrap(), 0);
    }

    #[test]
    fn project_config_redirects_output() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("defs")).unwrap();
        std::fs::write(root.path().join("defs/Flag.json"), r#"{"type":"boolean"}"#).unwrap();
        std::fs::write(
            root.path().join("lsap.yaml"),
            "schemas_dir: defs\noutput_dir: gen\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from(["lsap-gen", "generate"]).unwrap();
        assert_eq!(run(cli, root.path()).unwrap(), 0);
        assert!(root.path().join("gen/Flag.ts").is_file());
        assert!(root.path().join("gen/index.ts").is_file());
    }
}
