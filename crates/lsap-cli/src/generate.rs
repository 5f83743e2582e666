//! # Generate Subcommand
//!
//! Regenerates the whole validator tree. This is also what `lsap-gen` runs
//! when invoked without a subcommand.

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{DirArgs, Settings};

/// Arguments for the generate subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the generate subcommand.
pub fn run_generate(args: &GenerateArgs, settings: &Settings) -> Result<u8> {
    tracing::debug!(
        schemas = %settings.schemas_dir.display(),
        output = %settings.output_dir.display(),
        strict = settings.options.strict,
        "generating validator modules"
    );

    let report = lsap_schema::compile(&settings.schemas_dir, &settings.output_dir, &settings.options)
        .with_context(|| {
            format!(
                "failed to compile schemas from {}",
                settings.schemas_dir.display()
            )
        })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Generated {} modules and {} indexes in {}",
            report.modules,
            report.indexes,
            report.output_dir.display()
        );
    }
    Ok(0)
}
