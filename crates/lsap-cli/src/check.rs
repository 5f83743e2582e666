//! # Check Subcommand
//!
//! Verifies that the generated tree matches what `generate` would write,
//! without touching it. Exits with status 1 and prints a unified diff per
//! stale file when the output is out of date, which makes it suitable as a
//! CI gate.

use anyhow::{Context, Result};
use clap::Args;
use similar::TextDiff;

use lsap_schema::{CheckReport, Drift};

use crate::config::{DirArgs, Settings};

/// Arguments for the check subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// List out-of-date files without printing diffs.
    #[arg(long)]
    pub quiet: bool,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs, settings: &Settings) -> Result<u8> {
    let report = lsap_schema::check(&settings.schemas_dir, &settings.output_dir, &settings.options)
        .with_context(|| {
            format!(
                "failed to check {} against {}",
                settings.output_dir.display(),
                settings.schemas_dir.display()
            )
        })?;

    print!("{}", render_report(&report, !args.quiet));
    Ok(if report.is_up_to_date() { 0 } else { 1 })
}

/// Human-readable check output.
pub fn render_report(report: &CheckReport, with_diffs: bool) -> String {
    if report.is_up_to_date() {
        return format!("{} generated files are up to date\n", report.checked);
    }

    let mut out = String::new();
    for drift in &report.drift {
        let path = drift.path().display();
        match drift {
            Drift::Missing { .. } => out.push_str(&format!("missing: {path}\n")),
            Drift::Stale { actual, expected, .. } => {
                out.push_str(&format!("stale:   {path}\n"));
                if with_diffs {
                    out.push_str(&unified_diff(&path.to_string(), actual, expected));
                }
            }
        }
    }
    out.push_str(&format!(
        "{} of {} generated files are out of date; run `lsap-gen` to regenerate\n",
        report.drift.len(),
        report.checked
    ));
    out
}

fn unified_diff(path: &str, actual: &str, expected: &str) -> String {
    TextDiff::from_lines(actual, expected)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}
