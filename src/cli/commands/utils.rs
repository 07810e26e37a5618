//! Shared utilities for CLI commands

use console::{style, Term};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::cli::{GlobalOpts, InputArgs};
use crate::core::AnalyzerConfig;
use crate::ingest::{discover_reports, spawn_loader, LoadEvent, LoadOutcome};

/// Discover and load the reports named by `input`.
///
/// Progress goes to stderr when it is a terminal. Files that fail to load are
/// listed as warnings; only a batch without any usable record is an error.
pub fn load_reports(input: &InputArgs, config: &AnalyzerConfig, global: &GlobalOpts) -> Result<LoadOutcome> {
    let discovery = discover_reports(&input.paths, input.recursive, input.prefer);
    if !global.quiet {
        for (path, error) in &discovery.unreadable {
            eprintln!("{} skipped {}: {}", style("!").yellow(), style(path.display()).cyan(), error);
        }
    }
    let paths = discovery.reports;
    let total = paths.len() + discovery.unreadable.len();
    if paths.is_empty() {
        if total > 0 {
            return Err(miette::miette!("No data extracted from {} file(s)", total));
        }
        return Err(miette::miette!(
            help = "pass .csv / .pdf files, or use --recursive for nested directories",
            "No CSV or PDF reports found"
        ));
    }

    let term = Term::stderr();
    let show_progress = !global.quiet && term.is_term();

    let handle = spawn_loader(paths, config.clone());
    let outcome = handle.wait(|event| {
        if let LoadEvent::Progress { index, total, status, .. } = event {
            if show_progress {
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(format!("[{}/{}]", index, total)).dim(), status));
            }
        }
    });
    if show_progress {
        let _ = term.clear_line();
    }

    let outcome = outcome.ok_or_else(|| miette::miette!("Report loader stopped unexpectedly"))?;

    if !global.quiet {
        for failure in &outcome.failures {
            eprintln!(
                "{} skipped {}: {}",
                style("!").yellow(),
                style(&failure.file_name).cyan(),
                failure.error
            );
        }
    }

    if outcome.is_empty() {
        return Err(miette::miette!("No data extracted from {} file(s)", total));
    }
    Ok(outcome)
}

/// Write `content` to `output_path`, or to stdout without one
pub fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            eprintln!("{} Report written to {}", style("✓").green(), style(path.display()).cyan());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Serialize `value` as pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", json);
    Ok(())
}
