//! `cmma config` command - inspect the effective configuration

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::cli::commands::utils::print_json;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::AnalyzerConfig;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (defaults, files, environment)
    Show(ShowArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value (nested keys with dots, e.g. labels.no)
    pub key: Option<String>,
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, config: &AnalyzerConfig, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, config, global),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, config: &AnalyzerConfig, global: &GlobalOpts) -> Result<()> {
    let value = serde_yml::to_value(config).into_diagnostic()?;

    let selected = match &args.key {
        Some(key) => lookup(&value, key).ok_or_else(|| miette::miette!("Unknown configuration key '{}'", key))?,
        None => value,
    };

    if global.format == OutputFormat::Json {
        return print_json(&selected);
    }

    match selected {
        serde_yml::Value::String(s) => println!("{}", s),
        serde_yml::Value::Number(n) => println!("{}", n),
        serde_yml::Value::Bool(b) => println!("{}", b),
        other => print!("{}", serde_yml::to_string(&other).into_diagnostic()?),
    }
    Ok(())
}

/// Follow a dotted key through nested mappings
fn lookup(root: &serde_yml::Value, key: &str) -> Option<serde_yml::Value> {
    key.split('.')
        .try_fold(root, |current, part| current.get(part))
        .cloned()
}

fn run_path() -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match AnalyzerConfig::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!("  {} {}", style("Global:").cyan(), style("(unavailable)").dim()),
    }
    match AnalyzerConfig::project_config_path() {
        Some(path) => print_path("Project:", &path),
        None => println!("  {} {}", style("Project:").cyan(), style("(no .cmma/config.yaml found)").dim()),
    }

    println!();
    println!("{}", style("Environment: CMMA_TARGET_YIELD, CMMA_LOG_FILE").dim());
    Ok(())
}

fn print_path(label: &str, path: &Path) {
    let state = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {} {} {}", style(label).cyan(), path.display(), state);
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in AnalyzerConfig::keys() {
        println!("  {:<22} {}", style(key).cyan(), style(description).dim());
    }
    Ok(())
}
