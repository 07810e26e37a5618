//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, records::RecordsArgs, report::ReportArgs,
    stats::StatsArgs, tolerance::ToleranceArgs,
};
use crate::ingest::DuplicateStrategy;

#[derive(Parser)]
#[command(name = "cmma")]
#[command(author, version, about = "CMM inspection report analyzer")]
#[command(long_about = "Reads dimensional-inspection reports exported by coordinate-measuring \
instruments (CSV and PDF), re-judges every measurement against its tolerance and reports \
capability, suggested tolerances and 2D positional statistics.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress progress and summaries
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Report inputs shared by every analysis command
#[derive(clap::Args, Clone, Debug)]
pub struct InputArgs {
    /// Report files or directories containing *.csv / *.pdf reports
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Which report to keep when a CSV and a PDF share a name
    #[arg(long, value_enum, default_value_t = DuplicateStrategy::PreferCsv)]
    pub prefer: DuplicateStrategy,

    /// Descend into subdirectories
    #[arg(long, short = 'r')]
    pub recursive: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every judged measurement record
    Records(RecordsArgs),

    /// Per-item statistics: failure rate, Cpk, suggested tolerance
    Stats(StatsArgs),

    /// Tolerance suggestions for one item across standard yields
    Tolerance(ToleranceArgs),

    /// Markdown quality report
    Report(ReportArgs),

    /// Show configuration values and file locations
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns on a terminal
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}
