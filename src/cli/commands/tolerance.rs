//! `cmma tolerance` command - tolerance suggestions for one item
//!
//! Shows the yield-driven suggestion for every standard yield from 80% to
//! 99.73%, together with the process offset and a comparison against the
//! tolerance currently specified.

use console::style;
use miette::Result;

use crate::cli::commands::utils::{load_reports, print_json};
use crate::cli::helpers::{format_float, format_opt, parse_yield};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, InputArgs, OutputFormat};
use crate::core::AnalyzerConfig;
use crate::stats::{tolerance_detail, AnalysisOptions, CapabilityTier, ToleranceDetail, STANDARD_YIELDS};

#[derive(clap::Args, Debug)]
pub struct ToleranceArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Item number to inspect
    #[arg(long)]
    pub no: String,

    /// Item label, when the number carries several labels
    #[arg(long)]
    pub label: Option<String>,

    /// Yield the spec comparison is made at (0-1, default from config)
    #[arg(long = "yield", value_parser = parse_yield)]
    pub target_yield: Option<f64>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("yield", "Yield", 8),
    ColumnDef::new("z", "z", 7),
    ColumnDef::new("symmetric", "±Tol", 10),
    ColumnDef::new("upper", "+Tol", 10),
    ColumnDef::new("lower", "-Tol", 10),
    ColumnDef::new("tier", "Tier", 14),
];

pub fn run(args: ToleranceArgs, config: &AnalyzerConfig, global: &GlobalOpts) -> Result<()> {
    let mut options = AnalysisOptions::from_config(config);
    if let Some(p) = args.target_yield {
        options.target_yield = p;
    }

    let outcome = load_reports(&args.input, config, global)?;
    let items = outcome.into_items();

    let mut yields = STANDARD_YIELDS.to_vec();
    if !yields.iter().any(|y| (y - options.target_yield).abs() < 1e-9) {
        yields.push(options.target_yield);
        yields.sort_by(|a, b| a.total_cmp(b));
    }

    let detail = tolerance_detail(&items, &args.no, args.label.as_deref(), &yields, &options).ok_or_else(|| {
        match &args.label {
            Some(label) => miette::miette!("No records for item {} ({})", args.no, label),
            None => miette::miette!("No records for item {}", args.no),
        }
    })?;

    if global.format == OutputFormat::Json {
        return print_json(&detail);
    }

    if !global.quiet && global.format == OutputFormat::Auto {
        print_header(&detail);
    }

    let rows: Vec<TableRow> = detail
        .suggestions
        .iter()
        .map(|s| {
            TableRow::new()
                .cell("yield", CellValue::Text(format!("{:.2}%", s.target_yield * 100.0)))
                .cell("z", CellValue::Float(s.z, 3))
                .cell("symmetric", CellValue::Float(s.symmetric, 4))
                .cell("upper", CellValue::Float(s.upper, 4))
                .cell("lower", CellValue::Float(s.lower, 4))
                .cell("tier", CellValue::Tier(s.tier.to_string()))
        })
        .collect();

    TableFormatter::new(COLUMNS, "yield")
        .with_config(TableConfig::for_pipe())
        .output(&rows, global.format);

    if !global.quiet && global.format == OutputFormat::Auto {
        let comparison = detail.comparison_at(options.target_yield);
        println!();
        println!(
            "At {:.2}% yield: {}",
            options.target_yield * 100.0,
            style(comparison.to_string()).bold()
        );
    }
    Ok(())
}

fn print_header(detail: &ToleranceDetail) {
    println!(
        "{} {} {}",
        style("Item").bold(),
        style(&detail.no).cyan(),
        style(&detail.label).cyan()
    );
    println!("  {:<14} {}", "Samples", detail.count);
    println!("  {:<14} {}", "Design", format_float(detail.design, 4));
    println!(
        "  {:<14} {} / {}",
        "Current tol",
        format_opt(detail.upper, 4),
        format_opt(detail.lower, 4)
    );
    if let Some(first) = detail.suggestions.iter().find(|s| s.mean.is_finite()) {
        println!("  {:<14} {}", "Mean", format_float(first.mean, 4));
        println!("  {:<14} {}", "Std dev", format_float(first.std, 4));
        println!("  {:<14} {}", "Offset", format_float(first.mean - detail.design, 4));
    }
    let marker = if detail.cpk.tier == CapabilityTier::SmallSample { " ⚠" } else { "" };
    println!(
        "  {:<14} {}{}",
        "Cpk",
        format_opt(detail.cpk.usable(), 2),
        marker
    );
    println!();
}
