//! `cmma stats` command - per-item statistics

use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::cli::commands::utils::{load_reports, print_json};
use crate::cli::helpers::{format_float, format_opt, parse_yield};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, InputArgs, OutputFormat};
use crate::core::AnalyzerConfig;
use crate::entities::MeasurementItem;
use crate::stats::{analyze, Analysis, AnalysisOptions, CapabilityTier, RowKind, StatisticRow};

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Target yield for tolerance suggestions (0-1, default from config)
    #[arg(long = "yield", value_parser = parse_yield)]
    pub target_yield: Option<f64>,

    /// List X/Y coordinates as separate axes instead of radial rows
    #[arg(long)]
    pub no_merge: bool,

    /// Radial tolerance for merged coordinates, overriding the X/Y derived one
    #[arg(long)]
    pub radial_tol: Option<f64>,

    /// Fail when labels classify one identifier inconsistently
    #[arg(long)]
    pub strict: bool,

    /// Write the statistics to a CSV file (UTF-8 with BOM)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("no", "No", 8),
    ColumnDef::new("label", "Label", 30),
    ColumnDef::new("kind", "Type", 6),
    ColumnDef::new("count", "N", 6),
    ColumnDef::new("fail_count", "NG", 6),
    ColumnDef::new("fail_rate", "Fail%", 8),
    ColumnDef::new("cpk", "Cpk", 10),
    ColumnDef::new("mean", "Mean", 12),
    ColumnDef::new("max", "Max", 12),
    ColumnDef::new("min", "Min", 12),
    ColumnDef::new("design", "Design", 12),
    ColumnDef::new("upper", "+Tol", 10),
    ColumnDef::new("lower", "-Tol", 10),
    ColumnDef::new("suggested", "Suggested", 10),
    ColumnDef::new("tier", "Tier", 18),
    ColumnDef::new("comparison", "Spec", 14),
];

pub fn run(args: StatsArgs, config: &AnalyzerConfig, global: &GlobalOpts) -> Result<()> {
    let options = analysis_options(config, args.target_yield, args.no_merge, args.radial_tol);
    let outcome = load_reports(&args.input, config, global)?;
    let loaded_files = outcome.loaded_files.clone();
    let items = outcome.into_items();

    let analysis = run_analysis(&items, &loaded_files, &options, args.strict)?;

    if global.format == OutputFormat::Json && args.output.is_none() {
        return print_json(&analysis);
    }

    let rows: Vec<TableRow> = analysis.rows.iter().map(statistic_row).collect();
    let formatter = TableFormatter::new(COLUMNS, "item");

    if let Some(path) = &args.output {
        formatter.write_csv_file(&rows, path).into_diagnostic()?;
        if !global.quiet {
            eprintln!(
                "{} Wrote {} statistic row(s) to {}",
                style("✓").green(),
                style(rows.len()).cyan(),
                style(path.display()).cyan()
            );
        }
        return Ok(());
    }

    let table_config = if global.quiet { TableConfig::for_pipe() } else { TableConfig::default() };
    formatter.with_config(table_config).output(&rows, global.format);

    if !global.quiet && global.format == OutputFormat::Auto {
        print_summary(&analysis, &options);
    }
    Ok(())
}

/// Merge command-line overrides into the configured analysis options
pub(crate) fn analysis_options(
    config: &AnalyzerConfig,
    target_yield: Option<f64>,
    no_merge: bool,
    radial_tol: Option<f64>,
) -> AnalysisOptions {
    let mut options = AnalysisOptions::from_config(config);
    if let Some(p) = target_yield {
        options.target_yield = p;
    }
    if no_merge {
        options.merge_pairs = false;
    }
    options.radial_tolerance_override = radial_tol.filter(|t| t.is_finite() && *t > 0.0);
    options
}

/// Analyze and surface classification conflicts; `strict` turns them into an error
pub(crate) fn run_analysis(
    items: &[MeasurementItem],
    loaded_files: &BTreeSet<String>,
    options: &AnalysisOptions,
    strict: bool,
) -> Result<Analysis> {
    let analysis = analyze(items, loaded_files, options);

    if !analysis.conflicts.is_empty() {
        if strict {
            let details: Vec<String> = analysis.conflicts.iter().map(|c| format!("  {}", c)).collect();
            return Err(miette::miette!(
                "{} inconsistent label classification(s):\n{}",
                analysis.conflicts.len(),
                details.join("\n")
            ));
        }
        for conflict in &analysis.conflicts {
            eprintln!("{} {} (excluded)", style("!").yellow(), conflict);
        }
    }
    Ok(analysis)
}

fn statistic_row(row: &StatisticRow) -> TableRow {
    TableRow::new()
        .cell("no", CellValue::Text(row.no.clone()))
        .cell("label", CellValue::Text(row.label.clone()))
        .cell("kind", CellValue::Text(row.kind.to_string()))
        .cell("count", CellValue::Number(row.count))
        .cell("fail_count", CellValue::Number(row.fail_count))
        .cell("fail_rate", CellValue::FailRate(row.fail_rate))
        .cell(
            "cpk",
            CellValue::Cpk {
                value: row.cpk.usable(),
                small_sample: row.cpk.tier == CapabilityTier::SmallSample,
            },
        )
        .cell("mean", CellValue::Float(row.mean, 4))
        .cell("max", CellValue::Float(row.max, 4))
        .cell("min", CellValue::Float(row.min, 4))
        .cell(
            "design",
            if row.kind == RowKind::Radial {
                CellValue::Empty
            } else {
                CellValue::Float(row.design, 4)
            },
        )
        .cell("upper", CellValue::OptFloat(row.upper, 4))
        .cell("lower", CellValue::OptFloat(row.lower, 4))
        .cell("suggested", CellValue::OptFloat(row.suggested(), 4))
        .cell("tier", CellValue::Tier(row.suggestion_tier()))
        .cell("comparison", CellValue::Comparison(row.spec_comparison()))
}

fn print_summary(analysis: &Analysis, options: &AnalysisOptions) {
    let summary = &analysis.summary;
    println!();
    println!("{}", style("Summary").bold().underlined());
    println!("  {:<16} {}", "Files", style(summary.total_files).cyan());
    println!("  {:<16} {}", "Items", style(summary.total_items).cyan());
    println!("  {:<16} {}", "Items with NG", style(summary.ng_items).red());
    println!("  {:<16} {}%", "Mean yield", format_opt(summary.mean_yield, 1));
    println!("  {:<16} {:.2}%", "Target yield", options.target_yield * 100.0);

    if !analysis.arrays.is_empty() {
        println!();
        println!("{}", style("Arrays").bold().underlined());
        for array in &analysis.arrays {
            let profile = array
                .profile
                .as_ref()
                .map(|p| format!("P-V {}  mean {}", format_float(p.peak_valley, 4), format_float(p.mean, 4)))
                .unwrap_or_else(|| "-".to_string());
            let worst = array
                .worst
                .as_ref()
                .map(|w| format!("worst {} ({})", format_float(w.peak_valley, 4), w.source))
                .unwrap_or_default();
            println!(
                "  {} {}: {} point(s), {} file(s), {}  {}",
                style(&array.no).dim(),
                style(&array.group_id).cyan(),
                array.points,
                array.files,
                profile,
                worst
            );
        }
    }
}
