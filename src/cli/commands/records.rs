//! `cmma records` command - list judged measurement records

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::utils::{load_reports, print_json};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, InputArgs, OutputFormat};
use crate::core::AnalyzerConfig;
use crate::entities::MeasurementItem;

#[derive(clap::Args, Debug)]
pub struct RecordsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Show only records judged FAIL
    #[arg(long)]
    pub only_fail: bool,

    /// Write the records to a CSV file (UTF-8 with BOM)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("source", "Source", 24),
    ColumnDef::new("captured_at", "Captured", 19),
    ColumnDef::new("no", "No", 8),
    ColumnDef::new("label", "Label", 30),
    ColumnDef::new("measured", "Measured", 12),
    ColumnDef::new("design", "Design", 12),
    ColumnDef::new("upper", "+Tol", 10),
    ColumnDef::new("lower", "-Tol", 10),
    ColumnDef::new("diff", "Diff", 10),
    ColumnDef::new("unit", "Unit", 6),
    ColumnDef::new("original", "Orig", 8),
    ColumnDef::new("judgement", "Judge", 6),
];

pub fn run(args: RecordsArgs, config: &AnalyzerConfig, global: &GlobalOpts) -> Result<()> {
    let outcome = load_reports(&args.input, config, global)?;
    let items: Vec<&MeasurementItem> = outcome
        .items()
        .filter(|item| !args.only_fail || item.is_fail())
        .collect();

    if global.format == OutputFormat::Json && args.output.is_none() {
        return print_json(&items);
    }

    let rows: Vec<TableRow> = items.iter().map(|item| record_row(item)).collect();
    let formatter = TableFormatter::new(COLUMNS, "record");

    if let Some(path) = &args.output {
        formatter.write_csv_file(&rows, path).into_diagnostic()?;
        if !global.quiet {
            eprintln!(
                "{} Wrote {} record(s) to {}",
                style("✓").green(),
                style(rows.len()).cyan(),
                style(path.display()).cyan()
            );
        }
        return Ok(());
    }

    let table_config = if global.quiet { TableConfig::for_pipe() } else { TableConfig::default() };
    formatter.with_config(table_config).output(&rows, global.format);
    Ok(())
}

fn record_row(item: &MeasurementItem) -> TableRow {
    TableRow::new()
        .cell("source", CellValue::Text(item.source().to_string()))
        .cell("captured_at", CellValue::DateTime(item.captured_at()))
        .cell("no", CellValue::Text(item.no().to_string()))
        .cell("label", CellValue::Text(item.project().to_string()))
        .cell("measured", CellValue::Float(item.measured(), 4))
        .cell("design", CellValue::Float(item.design(), 4))
        .cell("upper", CellValue::OptFloat(item.upper(), 4))
        .cell("lower", CellValue::OptFloat(item.lower(), 4))
        .cell("diff", CellValue::Float(item.differential(), 4))
        .cell(
            "unit",
            item.unit().map_or(CellValue::Empty, |u| CellValue::Text(u.to_string())),
        )
        .cell(
            "original",
            item.original().map_or(CellValue::Empty, |o| CellValue::Text(o.to_string())),
        )
        .cell("judgement", CellValue::Judgement(item.judgement()))
}
