//! Table formatting for record and statistic listings
//!
//! Commands build [`TableRow`]s of typed [`CellValue`]s; [`TableFormatter`]
//! renders them as aligned columns, TSV, CSV or Markdown, or writes them to a
//! spreadsheet-friendly CSV file.

use chrono::NaiveDateTime;
use console::{measure_text_width, pad_str, style, Alignment};
use std::io;
use std::path::Path;

use crate::cli::export::write_csv_with_bom;
use crate::cli::helpers::{escape_csv, format_float, truncate_str};
use crate::cli::OutputFormat;
use crate::entities::Judgement;
use crate::stats::SpecComparison;

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Show summary line after table (e.g., "12 record(s)")
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { show_summary: true }
    }
}

impl TableConfig {
    /// Create config optimized for piping (no summary)
    pub fn for_pipe() -> Self {
        Self { show_summary: false }
    }
}

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Plain text, truncated to the column width
    Text(String),
    /// Judgement with color coding (OK=green, FAIL=red bold, ---=dim)
    Judgement(Judgement),
    /// Cpk value with color coding (≥1.33=green, ≥1.0=yellow, <1.0=red);
    /// small samples carry a ⚠ marker
    Cpk { value: Option<f64>, small_sample: bool },
    /// Failure rate in percent (0=green, otherwise red)
    FailRate(f64),
    /// Reliability tier (dim unless reliable)
    Tier(String),
    /// Suggested-versus-current tolerance verdict
    Comparison(SpecComparison),
    /// Capture time
    DateTime(Option<NaiveDateTime>),
    /// Count
    Number(usize),
    /// Float value with precision; "-" when not finite
    Float(f64, usize),
    /// Optional float value with precision
    OptFloat(Option<f64>, usize),
    /// Empty/placeholder
    Empty,
}

impl CellValue {
    fn cpk_text(value: Option<f64>, small_sample: bool, marker: &str) -> String {
        match value {
            Some(c) if small_sample => format!("{:.2}{}", c, marker),
            Some(c) => format!("{:.2}", c),
            None => "-".to_string(),
        }
    }

    /// Format for aligned terminal output (with colors if terminal)
    pub fn format_aligned(&self, width: usize) -> String {
        let raw = self.raw();
        let text = match self {
            CellValue::Text(s) => truncate_str(s, width.saturating_sub(2)),
            _ => raw.clone(),
        };
        let align = match self {
            CellValue::Number(_) | CellValue::Float(..) | CellValue::OptFloat(..) | CellValue::FailRate(_) => {
                Alignment::Right
            }
            _ => Alignment::Left,
        };
        let padded = pad_str(&text, width, align, None).into_owned();

        let styled = match self {
            CellValue::Judgement(Judgement::Ok) => style(padded).green(),
            CellValue::Judgement(Judgement::Fail) => style(padded).red().bold(),
            CellValue::Judgement(Judgement::NotApplicable) => style(padded).dim(),
            CellValue::Cpk { value: Some(c), .. } if *c >= 1.33 => style(padded).green(),
            CellValue::Cpk { value: Some(c), .. } if *c >= 1.0 => style(padded).yellow(),
            CellValue::Cpk { value: Some(_), .. } => style(padded).red(),
            CellValue::Cpk { value: None, .. } => style(padded).dim(),
            CellValue::FailRate(rate) if *rate > 0.0 => style(padded).red(),
            CellValue::FailRate(_) => style(padded).green(),
            CellValue::Tier(tier) if tier == "reliable" || tier == "ok" => style(padded),
            CellValue::Tier(_) => style(padded).dim(),
            CellValue::Comparison(SpecComparison::Tight) => style(padded).red(),
            CellValue::Comparison(SpecComparison::Generous) => style(padded).yellow(),
            CellValue::Comparison(SpecComparison::Adequate) => style(padded).green(),
            CellValue::Empty => style(padded).dim(),
            _ => style(padded),
        };
        styled.to_string()
    }

    /// Cell content for delimited output: no colors, no placeholder dashes
    pub fn plain(&self) -> String {
        match self {
            CellValue::Empty | CellValue::OptFloat(None, _) | CellValue::DateTime(None) => String::new(),
            CellValue::Cpk { value, .. } => value.map(|c| format!("{:.2}", c)).unwrap_or_default(),
            CellValue::Float(f, _) if !f.is_finite() => String::new(),
            _ => self.raw(),
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.plain())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Judgement(Judgement::Fail) => "**FAIL**".to_string(),
            _ => self.raw(),
        };
        raw.replace('|', "\\|")
    }

    /// Get raw string value (no styling, no padding)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Judgement(j) => j.to_string(),
            CellValue::Cpk { value, small_sample } => Self::cpk_text(*value, *small_sample, " ⚠"),
            CellValue::FailRate(rate) => format!("{:.1}%", rate),
            CellValue::Tier(tier) => tier.clone(),
            CellValue::Comparison(c) => c.to_string(),
            CellValue::DateTime(Some(dt)) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::DateTime(None) => "-".to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Float(f, precision) => format_float(*f, *precision),
            CellValue::OptFloat(opt, precision) => opt.map_or_else(|| "-".to_string(), |f| format_float(f, *precision)),
            CellValue::Empty => "-".to_string(),
        }
    }

    /// Display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        measure_text_width(&self.raw())
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    noun: &'static str,
    config: TableConfig,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], noun: &'static str) -> Self {
        Self {
            columns,
            noun,
            config: TableConfig::default(),
        }
    }

    /// Configure the formatter with custom settings
    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Render rows in the specified format. JSON is handled by the caller.
    pub fn render(&self, rows: &[TableRow], format: OutputFormat) -> String {
        match format {
            OutputFormat::Tsv => self.render_tsv(rows),
            OutputFormat::Csv => self.render_csv(rows),
            OutputFormat::Md => self.render_md(rows),
            OutputFormat::Auto | OutputFormat::Json => self.render_aligned(rows),
        }
    }

    /// Print rows to stdout in the specified format
    pub fn output(&self, rows: &[TableRow], format: OutputFormat) {
        print!("{}", self.render(rows, format));
    }

    /// Write rows to a CSV file prefixed with a UTF-8 byte-order mark
    pub fn write_csv_file(&self, rows: &[TableRow], path: &Path) -> io::Result<()> {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header).collect();
        let records = rows.iter().map(|row| {
            self.columns
                .iter()
                .map(|col| row.get(col.key).map(|v| v.plain()).unwrap_or_default())
                .collect::<Vec<_>>()
        });
        write_csv_with_bom(path, &headers, records)
    }

    /// Calculate dynamic column widths based on actual content
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(|v| v.display_width())
                    .max()
                    .unwrap_or(0);
                let natural = measure_text_width(col.header).max(max_content.saturating_add(2));
                natural.min(col.width).max(measure_text_width(col.header))
            })
            .collect()
    }

    fn render_aligned(&self, rows: &[TableRow]) -> String {
        let widths = self.calculate_widths(rows);
        let mut out = String::new();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| style(pad_str(col.header, *w, Alignment::Left, None).into_owned()).bold().to_string())
            .collect();
        out.push_str(header.join(" ").trim_end());
        out.push('\n');

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(total_width));
        out.push('\n');

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match row.get(col.key) {
                    Some(value) => value.format_aligned(*w),
                    None => CellValue::Empty.format_aligned(*w),
                })
                .collect();
            out.push_str(parts.join(" ").trim_end());
            out.push('\n');
        }

        if self.config.show_summary {
            out.push('\n');
            out.push_str(&format!("{} {}(s)\n", style(rows.len()).cyan(), self.noun));
        }
        out
    }

    fn render_tsv(&self, rows: &[TableRow]) -> String {
        let mut out = String::new();
        let headers: Vec<&str> = self.columns.iter().map(|c| c.key).collect();
        out.push_str(&headers.join("\t"));
        out.push('\n');
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| {
                    row.get(col.key)
                        .map(|v| v.raw().replace(['\t', '\n'], " "))
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            out.push_str(&values.join("\t"));
            out.push('\n');
        }
        out
    }

    fn render_csv(&self, rows: &[TableRow]) -> String {
        let mut out = String::new();
        let headers: Vec<&str> = self.columns.iter().map(|c| c.key).collect();
        out.push_str(&headers.join(","));
        out.push('\n');
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| row.get(col.key).map(|v| v.format_csv()).unwrap_or_default())
                .collect();
            out.push_str(&values.join(","));
            out.push('\n');
        }
        out
    }

    fn render_md(&self, rows: &[TableRow]) -> String {
        let mut out = String::new();
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header).collect();
        out.push_str(&format!("| {} |\n", headers.join(" | ")));
        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        out.push_str(&format!("|{}|\n", separators.join("|")));
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| row.get(col.key).map(|v| v.format_md()).unwrap_or_else(|| "-".to_string()))
                .collect();
            out.push_str(&format!("| {} |\n", values.join(" | ")));
        }
        out
    }
}
