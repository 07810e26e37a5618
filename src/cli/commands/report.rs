//! `cmma report` command - Markdown quality report

use chrono::Local;
use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::stats::{analysis_options, run_analysis};
use crate::cli::commands::utils::{load_reports, write_output};
use crate::cli::helpers::{format_float, format_opt, parse_yield, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::AnalyzerConfig;
use crate::stats::{Analysis, AnalysisOptions, CapabilityTier, StatisticRow};

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: crate::cli::InputArgs,

    /// Target yield for tolerance suggestions (0-1, default from config)
    #[arg(long = "yield", value_parser = parse_yield)]
    pub target_yield: Option<f64>,

    /// List X/Y coordinates as separate axes instead of radial rows
    #[arg(long)]
    pub no_merge: bool,

    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ReportArgs, config: &AnalyzerConfig, global: &GlobalOpts) -> Result<()> {
    let options = analysis_options(config, args.target_yield, args.no_merge, None);
    let outcome = load_reports(&args.input, config, global)?;
    let loaded_files = outcome.loaded_files.clone();
    let items = outcome.into_items();
    let analysis = run_analysis(&items, &loaded_files, &options, false)?;

    let report = render_report(&analysis, &options, &Local::now().format("%Y-%m-%d %H:%M").to_string());
    write_output(&report, args.output)
}

fn cpk_text(row: &StatisticRow) -> String {
    match row.cpk.usable() {
        Some(c) if row.cpk.tier == CapabilityTier::SmallSample => format!("{:.2} ⚠", c),
        Some(c) => format!("{:.2}", c),
        None => "-".to_string(),
    }
}

/// Render the Markdown report
pub fn render_report(analysis: &Analysis, options: &AnalysisOptions, generated: &str) -> String {
    let summary = &analysis.summary;
    let mut output = String::new();
    output.push_str("# CMM Inspection Report\n\n");
    output.push_str(&format!("Generated: {}\n\n", generated));

    output.push_str("## Summary\n\n");
    output.push_str(&format!("- Files: {}\n", summary.total_files));
    output.push_str(&format!("- Items: {}\n", summary.total_items));
    output.push_str(&format!("- Items with NG: {}\n", summary.ng_items));
    output.push_str(&format!("- Mean yield: {}%\n", format_opt(summary.mean_yield, 1)));
    output.push_str(&format!("- Target yield: {:.2}%\n\n", options.target_yield * 100.0));

    output.push_str("## Statistics\n\n");
    let mut builder = Builder::default();
    builder.push_record(["No", "Label", "Type", "N", "NG", "Fail%", "Cpk", "Mean", "Suggested", "Spec"]);
    for row in &analysis.rows {
        builder.push_record([
            row.no.clone(),
            truncate_str(&row.label, 30),
            row.kind.to_string(),
            row.count.to_string(),
            row.fail_count.to_string(),
            format!("{:.1}", row.fail_rate),
            cpk_text(row),
            format_float(row.mean, 4),
            format_opt(row.suggested(), 4),
            row.spec_comparison().to_string(),
        ]);
    }
    output.push_str(&builder.build().with(Style::markdown()).to_string());
    output.push_str("\n\n");

    let failing: Vec<&StatisticRow> = analysis.rows.iter().filter(|r| r.fail_count > 0).collect();
    output.push_str("## Failing Items\n\n");
    if failing.is_empty() {
        output.push_str("No failures.\n\n");
    } else {
        let mut builder = Builder::default();
        builder.push_record(["No", "Label", "NG", "Fail%", "Max", "Min", "+Tol", "-Tol"]);
        for row in failing {
            builder.push_record([
                row.no.clone(),
                truncate_str(&row.label, 30),
                row.fail_count.to_string(),
                format!("{:.1}", row.fail_rate),
                format_float(row.max, 4),
                format_float(row.min, 4),
                format_opt(row.upper, 4),
                format_opt(row.lower, 4),
            ]);
        }
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push_str("\n\n");
    }

    if !analysis.arrays.is_empty() {
        output.push_str("## Arrays\n\n");
        let mut builder = Builder::default();
        builder.push_record(["No", "Group", "Points", "Files", "Profile P-V", "Worst P-V", "Worst File"]);
        for array in &analysis.arrays {
            builder.push_record([
                array.no.clone(),
                array.group_id.clone(),
                array.points.to_string(),
                array.files.to_string(),
                format_opt(array.profile.as_ref().map(|p| p.peak_valley), 4),
                format_opt(array.worst.as_ref().map(|w| w.peak_valley), 4),
                array.worst.as_ref().map_or_else(|| "-".to_string(), |w| w.source.clone()),
            ]);
        }
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push_str("\n\n");
    }

    if !analysis.conflicts.is_empty() {
        output.push_str("## Classification Conflicts\n\n");
        for conflict in &analysis.conflicts {
            output.push_str(&format!("- {}\n", conflict));
        }
        output.push('\n');
    }

    output
}
