//! Statistics over a judged record set
//!
//! [`analyze`] is pure and stateless: every call recomputes all rows from the
//! records it is given.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::array::{array_statistics, ArrayStatistics};
use super::capability::{cpk, CapabilityEstimate, DEFAULT_MIN_SAMPLES};
use super::descriptive::{describe, mean};
use super::radial::{judge_radial, radial_capability, radial_deviation, radial_tolerance, rayleigh_tolerance, RayleighSuggestion};
use super::tolerance::{compare_with_spec, tolerance_for_yield, SpecComparison, ToleranceSuggestion};
use crate::core::{natural_cmp, AnalyzerConfig};
use crate::entities::{build_groups, ClassificationConflict, GroupMembers, Judgement, MeasurementGroup, MeasurementItem};

/// Inputs of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub target_yield: f64,
    /// Merge X/Y members into one radial row
    pub merge_pairs: bool,
    /// Replaces the radial tolerance derived from the axis tolerances
    pub radial_tolerance_override: Option<f64>,
    pub min_samples: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            target_yield: 0.90,
            merge_pairs: true,
            radial_tolerance_override: None,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl AnalysisOptions {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            target_yield: config.target_yield,
            merge_pairs: config.merge_pairs,
            radial_tolerance_override: None,
            min_samples: config.min_reliable_samples,
        }
    }
}

/// What a statistic row aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Scalar,
    /// One axis of a coordinate pair, listed on its own
    Axis,
    ArrayPoint,
    /// Merged coordinate pair
    Radial,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKind::Scalar => write!(f, "1D"),
            RowKind::Axis => write!(f, "axis"),
            RowKind::ArrayPoint => write!(f, "array"),
            RowKind::Radial => write!(f, "2D"),
        }
    }
}

/// Radial figures of a merged coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadialStats {
    /// Radial tolerance the pairs were judged against
    pub tolerance: Option<f64>,
    pub std: f64,
    pub suggestion: RayleighSuggestion,
}

/// Statistics of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticRow {
    pub kind: RowKind,
    pub no: String,
    pub label: String,
    pub count: usize,
    pub fail_count: usize,
    /// Failures per loaded file, in percent
    pub fail_rate: f64,
    pub cpk: CapabilityEstimate,
    /// Yield-driven suggestion; absent for radial rows
    pub tolerance: Option<ToleranceSuggestion>,
    pub radial: Option<RadialStats>,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Design and tolerances of the group's first member
    pub design: f64,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

impl StatisticRow {
    /// Suggested tolerance at the target yield
    pub fn suggested(&self) -> Option<f64> {
        let value = match (&self.tolerance, &self.radial) {
            (Some(t), _) if t.is_usable() => t.symmetric,
            (_, Some(r)) => r.suggestion.tolerance,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Tier label of the suggestion
    pub fn suggestion_tier(&self) -> String {
        match (&self.tolerance, &self.radial) {
            (Some(t), _) => t.tier.to_string(),
            (_, Some(r)) => r.suggestion.tier.to_string(),
            _ => "invalid".to_string(),
        }
    }

    /// Suggested versus specified tolerance
    pub fn spec_comparison(&self) -> SpecComparison {
        let Some(suggested) = self.suggested() else {
            return SpecComparison::Unknown;
        };
        match &self.radial {
            Some(r) => compare_with_spec(suggested, r.tolerance.unwrap_or(0.0), 0.0),
            None => compare_with_spec(suggested, self.upper.unwrap_or(0.0), self.lower.unwrap_or(0.0)),
        }
    }
}

/// Peak-to-valley of one file's points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilePeakValley {
    pub source: String,
    pub peak_valley: f64,
}

/// Summary of an array group across files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArraySummary {
    pub no: String,
    pub group_id: String,
    /// Distinct point indices
    pub points: usize,
    pub files: usize,
    /// Statistics of the per-index mean profile
    pub profile: Option<ArrayStatistics>,
    /// File with the largest peak-to-valley
    pub worst: Option<FilePeakValley>,
}

/// Run-level figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_files: usize,
    pub total_items: usize,
    /// Rows with at least one failure
    pub ng_items: usize,
    /// 100 minus the mean failure rate; `None` without rows
    pub mean_yield: Option<f64>,
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub rows: Vec<StatisticRow>,
    pub arrays: Vec<ArraySummary>,
    pub conflicts: Vec<ClassificationConflict>,
    pub summary: RunSummary,
}

/// Group, judge and summarize a record set.
///
/// `loaded_files` are the files that contributed records; their count is the
/// failure-rate denominator for every row.
pub fn analyze(items: &[MeasurementItem], loaded_files: &BTreeSet<String>, options: &AnalysisOptions) -> Analysis {
    let total_files = loaded_files.len();
    let set = build_groups(items);

    let mut rows = Vec::new();
    let mut arrays = Vec::new();

    for group in &set.groups {
        match &group.members {
            GroupMembers::Scalar(members) => {
                rows.push(scalar_row(RowKind::Scalar, &group.no, &group.group_id, members, total_files, options));
            }
            GroupMembers::Pair { .. } => {
                let merged = options
                    .merge_pairs
                    .then(|| radial_row(group, total_files, options))
                    .flatten();
                match merged {
                    Some(row) => rows.push(row),
                    None => rows.extend(member_rows(RowKind::Axis, &group.items(), total_files, options)),
                }
            }
            GroupMembers::Array { .. } => {
                rows.extend(member_rows(RowKind::ArrayPoint, &group.items(), total_files, options));
                arrays.push(array_summary(group));
            }
        }
    }

    rows.sort_by(|a, b| natural_cmp(&a.no, &b.no).then_with(|| natural_cmp(&a.label, &b.label)));
    arrays.sort_by(|a, b| natural_cmp(&a.no, &b.no));

    let fail_rates: Vec<f64> = rows.iter().map(|r| r.fail_rate).collect();
    let summary = RunSummary {
        total_files,
        total_items: rows.len(),
        ng_items: rows.iter().filter(|r| r.fail_count > 0).count(),
        mean_yield: mean(&fail_rates).map(|m| 100.0 - m),
    };

    tracing::debug!(
        rows = rows.len(),
        arrays = arrays.len(),
        conflicts = set.conflicts.len(),
        "analysis complete"
    );

    Analysis {
        rows,
        arrays,
        conflicts: set.conflicts,
        summary,
    }
}

fn fail_rate(fail_count: usize, total_files: usize) -> f64 {
    if total_files == 0 {
        0.0
    } else {
        fail_count as f64 / total_files as f64 * 100.0
    }
}

/// Rows per (item number, label) for members listed individually
fn member_rows(kind: RowKind, items: &[&MeasurementItem], total_files: usize, options: &AnalysisOptions) -> Vec<StatisticRow> {
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut members: HashMap<(&str, &str), Vec<&MeasurementItem>> = HashMap::new();
    for &item in items {
        let key = (item.no(), item.project());
        members
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(item);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let list = members.get(&key)?;
            Some(scalar_row(kind, key.0, key.1, list, total_files, options))
        })
        .collect()
}

fn scalar_row(
    kind: RowKind,
    no: &str,
    label: &str,
    members: &[&MeasurementItem],
    total_files: usize,
    options: &AnalysisOptions,
) -> StatisticRow {
    let values: Vec<f64> = members.iter().map(|i| i.measured()).collect();
    let fail_count = members.iter().filter(|i| i.judgement() == Judgement::Fail).count();

    let first = members.first();
    let design = first.map(|i| i.design()).unwrap_or(0.0);
    let upper = first.and_then(|i| i.upper());
    let lower = first.and_then(|i| i.lower());
    let usl = upper.map_or(f64::NAN, |u| design + u);
    let lsl = lower.map_or(f64::NAN, |l| design + l);

    let stats = describe(&values);
    StatisticRow {
        kind,
        no: no.to_string(),
        label: label.to_string(),
        count: members.len(),
        fail_count,
        fail_rate: fail_rate(fail_count, total_files),
        cpk: cpk(&values, usl, lsl, options.min_samples),
        tolerance: Some(tolerance_for_yield(&values, design, options.target_yield, options.min_samples)),
        radial: None,
        mean: stats.map_or(0.0, |s| s.mean),
        max: stats.map_or(0.0, |s| s.max),
        min: stats.map_or(0.0, |s| s.min),
        design,
        upper,
        lower,
    }
}

/// One radial row for a pair group; `None` when no file has both axes
fn radial_row(group: &MeasurementGroup<'_>, total_files: usize, options: &AnalysisOptions) -> Option<StatisticRow> {
    let GroupMembers::Pair { x, y } = &group.members else {
        return None;
    };
    let pairs = group.matched_pairs();
    if pairs.is_empty() {
        return None;
    }

    let axis_upper = |items: &[&MeasurementItem]| items.first().and_then(|i| i.upper()).unwrap_or(0.0);
    let tolerance = options
        .radial_tolerance_override
        .or_else(|| radial_tolerance(axis_upper(x.as_slice()), axis_upper(y.as_slice())));

    let radials: Vec<f64> = pairs
        .iter()
        .map(|p| radial_deviation(p.x.differential(), p.y.differential()))
        .collect();
    let fail_count = radials
        .iter()
        .filter(|r| judge_radial(**r, tolerance) == Judgement::Fail)
        .count();

    let stats = describe(&radials)?;
    Some(StatisticRow {
        kind: RowKind::Radial,
        no: group.no.clone(),
        label: group.group_id.clone(),
        count: radials.len(),
        fail_count,
        fail_rate: fail_rate(fail_count, total_files),
        cpk: radial_capability(&radials, tolerance, options.min_samples),
        tolerance: None,
        radial: Some(RadialStats {
            tolerance,
            std: stats.std,
            suggestion: rayleigh_tolerance(&radials, options.target_yield, options.min_samples),
        }),
        mean: stats.mean,
        max: stats.max,
        min: stats.min,
        design: 0.0,
        upper: tolerance,
        lower: None,
    })
}

fn array_summary(group: &MeasurementGroup<'_>) -> ArraySummary {
    let GroupMembers::Array { points, .. } = &group.members else {
        return ArraySummary {
            no: group.no.clone(),
            group_id: group.group_id.clone(),
            points: 0,
            files: 0,
            profile: None,
            worst: None,
        };
    };

    let profile: Vec<f64> = points
        .values()
        .filter_map(|items| mean(&items.iter().map(|i| i.measured()).collect::<Vec<_>>()))
        .collect();

    let mut by_file: Vec<(&str, Vec<f64>)> = Vec::new();
    for item in points.values().flatten() {
        match by_file.iter_mut().find(|(source, _)| *source == item.source()) {
            Some((_, values)) => values.push(item.measured()),
            None => by_file.push((item.source(), vec![item.measured()])),
        }
    }

    let worst = by_file
        .iter()
        .filter_map(|(source, values)| {
            array_statistics(values).map(|s| FilePeakValley {
                source: source.to_string(),
                peak_valley: s.peak_valley,
            })
        })
        .max_by(|a, b| a.peak_valley.total_cmp(&b.peak_valley));

    ArraySummary {
        no: group.no.clone(),
        group_id: group.group_id.clone(),
        points: points.len(),
        files: by_file.len(),
        profile: array_statistics(&profile),
        worst,
    }
}

/// Tolerance suggestions for one item across several target yields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceDetail {
    pub no: String,
    pub label: String,
    pub count: usize,
    pub design: f64,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
    pub cpk: CapabilityEstimate,
    pub suggestions: Vec<ToleranceSuggestion>,
}

impl ToleranceDetail {
    /// Comparison of the suggestion at `target_yield` with the current spec
    pub fn comparison_at(&self, target_yield: f64) -> SpecComparison {
        self.suggestions
            .iter()
            .find(|s| (s.target_yield - target_yield).abs() < 1e-9)
            .filter(|s| s.is_usable())
            .map(|s| compare_with_spec(s.symmetric, self.upper.unwrap_or(0.0), self.lower.unwrap_or(0.0)))
            .unwrap_or(SpecComparison::Unknown)
    }
}

/// Detail view of item `no`. Without `label`, the first label recorded
/// under that number is used.
pub fn tolerance_detail(
    items: &[MeasurementItem],
    no: &str,
    label: Option<&str>,
    yields: &[f64],
    options: &AnalysisOptions,
) -> Option<ToleranceDetail> {
    let label = match label {
        Some(l) => l.to_string(),
        None => items.iter().find(|i| i.no() == no)?.project().to_string(),
    };
    let members: Vec<&MeasurementItem> = items
        .iter()
        .filter(|i| i.no() == no && i.project() == label)
        .collect();
    let first = members.first()?;

    let values: Vec<f64> = members.iter().map(|i| i.measured()).collect();
    let design = first.design();
    let (upper, lower) = (first.upper(), first.lower());
    let usl = upper.map_or(f64::NAN, |u| design + u);
    let lsl = lower.map_or(f64::NAN, |l| design + l);

    Some(ToleranceDetail {
        no: no.to_string(),
        label,
        count: values.len(),
        design,
        upper,
        lower,
        cpk: cpk(&values, usl, lsl, options.min_samples),
        suggestions: yields.iter().map(|&p| tolerance_for_yield(&values, design, p, options.min_samples)).collect(),
    })
}
