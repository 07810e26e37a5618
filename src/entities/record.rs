//! Measurement records and the pass/fail judgement pipeline
//!
//! Both report sources produce [`RawRecord`]s. Normalization turns each one into
//! an immutable [`MeasurementItem`] with its judgement decided once, using a
//! strict rule precedence.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Designs closer to zero than this are reference items, not specifications
pub const NEAR_ZERO_DESIGN: f64 = 1e-6;

/// Pass/fail verdict of a single measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgement {
    /// Within tolerance
    Ok,
    /// Out of tolerance
    Fail,
    /// Not judged (reference item, missing or pre-judged tolerance)
    NotApplicable,
}

impl std::fmt::Display for Judgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Judgement::Ok => write!(f, "OK"),
            Judgement::Fail => write!(f, "FAIL"),
            Judgement::NotApplicable => write!(f, "---"),
        }
    }
}

/// Judgement token printed by the instrument itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginalJudgement {
    Ok,
    Ng,
    Warning,
    NotApplicable,
}

impl OriginalJudgement {
    /// Parse an instrument token; empty or unknown tokens are `None`
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "OK" | "ok" | "Ok" => Some(OriginalJudgement::Ok),
            "NG" | "ng" | "Ng" | "FAIL" => Some(OriginalJudgement::Ng),
            "Warning" | "WARNING" | "warning" => Some(OriginalJudgement::Warning),
            "---" | "-" => Some(OriginalJudgement::NotApplicable),
            _ => None,
        }
    }

    /// Map onto the three-valued judgement; a warning is still within limits
    pub fn to_judgement(self) -> Judgement {
        match self {
            OriginalJudgement::Ok | OriginalJudgement::Warning => Judgement::Ok,
            OriginalJudgement::Ng => Judgement::Fail,
            OriginalJudgement::NotApplicable => Judgement::NotApplicable,
        }
    }
}

impl std::fmt::Display for OriginalJudgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginalJudgement::Ok => write!(f, "OK"),
            OriginalJudgement::Ng => write!(f, "NG"),
            OriginalJudgement::Warning => write!(f, "Warning"),
            OriginalJudgement::NotApplicable => write!(f, "---"),
        }
    }
}

/// One record as mapped from a source, before validation.
///
/// Every field is resolved once by the source reader; absent columns have
/// already been replaced by their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub no: String,
    pub project: String,
    pub measured: Option<f64>,
    pub design: Option<f64>,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
    pub unit: Option<String>,
    pub original: Option<OriginalJudgement>,
}

/// Parse a numeric cell the lenient way: blank or malformed cells are missing
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim().trim_start_matches('+');
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Errors for records that cannot be normalized
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("record has no item number")]
    MissingNumber,

    #[error("item {no}: missing or non-numeric {field}")]
    MissingField { no: String, field: &'static str },
}

/// One judged measurement of one specification item in one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementItem {
    no: String,
    project: String,
    measured: f64,
    design: f64,
    upper: Option<f64>,
    lower: Option<f64>,
    unit: Option<String>,
    original: Option<OriginalJudgement>,
    source: String,
    captured_at: Option<NaiveDateTime>,
    judgement: Judgement,
}

impl MeasurementItem {
    /// Validate a raw record and judge it
    pub fn from_raw(
        raw: RawRecord,
        source: impl Into<String>,
        captured_at: Option<NaiveDateTime>,
    ) -> Result<Self, RecordError> {
        let no = raw.no.trim().to_string();
        if no.is_empty() {
            return Err(RecordError::MissingNumber);
        }
        let measured = raw.measured.ok_or_else(|| RecordError::MissingField {
            no: no.clone(),
            field: "measured value",
        })?;
        let design = raw.design.ok_or_else(|| RecordError::MissingField {
            no: no.clone(),
            field: "design value",
        })?;

        let judgement = judge(measured, design, raw.upper, raw.lower, raw.original);

        Ok(Self {
            no,
            project: raw.project.trim().to_string(),
            measured,
            design,
            upper: raw.upper,
            lower: raw.lower,
            unit: raw.unit,
            original: raw.original,
            source: source.into(),
            captured_at,
            judgement,
        })
    }

    pub fn no(&self) -> &str {
        &self.no
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn measured(&self) -> f64 {
        self.measured
    }

    pub fn design(&self) -> f64 {
        self.design
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    pub fn lower(&self) -> Option<f64> {
        self.lower
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn original(&self) -> Option<OriginalJudgement> {
        self.original
    }

    /// File name of the report this record came from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        self.captured_at
    }

    pub fn judgement(&self) -> Judgement {
        self.judgement
    }

    /// Measured minus design, always derived from the inputs
    pub fn differential(&self) -> f64 {
        self.measured - self.design
    }

    pub fn is_fail(&self) -> bool {
        self.judgement == Judgement::Fail
    }
}

/// Decide a judgement. Rules apply in order; the first that matches wins.
///
/// 1. near-zero design: reference item, not applicable
/// 2. a missing tolerance bound: not applicable
/// 3. both bounds exactly zero: the instrument's own verdict, else not applicable
/// 4. differential outside `[lower, upper]`: fail
/// 5. otherwise ok
pub fn judge(
    measured: f64,
    design: f64,
    upper: Option<f64>,
    lower: Option<f64>,
    original: Option<OriginalJudgement>,
) -> Judgement {
    if design.abs() < NEAR_ZERO_DESIGN {
        return Judgement::NotApplicable;
    }
    let (Some(upper), Some(lower)) = (upper, lower) else {
        return Judgement::NotApplicable;
    };
    if upper == 0.0 && lower == 0.0 {
        return original
            .map(OriginalJudgement::to_judgement)
            .unwrap_or(Judgement::NotApplicable);
    }
    let diff = measured - design;
    if diff > upper || diff < lower {
        Judgement::Fail
    } else {
        Judgement::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(no: &str, measured: f64, design: f64, upper: Option<f64>, lower: Option<f64>) -> RawRecord {
        RawRecord {
            no: no.to_string(),
            project: "Length".to_string(),
            measured: Some(measured),
            design: Some(design),
            upper,
            lower,
            ..Default::default()
        }
    }

    #[test]
    fn test_scenario_ok_then_fail() {
        let a = MeasurementItem::from_raw(raw("1", 10.05, 10.0, Some(0.1), Some(-0.1)), "a.csv", None).unwrap();
        let b = MeasurementItem::from_raw(raw("1", 10.2, 10.0, Some(0.1), Some(-0.1)), "b.csv", None).unwrap();
        assert_eq!(a.judgement(), Judgement::Ok);
        assert_eq!(b.judgement(), Judgement::Fail);
    }

    #[test]
    fn test_differential_is_recomputed() {
        let item = MeasurementItem::from_raw(raw("3", 4.75, 5.0, Some(0.1), Some(-0.1)), "a.csv", None).unwrap();
        assert_eq!(item.differential(), 4.75 - 5.0);
        assert_eq!(item.differential(), item.measured() - item.design());
    }

    #[test]
    fn test_near_zero_design_dominates() {
        // Missing tolerance would also be N/A, but rule 1 decides first
        assert_eq!(judge(0.3, 0.0, None, None, None), Judgement::NotApplicable);
        assert_eq!(judge(9.0, 5e-7, Some(0.1), Some(-0.1), None), Judgement::NotApplicable);
        assert_eq!(
            judge(9.0, -5e-7, Some(0.0), Some(0.0), Some(OriginalJudgement::Ng)),
            Judgement::NotApplicable
        );
    }

    #[test]
    fn test_missing_tolerance_is_not_applicable() {
        assert_eq!(judge(10.5, 10.0, None, Some(-0.1), None), Judgement::NotApplicable);
        assert_eq!(judge(10.5, 10.0, Some(0.1), None, None), Judgement::NotApplicable);
    }

    #[test]
    fn test_zero_band_uses_original_judgement() {
        assert_eq!(judge(0.02, 1.0, Some(0.0), Some(0.0), None), Judgement::NotApplicable);
        assert_eq!(
            judge(0.02, 1.0, Some(0.0), Some(0.0), Some(OriginalJudgement::Ng)),
            Judgement::Fail
        );
        assert_eq!(
            judge(0.02, 1.0, Some(0.0), Some(0.0), Some(OriginalJudgement::Ok)),
            Judgement::Ok
        );
        assert_eq!(
            judge(0.02, 1.0, Some(0.0), Some(0.0), Some(OriginalJudgement::Warning)),
            Judgement::Ok
        );
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        assert_eq!(judge(10.5, 10.0, Some(0.5), Some(-0.5), None), Judgement::Ok);
        assert_eq!(judge(9.5, 10.0, Some(0.5), Some(-0.5), None), Judgement::Ok);
        assert_eq!(judge(9.4, 10.0, Some(0.5), Some(-0.5), None), Judgement::Fail);
    }

    #[test]
    fn test_asymmetric_band() {
        assert_eq!(judge(10.15, 10.0, Some(0.2), Some(0.1), None), Judgement::Ok);
        assert_eq!(judge(10.05, 10.0, Some(0.2), Some(0.1), None), Judgement::Fail);
    }

    #[test]
    fn test_missing_required_fields_are_rejected() {
        let mut r = raw("", 1.0, 1.0, None, None);
        assert_eq!(MeasurementItem::from_raw(r.clone(), "a", None), Err(RecordError::MissingNumber));
        r.no = "4".to_string();
        r.measured = None;
        assert!(matches!(
            MeasurementItem::from_raw(r, "a", None),
            Err(RecordError::MissingField { field: "measured value", .. })
        ));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 1.25 "), Some(1.25));
        assert_eq!(parse_number("+0.05"), Some(0.05));
        assert_eq!(parse_number("-0.05"), Some(-0.05));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("---"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_original_judgement_tokens() {
        assert_eq!(OriginalJudgement::parse("NG"), Some(OriginalJudgement::Ng));
        assert_eq!(OriginalJudgement::parse(" Warning "), Some(OriginalJudgement::Warning));
        assert_eq!(OriginalJudgement::parse("---"), Some(OriginalJudgement::NotApplicable));
        assert_eq!(OriginalJudgement::parse(""), None);
    }
}
