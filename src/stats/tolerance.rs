//! Yield-driven tolerance inversion
//!
//! Given a target yield `P`, the two-sided standard-normal quantile `z` puts a
//! central mass of `P` inside `mean ± z * sigma`. The suggested tolerance is
//! measured from the design value, so the process offset is added on top:
//!
//! ```text
//! symmetric = z * sigma + |mean - design|
//! upper     = z * sigma + (mean - design)
//! lower     = -(z * sigma - (mean - design))
//! ```

use serde::Serialize;
use std::fmt;

use super::capability::ZERO_STD;
use super::descriptive::{mean, sample_std};

/// Yields offered by the tolerance detail view
pub const STANDARD_YIELDS: [f64; 6] = [0.80, 0.85, 0.90, 0.95, 0.99, 0.9973];

/// Quantiles used when the target yield is not a probability
const Z_TABLE: [(f64, f64); 4] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576), (0.9973, 3.0)];
const DEFAULT_Z: f64 = 1.645;

/// Inverse of the standard normal CDF.
///
/// Acklam's rational approximation; relative error below 1.15e-9 on (0, 1).
/// Returns `NaN` outside the open unit interval.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// `true` for a yield strictly between 0 and 1
pub fn is_probability(p: f64) -> bool {
    p.is_finite() && p > 0.0 && p < 1.0
}

/// Two-sided quantile for a central probability `p`
pub fn two_sided_z(p: f64) -> f64 {
    if is_probability(p) {
        let z = inverse_normal_cdf(1.0 - (1.0 - p) / 2.0);
        if z.is_finite() {
            return z;
        }
    }
    Z_TABLE
        .iter()
        .find(|(yield_, _)| (yield_ - p).abs() < 1e-9)
        .map(|&(_, z)| z)
        .unwrap_or(DEFAULT_Z)
}

/// Trustworthiness of a tolerance suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceTier {
    Reliable,
    SmallSample,
    ZeroStd,
    Invalid,
}

impl fmt::Display for ToleranceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToleranceTier::Reliable => write!(f, "reliable"),
            ToleranceTier::SmallSample => write!(f, "small_sample"),
            ToleranceTier::ZeroStd => write!(f, "zero_std"),
            ToleranceTier::Invalid => write!(f, "invalid"),
        }
    }
}

/// Suggested tolerance for a target yield. Tolerances are `NaN` unless the
/// tier is `Reliable` or `SmallSample`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceSuggestion {
    pub target_yield: f64,
    pub z: f64,
    pub symmetric: f64,
    pub upper: f64,
    pub lower: f64,
    pub offset: f64,
    pub mean: f64,
    pub std: f64,
    pub tier: ToleranceTier,
}

impl ToleranceSuggestion {
    fn empty(target_yield: f64, tier: ToleranceTier) -> Self {
        Self {
            target_yield,
            z: two_sided_z(target_yield),
            symmetric: f64::NAN,
            upper: f64::NAN,
            lower: f64::NAN,
            offset: f64::NAN,
            mean: f64::NAN,
            std: f64::NAN,
            tier,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self.tier, ToleranceTier::Reliable | ToleranceTier::SmallSample)
    }
}

/// Invert the target yield into a tolerance around `design`.
///
/// A target yield outside (0, 1) is not invertible and resolves to `Invalid`.
pub fn tolerance_for_yield(
    values: &[f64],
    design: f64,
    target_yield: f64,
    min_samples: usize,
) -> ToleranceSuggestion {
    if !is_probability(target_yield) {
        return ToleranceSuggestion::empty(target_yield, ToleranceTier::Invalid);
    }
    let (Some(m), Some(sigma)) = (mean(values), sample_std(values)) else {
        return ToleranceSuggestion::empty(target_yield, ToleranceTier::Invalid);
    };
    if sigma < ZERO_STD {
        return ToleranceSuggestion {
            mean: m,
            std: 0.0,
            ..ToleranceSuggestion::empty(target_yield, ToleranceTier::ZeroStd)
        };
    }

    let z = two_sided_z(target_yield);
    let offset = m - design;
    let spread = z * sigma;
    let tier = if values.len() < min_samples {
        ToleranceTier::SmallSample
    } else {
        ToleranceTier::Reliable
    };

    ToleranceSuggestion {
        target_yield,
        z,
        symmetric: spread + offset.abs(),
        upper: spread + offset,
        lower: -(spread - offset),
        offset,
        mean: m,
        std: sigma,
        tier,
    }
}

/// How a suggestion compares with the tolerance currently specified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecComparison {
    /// Suggested tolerance exceeds the current one by more than 20%
    Tight,
    Adequate,
    /// Suggested tolerance is below 80% of the current one
    Generous,
    /// No current tolerance or no usable suggestion
    Unknown,
}

impl fmt::Display for SpecComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecComparison::Tight => write!(f, "spec tight"),
            SpecComparison::Adequate => write!(f, "spec adequate"),
            SpecComparison::Generous => write!(f, "spec generous"),
            SpecComparison::Unknown => write!(f, "-"),
        }
    }
}

/// Compare a symmetric suggestion with the wider of the current bounds
pub fn compare_with_spec(suggested: f64, upper: f64, lower: f64) -> SpecComparison {
    let current = upper.abs().max(lower.abs());
    if !suggested.is_finite() || !current.is_finite() || current <= 0.0 {
        return SpecComparison::Unknown;
    }
    if suggested > current * 1.2 {
        SpecComparison::Tight
    } else if suggested < current * 0.8 {
        SpecComparison::Generous
    } else {
        SpecComparison::Adequate
    }
}
