//! 2D radial statistics for coordinate pairs
//!
//! A coordinate pair is judged on its radial deviation from the nominal
//! position, `sqrt(dx² + dy²)`, rather than on each axis alone.
//!
//! Converting independent X/Y tolerances into one radial tolerance uses the
//! diagonal of the square tolerance zone: `min(|tol_x|, |tol_y|) * sqrt(2)`.
//! This is a modelling choice that keeps existing X/Y specifications usable;
//! a true positional tolerance would use the circle inscribed in the zone.
//!
//! The suggested radial tolerance assumes a Rayleigh distribution: X and Y
//! errors independent, zero-mean and of equal variance. The scale is
//! estimated by root mean square, which folds any centring offset into it.

use serde::Serialize;
use std::f64::consts::SQRT_2;
use std::fmt;

use super::capability::{cpu, CapabilityEstimate};
use super::tolerance::is_probability;
use crate::entities::Judgement;

pub fn radial_deviation(dx: f64, dy: f64) -> f64 {
    dx.hypot(dy)
}

/// Equivalent radial tolerance of two axis tolerances; `None` when both are zero
pub fn radial_tolerance(tol_x: f64, tol_y: f64) -> Option<f64> {
    let (x, y) = (tol_x.abs(), tol_y.abs());
    let x = (x.is_finite() && x > 0.0).then_some(x);
    let y = (y.is_finite() && y > 0.0).then_some(y);
    match (x, y) {
        (Some(x), Some(y)) => Some(x.min(y) * SQRT_2),
        (Some(t), None) | (None, Some(t)) => Some(t * SQRT_2),
        (None, None) => None,
    }
}

/// `Ok` when the deviation lies within the radial tolerance
pub fn judge_radial(radial: f64, tolerance: Option<f64>) -> Judgement {
    match tolerance {
        Some(tol) if radial.is_finite() => {
            if radial <= tol {
                Judgement::Ok
            } else {
                Judgement::Fail
            }
        }
        _ => Judgement::NotApplicable,
    }
}

/// One-sided capability of radial deviations against the radial tolerance
pub fn radial_capability(radials: &[f64], tolerance: Option<f64>, min_samples: usize) -> CapabilityEstimate {
    match tolerance {
        Some(tol) => cpu(radials, tol, min_samples),
        None => CapabilityEstimate::invalid(),
    }
}

/// Trustworthiness of a Rayleigh suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RayleighTier {
    Ok,
    SmallSample,
    ZeroVariance,
    NoData,
    InsufficientData,
    /// Target yield outside (0, 1)
    InvalidYield,
}

impl fmt::Display for RayleighTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RayleighTier::Ok => write!(f, "ok"),
            RayleighTier::SmallSample => write!(f, "small_sample"),
            RayleighTier::ZeroVariance => write!(f, "zero_variance"),
            RayleighTier::NoData => write!(f, "no_data"),
            RayleighTier::InsufficientData => write!(f, "insufficient_data"),
            RayleighTier::InvalidYield => write!(f, "invalid_yield"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RayleighSuggestion {
    pub tolerance: f64,
    /// Estimated Rayleigh scale
    pub sigma: f64,
    pub target_yield: f64,
    pub tier: RayleighTier,
}

/// Radial tolerance `T` with `P(R <= T) = target_yield`:
/// `T = sigma * sqrt(-2 ln(1 - P))`, `sigma = sqrt(mean(r²) / 2)`
pub fn rayleigh_tolerance(radials: &[f64], target_yield: f64, min_samples: usize) -> RayleighSuggestion {
    let empty = |tier| RayleighSuggestion {
        tolerance: f64::NAN,
        sigma: f64::NAN,
        target_yield,
        tier,
    };

    if !is_probability(target_yield) {
        return empty(RayleighTier::InvalidYield);
    }
    if radials.len() < 2 {
        return empty(RayleighTier::InsufficientData);
    }
    let finite: Vec<f64> = radials.iter().copied().filter(|r| r.is_finite()).collect();
    if finite.is_empty() {
        return empty(RayleighTier::NoData);
    }

    let mean_sq = finite.iter().map(|r| r * r).sum::<f64>() / finite.len() as f64;
    let sigma = (mean_sq / 2.0).sqrt();
    if sigma <= 0.0 {
        return RayleighSuggestion {
            tolerance: 0.0,
            sigma: 0.0,
            target_yield,
            tier: RayleighTier::ZeroVariance,
        };
    }

    let tier = if finite.len() < min_samples {
        RayleighTier::SmallSample
    } else {
        RayleighTier::Ok
    };
    RayleighSuggestion {
        tolerance: sigma * (-2.0 * (1.0 - target_yield).ln()).sqrt(),
        sigma,
        target_yield,
        tier,
    }
}
