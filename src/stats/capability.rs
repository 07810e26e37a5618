//! Process capability (Cpk) with sample-reliability tiers
//!
//! ```text
//! Cpu = (USL - mean) / (3 * sigma)
//! Cpl = (mean - LSL) / (3 * sigma)
//! Cpk = min(Cpu, Cpl)
//! ```
//!
//! `sigma` is the sample (n-1) standard deviation. Degenerate inputs never
//! fail; they resolve to a tier so the caller can still show the row.
//!
//! # Reference
//!
//! Montgomery (2019), *Introduction to Statistical Quality Control*, 8th ed.,
//! Chapter 8.

use serde::Serialize;
use std::fmt;

use super::descriptive::{mean, sample_std};

/// Specification bands narrower than this are degenerate
pub const DEGENERATE_BAND: f64 = 1e-9;

/// Standard deviations below this count as zero
pub const ZERO_STD: f64 = 1e-9;

/// Reported for a perfectly repeatable process; not a meaningful index
pub const ZERO_STD_SENTINEL: f64 = 999.0;

/// Sample size from which an index is trusted
pub const DEFAULT_MIN_SAMPLES: usize = 30;

/// Trustworthiness of a capability index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTier {
    Reliable,
    SmallSample,
    Invalid,
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityTier::Reliable => write!(f, "reliable"),
            CapabilityTier::SmallSample => write!(f, "small_sample"),
            CapabilityTier::Invalid => write!(f, "invalid"),
        }
    }
}

/// A capability index and how far to trust it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapabilityEstimate {
    /// `NaN` when not computable, [`ZERO_STD_SENTINEL`] for zero spread
    pub value: f64,
    pub tier: CapabilityTier,
}

impl CapabilityEstimate {
    pub fn invalid() -> Self {
        Self {
            value: f64::NAN,
            tier: CapabilityTier::Invalid,
        }
    }

    fn zero_spread() -> Self {
        Self {
            value: ZERO_STD_SENTINEL,
            tier: CapabilityTier::Invalid,
        }
    }

    fn from_sample(value: f64, n: usize, min_samples: usize) -> Self {
        let tier = if n < min_samples {
            CapabilityTier::SmallSample
        } else {
            CapabilityTier::Reliable
        };
        Self { value, tier }
    }

    /// The index when it is a real number worth showing
    pub fn usable(&self) -> Option<f64> {
        (self.tier != CapabilityTier::Invalid && self.value.is_finite()).then_some(self.value)
    }
}

/// Two-sided Cpk of `values` against `[lsl, usl]`
pub fn cpk(values: &[f64], usl: f64, lsl: f64, min_samples: usize) -> CapabilityEstimate {
    if values.len() < 2 || !usl.is_finite() || !lsl.is_finite() || (usl - lsl).abs() <= DEGENERATE_BAND {
        return CapabilityEstimate::invalid();
    }
    let (Some(m), Some(sigma)) = (mean(values), sample_std(values)) else {
        return CapabilityEstimate::invalid();
    };
    if sigma < ZERO_STD {
        return CapabilityEstimate::zero_spread();
    }

    let cpu = (usl - m) / (3.0 * sigma);
    let cpl = (m - lsl) / (3.0 * sigma);
    CapabilityEstimate::from_sample(cpu.min(cpl), values.len(), min_samples)
}

/// One-sided upper capability: `(limit - mean) / (3 * sigma)`
pub fn cpu(values: &[f64], limit: f64, min_samples: usize) -> CapabilityEstimate {
    if values.len() < 2 || !limit.is_finite() {
        return CapabilityEstimate::invalid();
    }
    let (Some(m), Some(sigma)) = (mean(values), sample_std(values)) else {
        return CapabilityEstimate::invalid();
    };
    if sigma < ZERO_STD {
        return CapabilityEstimate::zero_spread();
    }
    CapabilityEstimate::from_sample((limit - m) / (3.0 * sigma), values.len(), min_samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_values_are_small_sample() {
        let est = cpk(&[10.05, 10.2], 10.1, 9.9, DEFAULT_MIN_SAMPLES);
        assert_eq!(est.tier, CapabilityTier::SmallSample);
        assert!(est.value.is_finite());
        // mean 10.125 lies above USL, so the index is negative
        assert!(est.value < 0.0);
    }

    #[test]
    fn test_constant_values_give_sentinel() {
        let est = cpk(&[5.0, 5.0, 5.0], 5.1, 4.9, DEFAULT_MIN_SAMPLES);
        assert_eq!(est.value, ZERO_STD_SENTINEL);
        assert_eq!(est.tier, CapabilityTier::Invalid);
        assert!(est.usable().is_none());
    }

    #[test]
    fn test_single_value_is_nan() {
        let est = cpk(&[5.0], 5.1, 4.9, DEFAULT_MIN_SAMPLES);
        assert!(est.value.is_nan());
        assert_eq!(est.tier, CapabilityTier::Invalid);
    }

    #[test]
    fn test_degenerate_band_is_nan() {
        let est = cpk(&[1.0, 2.0, 3.0], 2.0, 2.0, DEFAULT_MIN_SAMPLES);
        assert!(est.value.is_nan());
        assert_eq!(est.tier, CapabilityTier::Invalid);
    }

    #[test]
    fn test_centered_process() {
        // Limits exactly three sigma either side of the mean
        let values: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 9.9 } else { 10.1 }).collect();
        let sigma = sample_std(&values).unwrap();
        let est = cpk(&values, 10.0 + 3.0 * sigma, 10.0 - 3.0 * sigma, DEFAULT_MIN_SAMPLES);
        assert!((est.value - 1.0).abs() < 1e-9);
        assert_eq!(est.tier, CapabilityTier::Reliable);
    }

    #[test]
    fn test_one_sided_upper() {
        let est = cpu(&[0.01, 0.02, 0.03], 0.08, DEFAULT_MIN_SAMPLES);
        let expected = (0.08 - 0.02) / (3.0 * 0.01);
        assert!((est.value - expected).abs() < 1e-9);
    }
}
