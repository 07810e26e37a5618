//! Descriptive statistics over plain value slices

use serde::Serialize;

/// Count, centre and spread of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample (n-1) standard deviation; 0 for a single value
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n-1 denominator). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Summarize a sample; `None` when empty
pub fn describe(values: &[f64]) -> Option<Summary> {
    let mean = mean(values)?;
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    Some(Summary {
        count: values.len(),
        mean,
        std: sample_std(values).unwrap_or(0.0),
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_std_uses_n_minus_one() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - 2.138089935).abs() < 1e-9);
    }

    #[test]
    fn test_describe_single_value() {
        let s = describe(&[3.5]).unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.std, 0.0);
        assert_eq!(s.min, 3.5);
        assert_eq!(s.max, 3.5);
    }

    #[test]
    fn test_empty() {
        assert!(mean(&[]).is_none());
        assert!(sample_std(&[1.0]).is_none());
        assert!(describe(&[]).is_none());
    }
}
