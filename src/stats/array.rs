//! Statistics over the points of an array measurement (flatness grids and
//! similar point sets)

use serde::Serialize;

use super::descriptive::describe;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrayStatistics {
    pub count: usize,
    /// Max minus min
    pub peak_valley: f64,
    /// Mean of absolute values
    pub mean_abs: f64,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single point
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

/// `None` for an empty point set
pub fn array_statistics(points: &[f64]) -> Option<ArrayStatistics> {
    let summary = describe(points)?;
    Some(ArrayStatistics {
        count: summary.count,
        peak_valley: summary.max - summary.min,
        mean_abs: points.iter().map(|v| v.abs()).sum::<f64>() / points.len() as f64,
        mean: summary.mean,
        std: summary.std,
        max: summary.max,
        min: summary.min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_valley_and_mean() {
        let s = array_statistics(&[1.0, 1.2, 0.8, 1.1]).unwrap();
        assert!((s.peak_valley - 0.4).abs() < 1e-12);
        assert!((s.mean - 1.025).abs() < 1e-12);
        assert_eq!(s.count, 4);
        assert_eq!(s.max, 1.2);
        assert_eq!(s.min, 0.8);
    }

    #[test]
    fn test_mean_abs_of_signed_points() {
        let s = array_statistics(&[-0.2, 0.1, 0.3]).unwrap();
        assert!((s.mean_abs - 0.2).abs() < 1e-12);
        assert!((s.mean - 0.0666666666).abs() < 1e-9);
    }

    #[test]
    fn test_single_point() {
        let s = array_statistics(&[0.5]).unwrap();
        assert_eq!(s.peak_valley, 0.0);
        assert_eq!(s.std, 0.0);
        assert!(array_statistics(&[]).is_none());
    }
}
