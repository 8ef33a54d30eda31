//! Summary Statistics
//!
//! All fields are computed over the full sample set. Benchmark iteration
//! counts are small, so no outlier rejection is applied.

use crate::percentiles::compute_median;
use serde::{Deserialize, Serialize};

/// Summary of one sample set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Median
    pub median: f64,
    /// Sample standard deviation (n - 1), 0 below two samples
    pub std_dev: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Number of samples
    pub sample_count: usize,
}

/// Summarize samples. Returns `None` for an empty slice.
pub fn compute_summary(samples: &[f64]) -> Option<SummaryStatistics> {
    if samples.is_empty() {
        return None;
    }

    let n = samples.len();
    let mean = samples.iter().sum::<f64>() / n as f64;

    let std_dev = if n < 2 {
        0.0
    } else {
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(SummaryStatistics {
        mean,
        median: compute_median(samples),
        std_dev,
        min,
        max,
        sample_count: n,
    })
}

/// Ratio of the slowest to the fastest mean
///
/// `None` when fewer than two means are given or the fastest is not positive.
pub fn speedup(means: &[f64]) -> Option<f64> {
    if means.len() < 2 {
        return None;
    }
    let fastest = means.iter().copied().fold(f64::INFINITY, f64::min);
    let slowest = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (fastest > 0.0).then(|| slowest / fastest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_summary() {
        let stats = compute_summary(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();

        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.median - 4.5).abs() < 1e-12);
        assert!((stats.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.sample_count, 8);
    }

    #[test]
    fn test_single_sample_has_zero_std() {
        let stats = compute_summary(&[1.5]).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean, 1.5);
        assert_eq!(stats.median, 1.5);
    }

    #[test]
    fn test_empty() {
        assert!(compute_summary(&[]).is_none());
    }

    #[test]
    fn test_speedup() {
        assert_eq!(speedup(&[2.0]), None);
        assert_eq!(speedup(&[2.0, 1.0, 4.0]), Some(4.0));
        assert_eq!(speedup(&[0.0, 1.0]), None);
    }
}
