//! Percentile Computation

use std::cmp::Ordering;

/// Compute a single percentile from samples
///
/// Uses linear interpolation between nearest ranks. Returns 0 for an empty
/// slice.
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    match samples {
        [] => return 0.0,
        [only] => return *only,
        _ => {}
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = sorted.len();
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
}

/// Median; the mean of the two middle values for an even count
pub fn compute_median(samples: &[f64]) -> f64 {
    compute_percentile(samples, 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd() {
        let samples = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert!((compute_median(&samples) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_median_even() {
        let samples = vec![4.0, 1.0, 3.0, 2.0];
        assert!((compute_median(&samples) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quartiles() {
        let samples: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let p25 = compute_percentile(&samples, 25.0);
        let p75 = compute_percentile(&samples, 75.0);

        assert!((p25 - 25.75).abs() < 1e-9);
        assert!((p75 - 75.25).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample() {
        assert!((compute_percentile(&[42.0], 90.0) - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(compute_percentile(&[], 50.0), 0.0);
    }
}
