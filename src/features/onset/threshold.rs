//! Statistical thresholding utilities for onset envelopes
//!
//! Onset envelopes are compared on a common scale by z-score normalization, and peak
//! heights are expressed as `mean + k * std` of the envelope being searched.

use crate::features::stats;

/// Numerical stability epsilon used when dividing by a standard deviation
pub const ZSCORE_EPSILON: f32 = 1e-8;

/// Population mean and standard deviation of an envelope
///
/// Returns `(0.0, 0.0)` for an empty envelope.
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    (
        stats::mean(values).unwrap_or(0.0),
        stats::std_dev(values).unwrap_or(0.0),
    )
}

/// Z-score normalize with a stabilizing epsilon: `(x - mean) / (std + epsilon)`
///
/// A constant envelope maps to all zeros.
pub fn zscore(values: &[f32], epsilon: f32) -> Vec<f32> {
    let (mean, std) = mean_std(values);
    values.iter().map(|&v| (v - mean) / (std + epsilon)).collect()
}

/// Z-score normalize without an epsilon
///
/// Returns `None` when the envelope is empty or has (numerically) zero variance, so
/// callers can degrade instead of propagating NaNs.
pub fn strict_zscore(values: &[f32]) -> Option<Vec<f32>> {
    let (mean, std) = mean_std(values);
    if values.is_empty() || std <= f32::EPSILON {
        return None;
    }
    Some(values.iter().map(|&v| (v - mean) / std).collect())
}

/// Threshold `mean + k * std`
pub fn mean_plus_k_std(values: &[f32], k: f32) -> f32 {
    let (mean, std) = mean_std(values);
    mean + k * std
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zscore_constant_is_zero() {
        let z = zscore(&[3.0, 3.0, 3.0], ZSCORE_EPSILON);
        assert!(z.iter().all(|&v| v.abs() < 1e-6));
        assert!(strict_zscore(&[3.0, 3.0, 3.0]).is_none());
    }

    #[test]
    fn test_zscore_unit_variance() {
        let z = strict_zscore(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let (m, s) = mean_std(&z);
        assert!(m.abs() < 1e-6);
        assert!((s - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mean_plus_k_std() {
        let t = mean_plus_k_std(&[0.0, 2.0], 1.5);
        assert!((t - 2.5).abs() < 1e-6, "1.0 + 1.5 * 1.0, got {}", t);
    }

    #[test]
    fn test_empty_envelope() {
        assert_eq!(mean_std(&[]), (0.0, 0.0));
        assert!(zscore(&[], ZSCORE_EPSILON).is_empty());
        assert!(strict_zscore(&[]).is_none());
    }
}
