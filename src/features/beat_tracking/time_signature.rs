//! Time signature detection
//!
//! Estimates the meter from the regularity of measure lengths under each candidate
//! grouping (2, 3, 4 and 6 beats), weighted with a global interval-regularity score.
//!
//! # Algorithm
//!
//! 1. For each meter m, split the beats into consecutive groups of m and score the
//!    consistency of the group spans: `1 - std / mean`, clamped to [0, 1]
//! 2. Score interval regularity as `1 / (1 + variance)` times a fixed per-meter bonus
//!    (2: 0.8, 3: 0.6, 4: 1.0, 6: 0.7)
//! 3. Combine as `0.7 * pattern + 0.3 * interval` and keep the best meter
//! 4. Report 6/8 with a numerator of 2 (compound duple feel)
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::beat_tracking::time_signature::{detect_downbeats, detect_time_signature};
//! use cadenza_dsp::features::stats::diff;
//!
//! let beats: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
//! let intervals = diff(&beats);
//!
//! let (time_sig, confidence) = detect_time_signature(&beats, &intervals);
//! let downbeats = detect_downbeats(&beats, time_sig.reported_numerator());
//!
//! println!("Time signature: {} (confidence: {:.2})", time_sig.name(), confidence);
//! ```

use serde::{Deserialize, Serialize};

use crate::features::stats;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Fewer beats than this return the default meter
const MIN_BEATS: usize = 8;

/// Default when there are too few beats
const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Default when scoring produced something unusable
const FAILURE_CONFIDENCE: f32 = 0.3;

/// Bins of the interval grouping histogram
const GROUPING_BINS: usize = 20;

const PATTERN_WEIGHT: f32 = 0.7;
const INTERVAL_WEIGHT: f32 = 0.3;

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSignature {
    /// 2/4 time
    TwoFour,
    /// 3/4 time (waltz time)
    ThreeFour,
    /// 4/4 time (common time)
    FourFour,
    /// 6/8 time (compound duple)
    SixEight,
}

impl TimeSignature {
    /// Candidate meters in tie-break order
    pub const CANDIDATES: [TimeSignature; 4] = [
        TimeSignature::TwoFour,
        TimeSignature::ThreeFour,
        TimeSignature::FourFour,
        TimeSignature::SixEight,
    ];

    /// Get beats per bar for this time signature
    pub fn beats_per_bar(&self) -> usize {
        match self {
            TimeSignature::TwoFour => 2,
            TimeSignature::ThreeFour => 3,
            TimeSignature::FourFour => 4,
            TimeSignature::SixEight => 6,
        }
    }

    /// Numerator reported to callers; 6/8 is felt as 2
    pub fn reported_numerator(&self) -> usize {
        match self {
            TimeSignature::SixEight => 2,
            other => other.beats_per_bar(),
        }
    }

    /// Regularity bonus applied to the interval score
    fn regularity_bonus(&self) -> f32 {
        match self {
            TimeSignature::TwoFour => 0.8,
            TimeSignature::ThreeFour => 0.6,
            TimeSignature::FourFour => 1.0,
            TimeSignature::SixEight => 0.7,
        }
    }

    /// Get name as string (e.g., "4/4", "3/4", "6/8")
    pub fn name(&self) -> &'static str {
        match self {
            TimeSignature::TwoFour => "2/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::FourFour => "4/4",
            TimeSignature::SixEight => "6/8",
        }
    }
}

/// Summary of the beat-interval distribution
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalGrouping {
    /// Left edges of the three fullest histogram bins, fullest first
    pub common_intervals: Vec<f32>,
    pub variance: f32,
    pub mean: f32,
    pub std: f32,
}

/// Histogram the intervals into 20 bins and summarize them
///
/// Returns `None` for an empty slice.
pub fn analyze_interval_grouping(intervals: &[f32]) -> Option<IntervalGrouping> {
    let mean = stats::mean(intervals)?;
    let variance = stats::variance(intervals)?;

    let (mut lo, mut hi) = intervals
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi - lo <= EPSILON {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / GROUPING_BINS as f32;

    let mut counts = [0usize; GROUPING_BINS];
    for &v in intervals {
        let bin = (((v - lo) / width) as usize).min(GROUPING_BINS - 1);
        counts[bin] += 1;
    }

    let mut order: Vec<usize> = (0..GROUPING_BINS).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    let common_intervals = order
        .into_iter()
        .take(3)
        .map(|bin| lo + bin as f32 * width)
        .collect();

    Some(IntervalGrouping {
        common_intervals,
        variance,
        mean,
        std: variance.sqrt(),
    })
}

/// Consistency of measure spans when beats are grouped `meter` at a time
///
/// Only complete groups count; fewer than two complete groups score 0.
pub fn meter_pattern_score(beats: &[f32], meter: usize) -> f32 {
    if meter == 0 || beats.len() < meter * 2 {
        return 0.0;
    }

    let spans: Vec<f32> = beats
        .chunks_exact(meter)
        .map(|measure| measure[meter - 1] - measure[0])
        .collect();

    if spans.len() < 2 {
        return 0.0;
    }

    match (stats::mean(&spans), stats::std_dev(&spans)) {
        (Some(mean), Some(std)) if mean > EPSILON => (1.0 - std / mean).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Interval regularity for one meter
fn interval_score(grouping: &IntervalGrouping, signature: TimeSignature) -> f32 {
    signature.regularity_bonus() / (1.0 + grouping.variance)
}

/// Detect time signature from beat pattern
///
/// # Arguments
///
/// * `beats` - Beat times in seconds (sorted)
/// * `intervals` - Inter-beat intervals in seconds
///
/// # Returns
///
/// Detected time signature with a confidence in [0, 1]. Fewer than 8 beats or no
/// intervals give (4/4, 0.5); a non-finite score gives (4/4, 0.3).
pub fn detect_time_signature(beats: &[f32], intervals: &[f32]) -> (TimeSignature, f32) {
    if beats.len() < MIN_BEATS {
        return (TimeSignature::FourFour, DEFAULT_CONFIDENCE);
    }

    let Some(grouping) = analyze_interval_grouping(intervals) else {
        return (TimeSignature::FourFour, DEFAULT_CONFIDENCE);
    };

    let mut best = (TimeSignature::FourFour, f32::NEG_INFINITY);
    for signature in TimeSignature::CANDIDATES {
        let pattern = meter_pattern_score(beats, signature.beats_per_bar());
        let score = PATTERN_WEIGHT * pattern + INTERVAL_WEIGHT * interval_score(&grouping, signature);
        log::debug!("Meter {}: pattern {:.3}, combined {:.3}", signature.name(), pattern, score);

        if !score.is_finite() {
            log::warn!("Time signature scoring produced a non-finite score");
            return (TimeSignature::FourFour, FAILURE_CONFIDENCE);
        }
        if score > best.1 {
            best = (signature, score);
        }
    }

    (best.0, best.1.clamp(0.0, 1.0))
}

/// Every `numerator`-th beat starting with the first
pub fn detect_downbeats(beats: &[f32], numerator: usize) -> Vec<f32> {
    beats.iter().step_by(numerator.max(1)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, interval: f32) -> Vec<f32> {
        (0..n).map(|i| i as f32 * interval).collect()
    }

    #[test]
    fn test_regular_grid_favors_four_four() {
        let beats = grid(16, 0.6);
        let intervals = stats::diff(&beats);
        let (time_sig, confidence) = detect_time_signature(&beats, &intervals);

        assert_eq!(time_sig, TimeSignature::FourFour);
        assert!(confidence > 0.95, "Perfect grid should be near-certain, got {}", confidence);
        assert!(confidence <= 1.0);
    }

    #[test]
    fn test_insufficient_beats() {
        let beats = grid(6, 0.1);
        let intervals = stats::diff(&beats);
        let (time_sig, confidence) = detect_time_signature(&beats, &intervals);

        assert_eq!(time_sig, TimeSignature::FourFour);
        assert_eq!(confidence, 0.5);
    }

    #[test]
    fn test_waltz_pattern_prefers_three() {
        // Every 3-beat measure spans exactly 1.0s while 4-beat measures alternate
        // between 2.0s and 1.25s
        let intervals = [0.5, 0.5, 1.0, 0.5, 0.5, 0.25, 0.5, 0.5, 1.0, 0.5];
        let mut beats = vec![0.0f32];
        for step in intervals {
            let last = beats[beats.len() - 1];
            beats.push(last + step);
        }
        assert_eq!(meter_pattern_score(&beats, 3), 1.0);
        assert!(meter_pattern_score(&beats, 4) < 0.8);
        assert_eq!(meter_pattern_score(&beats, 6), 0.0, "11 beats hold only one 6-beat measure");

        let (time_sig, confidence) = detect_time_signature(&beats, &intervals);
        assert_eq!(time_sig, TimeSignature::ThreeFour);
        assert!(confidence > 0.8 && confidence <= 1.0);
    }

    #[test]
    fn test_meter_pattern_needs_two_measures() {
        let beats = grid(7, 0.5);
        assert_eq!(meter_pattern_score(&beats, 4), 0.0);
        assert_eq!(meter_pattern_score(&beats, 3), 1.0);
    }

    #[test]
    fn test_reported_numerator_folds_compound() {
        assert_eq!(TimeSignature::SixEight.reported_numerator(), 2);
        assert_eq!(TimeSignature::FourFour.reported_numerator(), 4);
        assert_eq!(TimeSignature::ThreeFour.reported_numerator(), 3);
        assert_eq!(TimeSignature::TwoFour.beats_per_bar(), 2);
    }

    #[test]
    fn test_time_signature_name() {
        assert_eq!(TimeSignature::FourFour.name(), "4/4");
        assert_eq!(TimeSignature::ThreeFour.name(), "3/4");
        assert_eq!(TimeSignature::SixEight.name(), "6/8");
        assert_eq!(TimeSignature::TwoFour.name(), "2/4");
    }

    #[test]
    fn test_downbeats_are_subsequence() {
        let beats = grid(10, 0.5);
        let downbeats = detect_downbeats(&beats, 4);
        assert_eq!(downbeats, vec![0.0, 2.0, 4.0]);
        assert!(downbeats.iter().all(|d| beats.contains(d)));
        assert!(detect_downbeats(&[], 4).is_empty());
    }

    #[test]
    fn test_interval_grouping() {
        let g = analyze_interval_grouping(&[0.5, 0.5, 0.5, 1.0]).unwrap();
        assert_eq!(g.common_intervals.len(), 3);
        assert!((g.common_intervals[0] - 0.5).abs() < 1e-6);
        assert!((g.mean - 0.625).abs() < 1e-6);
        assert!(analyze_interval_grouping(&[]).is_none());
    }
}
