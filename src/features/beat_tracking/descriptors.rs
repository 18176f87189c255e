//! Rhythm descriptors derived from a finished beat grid
//!
//! - Tempo stability from the smoothed instantaneous tempo
//! - Per-beat strength sampled from the onset-strength envelope
//! - Rhythmic complexity from interval and strength variation

use crate::features::stats;
use crate::features::tempo::filters::savgol_linear;

/// Savitzky-Golay window for the instantaneous tempo
const STABILITY_WINDOW: usize = 5;

/// Fewer beats than this are reported as perfectly stable
const MIN_STABILITY_BEATS: usize = 4;

/// Strength used for every beat when no envelope is available
pub const NEUTRAL_BEAT_STRENGTH: f32 = 0.5;

/// Complexity reported without intervals
pub const NEUTRAL_COMPLEXITY: f32 = 0.5;

/// Smoothed instantaneous tempo and a stability score
///
/// Instantaneous tempo is `60 / diff(beats)`; stability is `1 - std / mean` of the
/// smoothed values, clamped to [0, 1].
///
/// # Returns
///
/// `(smoothed_bpm, stability)`; fewer than 4 beats give `(vec![], 1.0)`
pub fn tempo_stability(beats: &[f32]) -> (Vec<f32>, f32) {
    if beats.len() < MIN_STABILITY_BEATS {
        return (Vec::new(), 1.0);
    }

    let instantaneous: Vec<f32> = stats::diff(beats)
        .into_iter()
        .filter(|&i| i > 0.0)
        .map(|i| 60.0 / i)
        .collect();

    let smoothed = savgol_linear(&instantaneous, STABILITY_WINDOW.min(instantaneous.len()));
    if smoothed.len() < 2 {
        return (smoothed, 1.0);
    }

    let stability = match (stats::mean(&smoothed), stats::std_dev(&smoothed)) {
        (Some(mean), Some(std)) if mean > 0.0 => (1.0 - std / mean).clamp(0.0, 1.0),
        _ => 1.0,
    };

    (smoothed, stability)
}

/// Onset strength at each beat
///
/// # Arguments
///
/// * `beats` - Beat times in seconds
/// * `envelope` - Onset-strength envelope, one value per hop
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Envelope hop in samples
///
/// # Returns
///
/// One strength per beat (frame `floor(t * sr / hop)`, 0.0 outside the envelope). An
/// empty envelope gives 0.5 for every beat.
pub fn beat_strengths(beats: &[f32], envelope: &[f32], sample_rate: u32, hop_size: usize) -> Vec<f32> {
    if envelope.is_empty() || hop_size == 0 || sample_rate == 0 {
        return vec![NEUTRAL_BEAT_STRENGTH; beats.len()];
    }

    let frames_per_second = sample_rate as f32 / hop_size as f32;
    beats
        .iter()
        .map(|&t| {
            let frame = (t * frames_per_second).floor();
            if frame >= 0.0 && (frame as usize) < envelope.len() {
                envelope[frame as usize]
            } else {
                0.0
            }
        })
        .collect()
}

/// Rhythmic complexity in [0, 1]
///
/// Mean of the coefficients of variation of intervals and strengths, capped at 1.0.
/// 0.5 without intervals.
pub fn rhythmic_complexity(intervals: &[f32], strengths: &[f32]) -> f32 {
    if intervals.is_empty() {
        return NEUTRAL_COMPLEXITY;
    }
    let interval_cv = stats::coefficient_of_variation(intervals);
    let strength_cv = stats::coefficient_of_variation(strengths);
    ((interval_cv + strength_cv) / 2.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_grid_is_stable() {
        let beats: Vec<f32> = (0..20).map(|i| i as f32 * 0.5).collect();
        let (smoothed, stability) = tempo_stability(&beats);
        assert_eq!(smoothed.len(), 19);
        assert!(smoothed.iter().all(|&b| (b - 120.0).abs() < 0.01));
        assert!(stability > 0.999, "got {}", stability);
    }

    #[test]
    fn test_few_beats_are_stable() {
        assert_eq!(tempo_stability(&[0.0, 0.5, 1.0]), (Vec::new(), 1.0));
    }

    #[test]
    fn test_drifting_grid_is_less_stable() {
        let mut beats = vec![0.0f32];
        for i in 0..30 {
            let last = beats[beats.len() - 1];
            beats.push(last + 0.4 + i as f32 * 0.02);
        }
        let (_, stability) = tempo_stability(&beats);
        assert!(stability < 0.8, "Tempo drifting from 150 to 61 BPM, got {}", stability);
    }

    #[test]
    fn test_beat_strengths_sample_envelope() {
        // 100 frames per second
        let envelope: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let strengths = beat_strengths(&[0.0, 0.255, 0.5, 2.0, -1.0], &envelope, 22000, 220);
        assert_eq!(strengths[0], 0.0);
        assert_eq!(strengths[1], 25.0);
        assert_eq!(strengths[2], 50.0);
        assert_eq!(strengths[3], 0.0, "beyond the envelope");
        assert_eq!(strengths[4], 0.0, "before the envelope");
    }

    #[test]
    fn test_beat_strengths_without_envelope() {
        assert_eq!(beat_strengths(&[1.0, 2.0], &[], 22050, 256), vec![0.5, 0.5]);
    }

    #[test]
    fn test_complexity() {
        assert_eq!(rhythmic_complexity(&[], &[1.0]), 0.5);
        assert_eq!(rhythmic_complexity(&[0.5, 0.5], &[1.0, 1.0]), 0.0);
        let c = rhythmic_complexity(&[0.1, 1.0, 0.1, 1.0], &[0.1, 5.0, 0.1, 5.0]);
        assert!(c > 0.5 && c <= 1.0);
    }
}
