//! Beat sequencing over a tempo curve
//!
//! Walks forward from a few candidate start onsets, predicting each next beat from the
//! local tempo and snapping it to a nearby onset when one exists. The best-aligned walk
//! is refined against the onsets and thinned so no two beats are closer than 200 ms.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::beat_tracking::sequencer::sequence_beats;
//! use cadenza_dsp::features::tempo::TempoCurve;
//!
//! let onsets: Vec<f32> = (0..40).map(|i| 0.6 + i as f32 * 0.5).collect();
//! let curve = TempoCurve::constant(120.0);
//! let sequence = sequence_beats(&onsets, &curve, 21.0);
//! println!("{} beats (score {:.2})", sequence.beats.len(), sequence.alignment_score);
//! ```

use serde::{Deserialize, Serialize};

use crate::features::onset::synthetic_grid::regular_grid;
use crate::features::tempo::TempoCurve;

/// Onsets considered as walk seeds
const SEED_POOL: usize = 20;

/// Walk seeds actually tried
const MAX_SEEDS: usize = 3;

/// Seeds must come strictly after this time; also the default seed and grid start
const SEED_START_SECONDS: f32 = 0.5;

/// The walk stops once the current beat is within this distance of the end
const END_MARGIN_SECONDS: f32 = 0.5;

/// Snap tolerance during the walk, as a fraction of the local beat interval
const WALK_TOLERANCE: f32 = 0.3;

/// Alignment scoring window
const SCORE_WINDOW_SECONDS: f32 = 0.15;

/// Per-beat score when there are no onsets to align against
const NO_ONSET_BEAT_SCORE: f32 = 0.5;

/// Refinement snap window
const REFINE_WINDOW_SECONDS: f32 = 0.05;

/// Minimum gap between consecutive output beats
pub const MIN_BEAT_GAP_SECONDS: f32 = 0.2;

/// How the beat sequence was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeatSource {
    /// Best of the onset-guided walks
    OnsetAligned,
    /// Uniform grid at the mean track tempo (no walk produced a sequence)
    SyntheticGrid,
}

/// Output of the beat sequencer
#[derive(Debug, Clone)]
pub struct BeatSequence {
    /// Beat times in seconds, strictly increasing with gaps above 200 ms
    pub beats: Vec<f32>,

    /// Normalized alignment score of the winning walk (0.0-1.0)
    pub alignment_score: f32,

    /// How the sequence was obtained
    pub source: BeatSource,
}

/// Onset nearest to `t`; on a tie the earlier onset wins
///
/// `onsets` must be sorted ascending.
pub fn nearest_onset(onsets: &[f32], t: f32) -> Option<f32> {
    let idx = onsets.partition_point(|&o| o < t);
    let before = idx.checked_sub(1).map(|i| onsets[i]);
    let after = onsets.get(idx).copied();
    match (before, after) {
        (Some(b), Some(a)) => {
            if (t - b) <= (a - t) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (b, a) => b.or(a),
    }
}

/// Nearest onset strictly within `tolerance` of `t`
fn snap(onsets: &[f32], t: f32, tolerance: f32) -> Option<f32> {
    nearest_onset(onsets, t).filter(|&o| (o - t).abs() < tolerance)
}

/// Walk seeds: the first three of the first 20 onsets after 0.5 s, else 0.5 s
pub fn seed_times(onsets: &[f32]) -> Vec<f32> {
    let seeds: Vec<f32> = onsets
        .iter()
        .take(SEED_POOL)
        .copied()
        .filter(|&t| t > SEED_START_SECONDS)
        .take(MAX_SEEDS)
        .collect();
    if seeds.is_empty() {
        vec![SEED_START_SECONDS]
    } else {
        seeds
    }
}

/// Greedy beat walk from `seed`
///
/// Returns `None` when the seed lies at or beyond the end of the audio. Predicted beats at
/// or beyond `duration` end the walk without being added.
pub fn walk_from(seed: f32, onsets: &[f32], curve: &TempoCurve, duration: f32) -> Option<Vec<f32>> {
    if seed >= duration {
        return None;
    }

    let mut beats = vec![seed];
    let mut current = seed;

    while current < duration - END_MARGIN_SECONDS {
        // The curve is clamped, so the interval is always positive
        let interval = 60.0 / curve.bpm_at(current);
        let predicted = current + interval;

        let next = snap(onsets, predicted, interval * WALK_TOLERANCE).unwrap_or(predicted);
        if next >= duration {
            break;
        }
        beats.push(next);
        current = next;
    }

    Some(beats)
}

/// Mean per-beat alignment of `beats` with `onsets`
///
/// A beat within 150 ms of its nearest onset earns `1 - distance / 0.15`. Without any
/// onsets every beat earns 0.5.
pub fn alignment_score(beats: &[f32], onsets: &[f32]) -> f32 {
    if beats.is_empty() {
        return 0.0;
    }

    let total: f32 = beats
        .iter()
        .map(|&beat| {
            if onsets.is_empty() {
                return NO_ONSET_BEAT_SCORE;
            }
            match nearest_onset(onsets, beat) {
                Some(o) if (o - beat).abs() < SCORE_WINDOW_SECONDS => {
                    1.0 - (o - beat).abs() / SCORE_WINDOW_SECONDS
                }
                _ => 0.0,
            }
        })
        .sum();

    total / beats.len() as f32
}

/// Keep a beat only if it is more than 200 ms after the previously kept beat
pub fn enforce_min_gap(beats: &[f32]) -> Vec<f32> {
    let mut kept: Vec<f32> = Vec::with_capacity(beats.len());
    for &beat in beats {
        match kept.last() {
            Some(&last) if beat - last <= MIN_BEAT_GAP_SECONDS => {}
            _ => kept.push(beat),
        }
    }
    kept
}

/// Snap each beat to an onset within ±50 ms, then enforce the minimum gap
pub fn refine_beats(beats: &[f32], onsets: &[f32]) -> Vec<f32> {
    let snapped: Vec<f32> = beats
        .iter()
        .map(|&b| snap(onsets, b, REFINE_WINDOW_SECONDS).unwrap_or(b))
        .collect();
    enforce_min_gap(&snapped)
}

/// Sequence beats from onsets and a tempo curve
///
/// # Arguments
///
/// * `onsets` - Onset times in seconds, ascending
/// * `curve` - Tempo curve from the tempo tracker
/// * `duration` - Audio duration in seconds
///
/// # Returns
///
/// The refined best walk, or a uniform grid at the curve's mean tempo when no walk could
/// start. For positive durations the result always holds at least one beat.
pub fn sequence_beats(onsets: &[f32], curve: &TempoCurve, duration: f32) -> BeatSequence {
    let mut best: Option<(Vec<f32>, f32)> = None;

    for seed in seed_times(onsets) {
        let Some(beats) = walk_from(seed, onsets, curve, duration) else {
            log::debug!("Seed {:.3}s lies past the end of the audio", seed);
            continue;
        };
        let score = alignment_score(&beats, onsets);
        log::debug!("Beat sequence starting at {:.3}s: score={:.3}", seed, score);

        let better = best.as_ref().map_or(true, |(_, s)| score > *s);
        if better {
            best = Some((beats, score));
        }
    }

    let (beats, alignment_score, source) = match best {
        Some((beats, score)) => (beats, score, BeatSource::OnsetAligned),
        None => {
            let bpm = curve.mean_bpm();
            let start = if duration > SEED_START_SECONDS {
                SEED_START_SECONDS
            } else {
                0.0
            };
            let grid = regular_grid(start, bpm, duration);
            log::warn!(
                "Beat tracking failed, created {} synthetic beats at {:.1} BPM",
                grid.len(),
                bpm
            );
            let score = alignment_score(&grid, onsets);
            (grid, score, BeatSource::SyntheticGrid)
        }
    };

    BeatSequence {
        beats: refine_beats(&beats, onsets),
        alignment_score,
        source,
    }
}

/// Tempo implied by a beat sequence
///
/// `60 / median(inter-beat interval)` for two or more beats, otherwise `fallback_bpm`.
pub fn sequence_tempo(beats: &[f32], fallback_bpm: f32) -> f32 {
    let intervals = crate::features::stats::diff(beats);
    match crate::features::stats::median(&intervals) {
        Some(m) if m > 0.0 => 60.0 / m,
        _ => fallback_bpm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_onset() {
        let onsets = [1.0, 2.0, 3.0];
        assert_eq!(nearest_onset(&onsets, 1.4), Some(1.0));
        assert_eq!(nearest_onset(&onsets, 1.6), Some(2.0));
        assert_eq!(nearest_onset(&onsets, 1.5), Some(1.0), "tie keeps the earlier onset");
        assert_eq!(nearest_onset(&onsets, -5.0), Some(1.0));
        assert_eq!(nearest_onset(&onsets, 9.0), Some(3.0));
        assert_eq!(nearest_onset(&[], 1.0), None);
    }

    #[test]
    fn test_seed_times() {
        assert_eq!(seed_times(&[0.1, 0.5, 0.7, 1.2, 1.9, 2.4]), vec![0.7, 1.2, 1.9]);
        assert_eq!(seed_times(&[0.2, 0.4]), vec![0.5]);
        assert_eq!(seed_times(&[]), vec![0.5]);
    }

    #[test]
    fn test_walk_snaps_to_onsets() {
        // Onsets slightly late relative to a 120 BPM prediction
        let onsets: Vec<f32> = (0..20).map(|i| 1.0 + i as f32 * 0.52).collect();
        let curve = TempoCurve::constant(120.0);
        let beats = walk_from(1.0, &onsets, &curve, 11.0).unwrap();
        assert!(beats.len() >= 15);
        for (b, o) in beats.iter().zip(onsets.iter()).take(15) {
            assert!((b - o).abs() < 1e-5, "beat {} should snap to onset {}", b, o);
        }
    }

    #[test]
    fn test_walk_keeps_predictions_without_onsets() {
        let curve = TempoCurve::constant(120.0);
        let beats = walk_from(0.5, &[], &curve, 3.0).unwrap();
        assert_eq!(beats.len(), 5);
        assert!((beats[4] - 2.5).abs() < 1e-5);
        assert!(beats.iter().all(|&b| b < 3.0));
    }

    #[test]
    fn test_walk_rejects_late_seed() {
        let curve = TempoCurve::constant(120.0);
        assert!(walk_from(2.0, &[], &curve, 2.0).is_none());
    }

    #[test]
    fn test_alignment_score() {
        assert_eq!(alignment_score(&[1.0, 2.0], &[]), 0.5);
        assert!((alignment_score(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        // One perfect beat, one 75 ms off, one far away
        let score = alignment_score(&[1.0, 2.075, 5.0], &[1.0, 2.0]);
        assert!((score - 0.5).abs() < 1e-4, "got {}", score);
    }

    #[test]
    fn test_refine_snaps_and_thins() {
        let beats = [1.0, 1.03, 1.5, 1.65, 2.0];
        let onsets = [1.02, 1.49];
        let refined = refine_beats(&beats, &onsets);
        assert_eq!(refined, vec![1.02, 1.49, 2.0]);
    }

    #[test]
    fn test_min_gap_is_exclusive() {
        assert_eq!(enforce_min_gap(&[0.0, 0.2, 0.41]), vec![0.0, 0.41]);
    }

    #[test]
    fn test_empty_onsets_still_give_beats() {
        let curve = TempoCurve::constant(85.0);
        let sequence = sequence_beats(&[], &curve, 30.0);
        assert_eq!(sequence.source, BeatSource::OnsetAligned);
        assert!(!sequence.beats.is_empty());
        assert_eq!(sequence.beats[0], 0.5);
        assert_eq!(sequence.alignment_score, 0.5);
    }

    #[test]
    fn test_short_audio_uses_synthetic_grid() {
        let curve = TempoCurve::constant(120.0);
        let sequence = sequence_beats(&[], &curve, 0.4);
        assert_eq!(sequence.source, BeatSource::SyntheticGrid);
        assert_eq!(sequence.beats, vec![0.0]);
    }

    #[test]
    fn test_sequence_tempo() {
        assert!((sequence_tempo(&[0.0, 0.5, 1.0, 1.5], 90.0) - 120.0).abs() < 1e-3);
        assert_eq!(sequence_tempo(&[1.0], 90.0), 90.0);
    }
}
