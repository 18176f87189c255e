//! Analysis result types

use serde::{Deserialize, Serialize};

use super::metadata::RhythmMetadata;
use crate::features::beat_tracking::{detect_downbeats, NEUTRAL_BEAT_STRENGTH, NEUTRAL_COMPLEXITY};
use crate::features::chords::{ChordAnalysis, RhythmContext};
use crate::features::stats;
use crate::features::tempo::TempoTrackPoint;

/// Confidence of a grid built without onset evidence
const GRID_CONFIDENCE: f32 = 0.5;

/// Meter confidence of a grid that never went through meter estimation
const GRID_METER_CONFIDENCE: f32 = 0.3;

/// Stability reported for a grid that was never measured
const GRID_STABILITY: f32 = 0.5;

/// Analysis flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// Tempo confidence below 0.3
    LowTempoConfidence,
    /// Meter estimation was close to a coin toss
    AmbiguousMeter,
    /// Track has tempo drift
    TempoVariation,
    /// The enhanced engine could not run and the basic engine answered instead
    FallbackEngaged,
}

/// Complete rhythm analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmResult {
    /// Headline tempo in BPM
    pub tempo_bpm: f32,

    /// Tempo confidence (0.0-1.0)
    pub confidence: f32,

    /// Beat times in seconds, increasing, gaps above 200 ms
    pub beats: Vec<f32>,

    /// Bar starts: every `time_signature_numerator`-th beat
    pub downbeats: Vec<f32>,

    /// Differences between consecutive beats
    pub beat_intervals: Vec<f32>,

    /// Beats per bar (2, 3 or 4; 6/8 is reported as 2)
    pub time_signature_numerator: usize,

    /// Meter confidence (0.0-1.0)
    pub time_signature_confidence: f32,

    /// Sparse tempo track from the sliding-window tracker
    pub tempo_track: Vec<TempoTrackPoint>,

    /// 1 - coefficient of variation of the smoothed instantaneous tempo (0.0-1.0)
    pub tempo_stability: f32,

    /// Onset strength at each beat (parallel to `beats`)
    pub beat_strength: Vec<f32>,

    /// Variation of intervals and strengths (0.0-1.0)
    pub rhythmic_complexity: f32,

    /// Provenance and diagnostics
    pub metadata: RhythmMetadata,
}

impl RhythmResult {
    /// Low-confidence result around a fixed beat grid
    ///
    /// Used by the basic engine: confidence 0.5, meter confidence 0.3, downbeats every
    /// `numerator`-th beat, neutral stability, strengths and complexity.
    pub fn from_grid(bpm: f32, beats: Vec<f32>, numerator: usize) -> Self {
        let downbeats = detect_downbeats(&beats, numerator);
        let beat_intervals = stats::diff(&beats);
        let duration = beats.last().copied().unwrap_or(0.0);
        Self {
            tempo_bpm: bpm,
            confidence: GRID_CONFIDENCE,
            downbeats,
            beat_intervals,
            time_signature_numerator: numerator,
            time_signature_confidence: GRID_METER_CONFIDENCE,
            tempo_track: vec![TempoTrackPoint {
                time: duration * 0.5,
                bpm,
            }],
            tempo_stability: GRID_STABILITY,
            beat_strength: vec![NEUTRAL_BEAT_STRENGTH; beats.len()],
            rhythmic_complexity: NEUTRAL_COMPLEXITY,
            beats,
            metadata: RhythmMetadata::default(),
        }
    }

    /// Beat grid view for chord alignment
    pub fn chord_context(&self) -> RhythmContext<'_> {
        RhythmContext {
            bpm: self.tempo_bpm,
            beats: &self.beats,
            downbeats: &self.downbeats,
            beats_per_measure: self.time_signature_numerator,
            beat_strengths: &self.beat_strength,
        }
    }

    /// Length of one beat in seconds
    pub fn beat_period(&self) -> f32 {
        60.0 / self.tempo_bpm
    }

    /// True when any fallback flag is set
    pub fn fallback_engaged(&self) -> bool {
        self.metadata.flags.contains(&AnalysisFlag::FallbackEngaged)
    }
}

/// Rhythm and chord analysis of one track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackAnalysis {
    /// Rhythm analysis
    pub rhythm: RhythmResult,
    /// Chord timeline aligned to `rhythm`
    pub chords: ChordAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_grid_shape() {
        let beats: Vec<f32> = (0..10).map(|i| i as f32 * 0.5).collect();
        let result = RhythmResult::from_grid(120.0, beats, 4);
        assert_eq!(result.downbeats, vec![0.0, 2.0, 4.0]);
        assert_eq!(result.beat_intervals.len(), 9);
        assert_eq!(result.beat_strength, vec![0.5; 10]);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.time_signature_confidence, 0.3);
        assert_eq!(result.tempo_track.len(), 1);
        assert!((result.beat_period() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_short_grid_keeps_first_downbeat() {
        let result = RhythmResult::from_grid(100.0, vec![0.1, 0.7], 4);
        assert_eq!(result.downbeats, vec![0.1]);
    }

    #[test]
    fn test_chord_context_borrows_grid() {
        let result = RhythmResult::from_grid(90.0, vec![0.0, 1.0, 2.0], 3);
        let context = result.chord_context();
        assert_eq!(context.beats.len(), 3);
        assert_eq!(context.beats_per_measure, 3);
        assert_eq!(context.bpm, 90.0);
    }

    #[test]
    fn test_serializes_with_flags() {
        let mut result = RhythmResult::from_grid(120.0, vec![0.0, 0.5], 4);
        result.metadata.flags.push(AnalysisFlag::FallbackEngaged);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"FallbackEngaged\""));
        assert!(result.fallback_engaged());
    }
}
