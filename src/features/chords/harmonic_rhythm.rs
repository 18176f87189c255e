//! Harmonic rhythm: how each chord sits on the beat grid
//!
//! For every consolidated chord segment this reports how many beats and bars it spans,
//! where in the bar it starts, a coarse rhythmic role and the mean strength of its beats.

use serde::{Deserialize, Serialize};

use super::ChordSegment;
use crate::features::beat_tracking::NEUTRAL_BEAT_STRENGTH;
use crate::features::stats;

/// Chords shorter than this (seconds) are passing chords regardless of beat count
const PASSING_DURATION: f32 = 0.5;

/// Below this tempo every chord spans at least two beats
const BALLAD_BPM: f32 = 80.0;

/// Beat grid a chord timeline is aligned against
#[derive(Debug, Clone, Copy)]
pub struct RhythmContext<'a> {
    pub bpm: f32,
    pub beats: &'a [f32],
    pub downbeats: &'a [f32],
    pub beats_per_measure: usize,
    pub beat_strengths: &'a [f32],
}

/// Rhythmic role of a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordRole {
    /// Shorter than half a second
    Passing,
    /// One beat
    Accent,
    /// Two beats
    Brief,
    /// Three or four beats
    Standard,
    /// More than four beats
    Sustained,
}

impl ChordRole {
    fn classify(beats: usize, duration: f32) -> Self {
        if duration < PASSING_DURATION {
            return ChordRole::Passing;
        }
        match beats {
            0 | 1 => ChordRole::Accent,
            2 => ChordRole::Brief,
            3 | 4 => ChordRole::Standard,
            _ => ChordRole::Sustained,
        }
    }
}

/// One chord annotated with its place in the rhythm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordRhythm {
    pub chord: String,
    pub start: f32,
    pub end: f32,
    pub duration: f32,
    /// Beats inside the chord (estimated from tempo when none fall inside)
    pub beats: usize,
    /// Downbeats inside the chord
    pub measures: usize,
    /// 1-based position in the bar of the chord's start
    pub beat_position: usize,
    pub role: ChordRole,
    /// Mean onset strength of the chord's beats
    pub strength: f32,
}

/// Merge consecutive segments with identical labels
pub fn consolidate(segments: &[ChordSegment]) -> Vec<ChordSegment> {
    let mut out: Vec<ChordSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match out.last_mut() {
            Some(prev) if prev.chord == segment.chord => prev.end = segment.end,
            _ => out.push(segment.clone()),
        }
    }
    out
}

fn beat_position(start: f32, context: &RhythmContext<'_>) -> usize {
    let Some(&last_downbeat) = context.downbeats.iter().rev().find(|&&d| d <= start) else {
        return 1;
    };
    let since = context
        .beats
        .iter()
        .filter(|&&b| b > last_downbeat && b <= start)
        .count();
    since % context.beats_per_measure.max(1) + 1
}

fn analyze_segment(segment: &ChordSegment, context: &RhythmContext<'_>) -> ChordRhythm {
    let (start, end) = (segment.start, segment.end);
    let duration = segment.duration();

    let inside: Vec<usize> = context
        .beats
        .iter()
        .enumerate()
        .filter(|(_, &b)| b >= start && b <= end)
        .map(|(i, _)| i)
        .collect();

    let mut beats = inside.len();
    if beats == 0 {
        beats = ((duration * context.bpm / 60.0).round() as usize).max(1);
    }
    if context.bpm < BALLAD_BPM {
        beats = beats.max(2);
    }

    let measures = context
        .downbeats
        .iter()
        .filter(|&&d| d >= start && d <= end)
        .count();

    let strengths: Vec<f32> = inside
        .iter()
        .filter_map(|&i| context.beat_strengths.get(i).copied())
        .collect();
    let strength = stats::mean(&strengths).unwrap_or(NEUTRAL_BEAT_STRENGTH);

    ChordRhythm {
        chord: segment.chord.clone(),
        start,
        end,
        duration,
        beats,
        measures,
        beat_position: beat_position(start, context),
        role: ChordRole::classify(beats, duration),
        strength,
    }
}

/// Annotate a smoothed chord timeline with beat and bar information
///
/// # Arguments
///
/// * `segments` - Chord segments, ascending in time
/// * `context` - Beat grid from rhythm analysis
///
/// # Returns
///
/// One entry per consolidated segment; empty when there are no segments or no beats
pub fn analyze_harmonic_rhythm(segments: &[ChordSegment], context: &RhythmContext<'_>) -> Vec<ChordRhythm> {
    if segments.is_empty() || context.beats.is_empty() {
        return Vec::new();
    }

    let annotated: Vec<ChordRhythm> = consolidate(segments)
        .iter()
        .map(|segment| analyze_segment(segment, context))
        .collect();

    log::debug!("Harmonic rhythm for {} chords", annotated.len());
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(bpm: f32, n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * 60.0 / bpm).collect()
    }

    #[test]
    fn test_consolidate() {
        let segments = vec![
            ChordSegment::new(0.0, 1.0, "C"),
            ChordSegment::new(1.0, 2.0, "C"),
            ChordSegment::new(2.0, 3.0, "G"),
        ];
        let merged = consolidate(&segments);
        assert_eq!(merged, vec![ChordSegment::new(0.0, 2.0, "C"), ChordSegment::new(2.0, 3.0, "G")]);
    }

    #[test]
    fn test_roles_and_counts() {
        // 120 BPM, beats every 0.5s, bars of 4 starting at 0
        let beats = grid(120.0, 33);
        let downbeats: Vec<f32> = beats.iter().step_by(4).copied().collect();
        let strengths = vec![0.8; beats.len()];
        let context = RhythmContext {
            bpm: 120.0,
            beats: &beats,
            downbeats: &downbeats,
            beats_per_measure: 4,
            beat_strengths: &strengths,
        };
        let segments = vec![
            ChordSegment::new(0.0, 1.75, "C"),  // beats 0, 0.5, 1.0, 1.5
            ChordSegment::new(1.75, 2.1, "G"),  // 2.0 only, but short
            ChordSegment::new(2.1, 2.7, "Am"),  // 2.5
            ChordSegment::new(2.7, 3.6, "F"),   // 3.0, 3.5
            ChordSegment::new(3.6, 16.0, "C"),  // many
        ];
        let rhythm = analyze_harmonic_rhythm(&segments, &context);
        assert_eq!(rhythm.len(), 5);

        assert_eq!(rhythm[0].beats, 4);
        assert_eq!(rhythm[0].measures, 1);
        assert_eq!(rhythm[0].beat_position, 1);
        assert_eq!(rhythm[0].role, ChordRole::Standard);

        assert_eq!(rhythm[1].role, ChordRole::Passing);
        assert_eq!(rhythm[1].beats, 1);
        assert_eq!(rhythm[1].measures, 1, "downbeat at 2.0");
        // Beats after the downbeat at 0.0 up to 1.75: 0.5, 1.0, 1.5
        assert_eq!(rhythm[1].beat_position, 4);

        assert_eq!(rhythm[2].role, ChordRole::Accent);
        assert_eq!(rhythm[2].beat_position, 1, "downbeat 2.0, no beats in (2.0, 2.1]");

        assert_eq!(rhythm[3].role, ChordRole::Brief);
        assert_eq!(rhythm[3].beat_position, 2, "beat 2.5 after downbeat 2.0");

        assert_eq!(rhythm[4].role, ChordRole::Sustained);
        assert!(rhythm.iter().all(|r| (r.strength - 0.8).abs() < 1e-6));
    }

    #[test]
    fn test_estimated_beats_without_grid_coverage() {
        let beats = grid(120.0, 4);
        let context = RhythmContext {
            bpm: 120.0,
            beats: &beats,
            downbeats: &[],
            beats_per_measure: 4,
            beat_strengths: &[],
        };
        let segments = vec![ChordSegment::new(10.0, 11.6, "D")];
        let rhythm = analyze_harmonic_rhythm(&segments, &context);
        assert_eq!(rhythm[0].beats, 3, "round(1.6 * 2)");
        assert_eq!(rhythm[0].measures, 0);
        assert_eq!(rhythm[0].beat_position, 1);
        assert_eq!(rhythm[0].strength, 0.5);
    }

    #[test]
    fn test_ballad_minimum_two_beats() {
        let beats = grid(70.0, 20);
        let context = RhythmContext {
            bpm: 70.0,
            beats: &beats,
            downbeats: &[],
            beats_per_measure: 4,
            beat_strengths: &[],
        };
        let segments = vec![ChordSegment::new(0.9, 1.6, "Em")];
        let rhythm = analyze_harmonic_rhythm(&segments, &context);
        assert_eq!(rhythm[0].beats, 2);
        assert_eq!(rhythm[0].role, ChordRole::Brief);
    }

    #[test]
    fn test_no_beats_gives_no_annotation() {
        let context = RhythmContext {
            bpm: 120.0,
            beats: &[],
            downbeats: &[],
            beats_per_measure: 4,
            beat_strengths: &[],
        };
        assert!(analyze_harmonic_rhythm(&[ChordSegment::new(0.0, 1.0, "C")], &context).is_empty());
    }
}
