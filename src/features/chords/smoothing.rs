//! BPM-aware chord smoothing
//!
//! Frame-level classifiers flicker at chord changes: transition frames briefly match a
//! competing template. Two strategies remove that noise using the song's tempo:
//!
//! - **Frame streams** (`smooth_frames`): drop "N" and low-confidence frames, then drop
//!   frames that arrive too soon (in beats) after the last kept frame. Thresholds grow
//!   with `simplicity_preference`.
//! - **Segment lists** (`smooth_segments`): merge segments shorter than fixed fractions of
//!   a beat into their neighbours, including A-B-A sandwiches and short passing chords.
//!   The pass repeats until nothing changes, so smoothing its own output is a no-op.
//!
//! Output never contains "N" and never has two adjacent segments with the same label.
//!
//! # Example
//!
//! ```
//! use cadenza_dsp::features::chords::{smooth_segments, ChordSegment};
//!
//! let raw = vec![
//!     ChordSegment::new(0.0, 0.3, "C"),
//!     ChordSegment::new(0.3, 0.5, "G"),
//!     ChordSegment::new(0.5, 4.0, "C"),
//! ];
//! let smoothed = smooth_segments(&raw, 120.0)?;
//! assert_eq!(smoothed, vec![ChordSegment::new(0.0, 4.0, "C")]);
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

use super::label::{harmonically_similar, is_no_chord, is_transitional};
use super::{ChordFrame, ChordSegment, RawChordTimeline};
use crate::error::AnalysisError;
use crate::features::stats;

/// Default minimum frame confidence
pub const DEFAULT_MIN_FRAME_CONFIDENCE: f32 = 0.7;

/// Frames below this confidence are dropped inside the short threshold
const STRONG_FRAME_CONFIDENCE: f32 = 0.8;

/// Preference above which the short threshold applies
const SHORT_PREFERENCE_GATE: f32 = 0.3;

/// Preference above which the medium threshold applies
const MEDIUM_PREFERENCE_GATE: f32 = 0.7;

/// Segment thresholds as fractions of one beat
const SEGMENT_VERY_SHORT_BEATS: f32 = 0.9;
const SEGMENT_SHORT_BEATS: f32 = 1.4;
const SEGMENT_MEDIUM_BEATS: f32 = 2.2;

/// Duration thresholds for one smoothing strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingThresholds {
    pub very_short: f32,
    pub short: f32,
    pub medium: f32,
}

impl SmoothingThresholds {
    /// Frame-stream thresholds in beats
    ///
    /// very short `0.5 + 0.4p`, short `1.0 + 0.8p`, medium `1.5 + 1.0p`
    pub fn for_frames(simplicity_preference: f32) -> Self {
        let p = simplicity_preference;
        Self {
            very_short: 0.5 + 0.4 * p,
            short: 1.0 + 0.8 * p,
            medium: 1.5 + 1.0 * p,
        }
    }

    /// Segment thresholds in seconds for a tempo
    pub fn for_segments(bpm: f32) -> Self {
        let beat = 60.0 / bpm;
        Self {
            very_short: SEGMENT_VERY_SHORT_BEATS * beat,
            short: SEGMENT_SHORT_BEATS * beat,
            medium: SEGMENT_MEDIUM_BEATS * beat,
        }
    }
}

fn validate_bpm(bpm: f32) -> Result<(), AnalysisError> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "BPM must be positive for chord smoothing, got {}",
            bpm
        )));
    }
    Ok(())
}

fn validate_preference(simplicity_preference: f32) -> Result<(), AnalysisError> {
    if !(0.0..=1.0).contains(&simplicity_preference) {
        return Err(AnalysisError::InvalidInput(format!(
            "Simplicity preference must be in [0, 1], got {}",
            simplicity_preference
        )));
    }
    Ok(())
}

/// Smooth a frame stream into segments
///
/// # Arguments
///
/// * `frames` - Classifier frames, ascending in time
/// * `bpm` - Song tempo
/// * `simplicity_preference` - 0.0 keeps short changes, 1.0 shows only stable chords
/// * `min_confidence` - Frames below this confidence are ignored (normally 0.7)
///
/// # Returns
///
/// Segments from each surviving frame to the next; the last one ends one median frame
/// step after the last input frame.
///
/// # Errors
///
/// `InvalidInput` for a non-positive BPM or a preference outside [0, 1]
pub fn smooth_frames(
    frames: &[ChordFrame],
    bpm: f32,
    simplicity_preference: f32,
    min_confidence: f32,
) -> Result<Vec<ChordSegment>, AnalysisError> {
    validate_bpm(bpm)?;
    validate_preference(simplicity_preference)?;

    let thresholds = SmoothingThresholds::for_frames(simplicity_preference);
    let beats_per_second = bpm / 60.0;

    let mut kept: Vec<&ChordFrame> = Vec::new();
    for frame in frames {
        if is_no_chord(&frame.chord) || frame.confidence < min_confidence {
            continue;
        }

        let Some(last) = kept.last() else {
            kept.push(frame);
            continue;
        };

        let gap_beats = (frame.time - last.time) * beats_per_second;
        let similar = harmonically_similar(&last.chord, &frame.chord);

        let drop = if gap_beats < thresholds.very_short {
            true
        } else if gap_beats < thresholds.short && simplicity_preference > SHORT_PREFERENCE_GATE {
            frame.confidence < STRONG_FRAME_CONFIDENCE || similar
        } else if gap_beats < thresholds.medium && simplicity_preference > MEDIUM_PREFERENCE_GATE {
            similar
        } else {
            false
        };

        if !drop {
            kept.push(frame);
        }
    }

    kept.dedup_by(|next, prev| next.chord == prev.chord);

    let Some(last_input) = frames.last() else {
        return Ok(Vec::new());
    };
    let times: Vec<f32> = frames.iter().map(|f| f.time).collect();
    let step = stats::median(&stats::diff(&times))
        .filter(|&s| s > 0.0)
        .unwrap_or(60.0 / bpm);
    let final_end = last_input.time + step;

    let segments = kept
        .iter()
        .enumerate()
        .map(|(i, frame)| ChordSegment {
            start: frame.time,
            end: kept.get(i + 1).map_or(final_end, |next| next.time),
            chord: frame.chord.clone(),
            confidence: frame.confidence,
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Frame smoothing: {} frames -> {} segments (preference {:.2})",
        frames.len(),
        segments.len(),
        simplicity_preference
    );

    Ok(segments)
}

/// One forward pass of segment smoothing
///
/// Builds a new list; merges extend the last kept segment, and merges before anything
/// was kept are remembered as a pending start for the next kept segment.
fn segment_pass(segments: &[ChordSegment], thresholds: &SmoothingThresholds) -> Vec<ChordSegment> {
    let mut out: Vec<ChordSegment> = Vec::with_capacity(segments.len());
    let mut pending_start: Option<f32> = None;
    let mut i = 0;

    while i < segments.len() {
        let current = &segments[i];
        let duration = current.duration();
        let next = segments.get(i + 1);

        if let Some(prev) = out.last_mut() {
            if duration < thresholds.short {
                prev.end = current.end;
                i += 1;
                continue;
            }

            if duration < thresholds.medium {
                if let Some(next) = next.filter(|n| n.chord == prev.chord) {
                    // A-B-A sandwich: absorb both B and the second A
                    prev.end = next.end;
                    i += 2;
                    continue;
                }
                let passing = is_transitional(&current.chord, &prev.chord)
                    || next.map_or(false, |n| is_transitional(&current.chord, &n.chord));
                if passing {
                    prev.end = current.end;
                    i += 1;
                    continue;
                }
            }
        } else if duration < thresholds.short {
            // Nothing to merge into yet: the next kept segment starts here instead
            pending_start.get_or_insert(current.start);
            i += 1;
            continue;
        }

        let mut kept = current.clone();
        if let Some(start) = pending_start.take() {
            kept.start = start;
        }
        match out.last_mut() {
            Some(prev) if prev.chord == kept.chord => prev.end = kept.end,
            _ => out.push(kept),
        }
        i += 1;
    }

    if out.is_empty() {
        // Every segment was too short: keep the longest over the whole span
        let longest = segments.iter().fold(None::<&ChordSegment>, |best, s| match best {
            Some(b) if b.duration() >= s.duration() => Some(b),
            _ => Some(s),
        });
        if let (Some(longest), Some(first), Some(last)) = (longest, segments.first(), segments.last()) {
            out.push(ChordSegment {
                start: first.start,
                end: last.end,
                ..longest.clone()
            });
        }
    }

    out
}

/// Smooth a pre-segmented chord list
///
/// Thresholds are fixed fractions of one beat: very short 0.9, short 1.4, medium 2.2.
/// Segments shorter than "short" merge into the previous kept segment (or, at the start,
/// into the next one). Segments shorter than "medium" merge when they sit between two
/// segments with the same label, or when their root moves to a neighbour's root by a
/// transitional interval. "N" segments are removed first.
///
/// # Errors
///
/// `InvalidInput` for a non-positive BPM
pub fn smooth_segments(segments: &[ChordSegment], bpm: f32) -> Result<Vec<ChordSegment>, AnalysisError> {
    validate_bpm(bpm)?;
    let thresholds = SmoothingThresholds::for_segments(bpm);

    let mut current: Vec<ChordSegment> = segments
        .iter()
        .filter(|s| !is_no_chord(&s.chord))
        .cloned()
        .collect();

    // Each pass that changes anything removes at least one segment
    loop {
        let next = segment_pass(&current, &thresholds);
        let done = next.len() == current.len();
        current = next;
        if done {
            break;
        }
    }

    log::debug!("Segment smoothing: {} -> {} segments", segments.len(), current.len());
    Ok(current)
}

/// Smooth any raw timeline with the matching strategy
pub fn smooth_timeline(
    raw: &RawChordTimeline,
    bpm: f32,
    simplicity_preference: f32,
    min_confidence: f32,
) -> Result<Vec<ChordSegment>, AnalysisError> {
    match raw {
        RawChordTimeline::Frames(frames) => {
            smooth_frames(frames, bpm, simplicity_preference, min_confidence)
        }
        RawChordTimeline::Segments(segments) => {
            validate_preference(simplicity_preference)?;
            smooth_segments(segments, bpm)
        }
    }
}
