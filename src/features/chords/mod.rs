//! Chord timeline modules
//!
//! Clean up a frame-level chord classifier's output into a readable, rhythm-aware chord
//! timeline:
//! - Chord label parsing and harmonic relations (`label`)
//! - BPM-aware smoothing of frame streams and segment lists (`smoothing`)
//! - Beat and measure annotation of chord segments (`harmonic_rhythm`)
//! - The classifier seam and a chroma-template reference classifier (`classifier`,
//!   `templates`)
//! - A caller-owned detector composing classifier and smoother (`detector`)
//!
//! Records use one canonical shape. Alternative field spellings found in external data
//! (`startTime`, `start_time`, `label`, ...) are accepted when deserializing and never
//! appear past that boundary.

pub mod classifier;
pub mod detector;
pub mod harmonic_rhythm;
pub mod label;
pub mod smoothing;
pub mod templates;

use serde::{Deserialize, Serialize};

pub use classifier::{ChordClassifier, TemplateChordClassifier};
pub use detector::{ChordAnalysis, ChordDetector};
pub use harmonic_rhythm::{analyze_harmonic_rhythm, ChordRhythm, ChordRole, RhythmContext};
pub use label::NO_CHORD;
pub use smoothing::{smooth_frames, smooth_segments, smooth_timeline};

fn default_confidence() -> f32 {
    1.0
}

/// A chord held over a time span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    /// Start time in seconds
    #[serde(alias = "startTime", alias = "start_time")]
    pub start: f32,

    /// End time in seconds
    #[serde(alias = "endTime", alias = "end_time")]
    pub end: f32,

    /// Chord label, e.g. "C", "F#m", "G7"
    #[serde(alias = "label")]
    pub chord: String,

    /// Classifier confidence (0.0-1.0); 1.0 when the source carries none
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl ChordSegment {
    /// Segment with full confidence
    pub fn new(start: f32, end: f32, chord: impl Into<String>) -> Self {
        Self {
            start,
            end,
            chord: chord.into(),
            confidence: default_confidence(),
        }
    }

    /// Length in seconds
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }

    /// True if `time` falls in `[start, end)`
    pub fn contains(&self, time: f32) -> bool {
        self.start <= time && time < self.end
    }
}

/// One classifier frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordFrame {
    /// Frame time in seconds
    #[serde(alias = "timestamp")]
    pub time: f32,

    /// Chord label, "N" for no chord
    #[serde(alias = "label")]
    pub chord: String,

    /// Classifier confidence (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl ChordFrame {
    pub fn new(time: f32, chord: impl Into<String>, confidence: f32) -> Self {
        Self {
            time,
            chord: chord.into(),
            confidence,
        }
    }
}

/// Raw classifier output, either per frame or already segmented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChordTimeline {
    /// Fixed-rate classifier frames
    Frames(Vec<ChordFrame>),
    /// Pre-segmented spans
    Segments(Vec<ChordSegment>),
}

impl RawChordTimeline {
    /// Number of frames or segments
    pub fn len(&self) -> usize {
        match self {
            RawChordTimeline::Frames(f) => f.len(),
            RawChordTimeline::Segments(s) => s.len(),
        }
    }

    /// True when there is nothing to smooth
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chord sounding at `time`, if any
///
/// Uses half-open intervals, so at a boundary the later segment wins. `segments` must be
/// sorted by start time and non-overlapping.
pub fn chord_at(segments: &[ChordSegment], time: f32) -> Option<&ChordSegment> {
    let idx = segments.partition_point(|s| s.start <= time);
    idx.checked_sub(1)
        .map(|i| &segments[i])
        .filter(|s| s.contains(time))
}
