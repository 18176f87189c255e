//! Rhythm analysis metadata

use serde::{Deserialize, Serialize};

use super::result::AnalysisFlag;
use crate::config::RhythmEngine;
use crate::features::beat_tracking::{BeatSource, OctaveCorrectionKind};
use crate::features::onset::OnsetSource;
use crate::features::tempo::TempoSource;

/// Where each stage's output came from
///
/// Every fallback the pipeline takes shows up here as a value rather than a log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Engine that produced the result
    pub engine: RhythmEngine,

    /// Onset detector that produced the candidate set
    pub onset_source: OnsetSource,

    /// Number of onset candidates
    pub onset_count: usize,

    /// How the tempo track was obtained
    pub tempo_source: TempoSource,

    /// How the beat sequence was obtained
    pub beat_source: BeatSource,

    /// Tempo implied by the beat sequence before any correction
    pub raw_bpm: f32,

    /// Subdivision factor applied (0.5, 1.0 or 2.0)
    pub subdivision_factor: f32,

    /// Octave correction applied to the headline tempo
    pub octave_correction: OctaveCorrectionKind,

    /// Octave-error probability of the last evaluated hypothesis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub octave_probability: Option<f32>,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,

    /// Human-readable notes on engaged fallbacks
    pub warnings: Vec<String>,
}

impl Default for RhythmMetadata {
    fn default() -> Self {
        Self {
            duration_seconds: 0.0,
            sample_rate: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            engine: RhythmEngine::Basic,
            onset_source: OnsetSource::None,
            onset_count: 0,
            tempo_source: TempoSource::Default,
            beat_source: BeatSource::SyntheticGrid,
            raw_bpm: 0.0,
            subdivision_factor: 1.0,
            octave_correction: OctaveCorrectionKind::None,
            octave_probability: None,
            flags: vec![],
            warnings: vec![],
        }
    }
}

impl RhythmMetadata {
    /// Record a warning, logging it as well
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Add a flag once
    pub fn flag(&mut self, flag: AnalysisFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}
