//! Confidence scoring module
//!
//! Two jobs:
//!
//! 1. **Raw tempo confidence** for the enhanced engine, before octave validation: the
//!    winning beat sequence's onset alignment, discounted by how far down the onset
//!    fallback chain the pipeline had to go, and capped when the tempo is the fixed
//!    default.
//! 2. **Result summary** (`compute_confidence`): tempo, meter and grid confidences, a
//!    weighted overall score, and flags for the caller.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::{analyze_rhythm, AnalysisConfig};
//! use cadenza_dsp::analysis::confidence::compute_confidence;
//!
//! let samples = vec![0.0f32; 22050 * 30];
//! let result = analyze_rhythm(&samples, 22050, AnalysisConfig::default())?;
//! let confidence = compute_confidence(&result);
//!
//! println!("Overall confidence: {:.2} ({})", confidence.overall_confidence, confidence.confidence_level());
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};

use super::result::{AnalysisFlag, RhythmResult};
use crate::features::onset::OnsetSource;
use crate::features::tempo::TempoSource;

/// Ceiling on raw confidence when no tempo evidence was found
const DEFAULT_TEMPO_CONFIDENCE_CAP: f32 = 0.3;

/// Tempo confidence below this raises `LowTempoConfidence`
const LOW_TEMPO_CONFIDENCE: f32 = 0.3;

/// Meter confidence below this raises `AmbiguousMeter`
const AMBIGUOUS_METER_CONFIDENCE: f32 = 0.5;

/// Tempo stability below this raises `TempoVariation`
const UNSTABLE_TEMPO: f32 = 0.5;

/// Trust placed in each onset detector's output
pub fn onset_source_factor(source: OnsetSource) -> f32 {
    match source {
        OnsetSource::MultiBand => 1.0,
        OnsetSource::SpectralFlux => 0.9,
        OnsetSource::EnergyEnvelope => 0.7,
        OnsetSource::SyntheticGrid => 0.3,
        OnsetSource::None => 0.2,
    }
}

/// Tempo confidence handed to the octave validator
///
/// # Arguments
///
/// * `alignment_score` - Normalized onset alignment of the winning beat sequence
/// * `onset_source` - Detector that produced the onsets
/// * `tempo_source` - How the tempo track was obtained
pub fn raw_tempo_confidence(alignment_score: f32, onset_source: OnsetSource, tempo_source: TempoSource) -> f32 {
    let confidence = (alignment_score * onset_source_factor(onset_source)).clamp(0.0, 1.0);
    if tempo_source == TempoSource::Default {
        confidence.min(DEFAULT_TEMPO_CONFIDENCE_CAP)
    } else {
        confidence
    }
}

/// Rhythm confidence summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmConfidence {
    /// Tempo confidence (0.0-1.0)
    pub tempo_confidence: f32,

    /// Meter confidence (0.0-1.0)
    pub meter_confidence: f32,

    /// Tempo stability of the beat grid (0.0-1.0); 0.0 without beats
    pub grid_stability: f32,

    /// Weighted combination: tempo 50%, grid 30%, meter 20%
    pub overall_confidence: f32,

    /// Flags from the pipeline plus confidence-based flags
    pub flags: Vec<AnalysisFlag>,
}

impl RhythmConfidence {
    /// Check if overall confidence is high (>= 0.7)
    pub fn is_high_confidence(&self) -> bool {
        self.overall_confidence >= 0.7
    }

    /// Check if overall confidence is low (< 0.5)
    pub fn is_low_confidence(&self) -> bool {
        self.overall_confidence < 0.5
    }

    /// "High", "Medium" or "Low"
    pub fn confidence_level(&self) -> &'static str {
        if self.is_high_confidence() {
            "High"
        } else if self.is_low_confidence() {
            "Low"
        } else {
            "Medium"
        }
    }
}

/// Summarize a rhythm result
pub fn compute_confidence(result: &RhythmResult) -> RhythmConfidence {
    let tempo_confidence = if result.tempo_bpm > 0.0 {
        result.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let meter_confidence = result.time_signature_confidence.clamp(0.0, 1.0);
    let grid_stability = if result.beats.is_empty() {
        0.0
    } else {
        result.tempo_stability.clamp(0.0, 1.0)
    };

    let overall_confidence =
        (tempo_confidence * 0.5 + grid_stability * 0.3 + meter_confidence * 0.2).clamp(0.0, 1.0);

    let mut flags = result.metadata.flags.clone();
    let mut raise = |flag: AnalysisFlag| {
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    };
    if tempo_confidence < LOW_TEMPO_CONFIDENCE {
        raise(AnalysisFlag::LowTempoConfidence);
    }
    if meter_confidence < AMBIGUOUS_METER_CONFIDENCE {
        raise(AnalysisFlag::AmbiguousMeter);
    }
    if grid_stability < UNSTABLE_TEMPO {
        raise(AnalysisFlag::TempoVariation);
    }

    log::debug!(
        "Confidence scores: tempo={:.3}, meter={:.3}, grid={:.3}, overall={:.3}",
        tempo_confidence,
        meter_confidence,
        grid_stability,
        overall_confidence
    );

    RhythmConfidence {
        tempo_confidence,
        meter_confidence,
        grid_stability,
        overall_confidence,
        flags,
    }
}
