//! # Cadenza DSP
//!
//! Rhythm and chord-timeline analysis for music audio: tempo, beats, downbeats, time
//! signature, tempo track and rhythm descriptors, plus BPM-aware cleanup of a chord
//! classifier's raw output.
//!
//! ## Features
//!
//! - **Onsets**: Multi-band onset-strength envelopes with spectral-flux, energy and
//!   synthetic-grid fallbacks
//! - **Tempo**: Sliding-window interval histograms with outlier filtering
//! - **Beats**: Onset-guided beat walking, subdivision and octave-error correction
//! - **Meter**: 2/4, 3/4, 4/4 and 6/8 scoring with downbeats
//! - **Chords**: Frame or segment smoothing with thresholds in beats, harmonic-rhythm
//!   annotation, and a pluggable classifier behind a caller-owned detector
//!
//! ## Quick Start
//!
//! ```no_run
//! use cadenza_dsp::{analyze_rhythm, AnalysisConfig};
//!
//! // Load audio samples (mono, f32, typically 22050 Hz)
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 22050;
//!
//! let result = analyze_rhythm(&samples, sample_rate, AnalysisConfig::default())?;
//!
//! println!("BPM: {:.1} (confidence: {:.2})", result.tempo_bpm, result.confidence);
//! println!("Meter: {}/4, {} beats", result.time_signature_numerator, result.beats.len());
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Audio → Onsets → Tempo track → Beats → Subdivision → Meter → Octave check → RhythmResult
//!                                                                                  ↓
//!               Chord classifier → raw timeline → Smoothing → Harmonic rhythm → ChordAnalysis
//! ```
//!
//! Every recoverable problem (too few onsets, no tempo evidence, no beat walk) is handled
//! by a fallback that is recorded in [`RhythmMetadata`]; only invalid input is an error.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;

// Re-export main types
pub use analysis::confidence::{compute_confidence, RhythmConfidence};
pub use analysis::metadata::RhythmMetadata;
pub use analysis::result::{AnalysisFlag, RhythmResult, TrackAnalysis};
pub use config::{
    AnalysisConfig, ChordConfig, RhythmEngine, DEFAULT_CHORD_SAMPLE_RATE, DEFAULT_RHYTHM_SAMPLE_RATE,
};
pub use error::AnalysisError;
pub use features::chords::{
    ChordAnalysis, ChordClassifier, ChordDetector, ChordFrame, ChordSegment, RawChordTimeline,
    TemplateChordClassifier,
};

fn validate_waveform(samples: &[f32], sample_rate: u32) -> Result<(), AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }
    if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
        return Err(AnalysisError::NumericalError(format!(
            "Non-finite sample at index {}",
            i
        )));
    }
    Ok(())
}

/// Main rhythm analysis function
///
/// Analyzes a mono waveform and returns tempo, beats, downbeats, meter, tempo track and
/// rhythm descriptors.
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz (typically 22050)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// A complete `RhythmResult`. Low-evidence input (silence, very short audio) still gets
/// a beat grid, with low confidence and the engaged fallbacks listed in its metadata.
///
/// # Errors
///
/// * `InvalidInput` for empty samples, a zero sample rate or invalid configuration
/// * `NumericalError` for NaN or infinite samples
///
/// # Example
///
/// ```no_run
/// use cadenza_dsp::{analyze_rhythm, AnalysisConfig};
///
/// let samples = vec![0.0f32; 22050 * 30]; // 30 seconds of silence
/// let result = analyze_rhythm(&samples, 22050, AnalysisConfig::default())?;
/// assert!(!result.beats.is_empty());
/// # Ok::<(), cadenza_dsp::AnalysisError>(())
/// ```
pub fn analyze_rhythm(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<RhythmResult, AnalysisError> {
    log::debug!("Starting rhythm analysis: {} samples at {} Hz", samples.len(), sample_rate);

    validate_waveform(samples, sample_rate)?;
    config.validate()?;

    analysis::pipeline::run(samples, sample_rate, &config)
}

/// Rhythm analysis followed by chord detection on the same audio
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Rhythm configuration
/// * `detector` - An initialized chord detector
///
/// # Errors
///
/// Rhythm contract errors, `NotInitialized` for an uninitialized detector, and
/// classifier errors
pub fn analyze_track<C: ChordClassifier>(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
    detector: &ChordDetector<C>,
) -> Result<TrackAnalysis, AnalysisError> {
    if !detector.is_ready() {
        return Err(AnalysisError::NotInitialized(
            "Chord detector must be initialized before analyze_track".to_string(),
        ));
    }
    let rhythm = analyze_rhythm(samples, sample_rate, config)?;
    let chords = detector.detect(samples, sample_rate, &rhythm)?;
    Ok(TrackAnalysis { rhythm, chords })
}
