//! Enhanced rhythm pipeline
//!
//! Stages run strictly in sequence, each consuming the previous stage's output:
//!
//! 1. Spectrogram and onset candidates (with their fallback chain)
//! 2. Sliding-window tempo track (or a constant track at the BPM override)
//! 3. Onset-guided beat sequence
//! 4. Subdivision correction of tempo and grid
//! 5. Time signature and downbeats
//! 6. Octave validation of the headline tempo; a tempo change resamples the grid and
//!    re-estimates the meter
//! 7. Stability, beat strength and complexity descriptors
//!
//! A signal too short for one STFT frame hands over to the basic engine.

use std::time::Instant;

use super::confidence::raw_tempo_confidence;
use super::fallback::analyze_basic;
use super::metadata::RhythmMetadata;
use super::result::{AnalysisFlag, RhythmResult};
use crate::config::{AnalysisConfig, RhythmEngine};
use crate::error::AnalysisError;
use crate::features::beat_tracking::sequencer::{enforce_min_gap, sequence_tempo};
use crate::features::beat_tracking::subdivision::apply_factor;
use crate::features::beat_tracking::{
    beat_strengths, correct_subdivision, detect_downbeats, detect_time_signature, rhythmic_complexity,
    sequence_beats, tempo_stability, validate_bpm, OctaveCorrection, OctaveCorrectionKind, OctavePolicy,
    TimeSignature,
};
use crate::features::onset::{extract_onsets, OnsetSource};
use crate::features::spectrogram::Spectrogram;
use crate::features::stats;
use crate::features::tempo::{track_tempo, TempoSource, TempoTrack};

/// Resample a beat grid to follow an octave correction of the tempo
pub fn resample_for_octave(beats: &[f32], kind: OctaveCorrectionKind) -> Vec<f32> {
    match kind {
        OctaveCorrectionKind::Half => apply_factor(beats, 0.5),
        OctaveCorrectionKind::Double => enforce_min_gap(&apply_factor(beats, 2.0)),
        OctaveCorrectionKind::Third => beats.iter().step_by(3).copied().collect(),
        OctaveCorrectionKind::Quarter => beats.iter().step_by(4).copied().collect(),
        OctaveCorrectionKind::None | OctaveCorrectionKind::BalladBoost => beats.to_vec(),
    }
}

/// Run the configured engine
///
/// Inputs are assumed to be validated by the caller (non-empty, finite, positive rate).
pub fn run(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Result<RhythmResult, AnalysisError> {
    let started = Instant::now();

    let mut result = match config.engine {
        RhythmEngine::Basic => analyze_basic(samples, sample_rate, config.bpm_override)?,
        RhythmEngine::Enhanced => {
            match Spectrogram::compute(samples, sample_rate, config.frame_size, config.hop_size) {
                Ok(spec) => analyze_enhanced(samples, sample_rate, &spec, config),
                Err(AnalysisError::ProcessingError(reason)) => {
                    let mut result = analyze_basic(samples, sample_rate, config.bpm_override)?;
                    result
                        .metadata
                        .warn(format!("Enhanced engine unavailable ({}), used basic engine", reason));
                    result.metadata.flag(AnalysisFlag::FallbackEngaged);
                    result
                }
                Err(e) => return Err(e),
            }
        }
    };

    result.metadata.processing_time_ms = started.elapsed().as_secs_f32() * 1000.0;

    log::info!(
        "Rhythm analysis complete: {:.1} BPM ({:.2}), {}/4, {} beats in {:.1} ms",
        result.tempo_bpm,
        result.confidence,
        result.time_signature_numerator,
        result.beats.len(),
        result.metadata.processing_time_ms
    );

    Ok(result)
}

/// Enhanced engine over a precomputed spectrogram
pub fn analyze_enhanced(
    samples: &[f32],
    sample_rate: u32,
    spec: &Spectrogram,
    config: &AnalysisConfig,
) -> RhythmResult {
    let duration = samples.len() as f32 / sample_rate as f32;
    let mut metadata = RhythmMetadata {
        duration_seconds: duration,
        sample_rate,
        engine: RhythmEngine::Enhanced,
        ..RhythmMetadata::default()
    };

    // Stage 1: onsets
    let detection = extract_onsets(samples, sample_rate, spec);
    metadata.onset_source = detection.source;
    metadata.onset_count = detection.onsets.len();
    match detection.source {
        OnsetSource::EnergyEnvelope | OnsetSource::SyntheticGrid | OnsetSource::None => {
            metadata.warn(format!("Onsets from fallback detector {:?}", detection.source));
        }
        OnsetSource::MultiBand | OnsetSource::SpectralFlux => {}
    }

    // Stage 2: tempo track
    let track = match config.bpm_override {
        Some(bpm) => TempoTrack::constant(bpm, duration, TempoSource::Override),
        None => track_tempo(&detection.onsets, duration),
    };
    metadata.tempo_source = track.source;
    if track.source == TempoSource::Default {
        metadata.warn("No tempo evidence, using the default tempo");
    }

    // Stage 3: beats
    let sequence = sequence_beats(&detection.onsets, &track.curve(), duration);
    metadata.beat_source = sequence.source;
    let raw_bpm = sequence_tempo(&sequence.beats, track.median_bpm());
    metadata.raw_bpm = raw_bpm;

    let raw_confidence = raw_tempo_confidence(sequence.alignment_score, detection.source, track.source);

    let (bpm, beats, correction) = match config.bpm_override {
        Some(bpm) => (
            bpm,
            sequence.beats,
            OctaveCorrection {
                bpm,
                confidence: 1.0,
                kind: OctaveCorrectionKind::None,
                probability: None,
            },
        ),
        None => {
            // Stage 4: subdivision
            let subdivided = correct_subdivision(raw_bpm, &sequence.beats);
            metadata.subdivision_factor = subdivided.factor;
            let beats = enforce_min_gap(&subdivided.beats);

            // Stage 6 runs on the subdivided grid's intervals
            let intervals = stats::diff(&beats);
            let correction = validate_bpm(subdivided.bpm, raw_confidence, &intervals, &OctavePolicy::default());
            let beats = if correction.kind.changes_tempo() {
                log::info!(
                    "Octave correction {:?}: {:.1} -> {:.1} BPM, resampling beats",
                    correction.kind,
                    subdivided.bpm,
                    correction.bpm
                );
                resample_for_octave(&beats, correction.kind)
            } else {
                beats
            };
            (correction.bpm, beats, correction)
        }
    };
    metadata.octave_correction = correction.kind;
    metadata.octave_probability = correction.probability;

    // Stage 5: meter on the final grid
    let intervals = stats::diff(&beats);
    let (signature, meter_confidence) = detect_time_signature(&beats, &intervals);
    let numerator = signature.reported_numerator();
    if signature == TimeSignature::SixEight {
        log::debug!("6/8 detected, reporting as 2/4 feel");
    }
    let downbeats = detect_downbeats(&beats, numerator);

    // Stage 7: descriptors
    let (_, stability) = tempo_stability(&beats);
    let strengths = beat_strengths(&beats, &detection.strength_envelope, sample_rate, spec.hop_size());
    let complexity = rhythmic_complexity(&intervals, &strengths);

    RhythmResult {
        tempo_bpm: bpm,
        confidence: correction.confidence.clamp(0.0, 1.0),
        beats,
        downbeats,
        beat_intervals: intervals,
        time_signature_numerator: numerator,
        time_signature_confidence: meter_confidence,
        tempo_track: track.points,
        tempo_stability: stability,
        beat_strength: strengths,
        rhythmic_complexity: complexity,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_for_octave() {
        let beats: Vec<f32> = (0..9).map(|i| i as f32).collect();
        assert_eq!(resample_for_octave(&beats, OctaveCorrectionKind::Half).len(), 5);
        assert_eq!(resample_for_octave(&beats, OctaveCorrectionKind::Double).len(), 17);
        assert_eq!(resample_for_octave(&beats, OctaveCorrectionKind::Third), vec![0.0, 3.0, 6.0]);
        assert_eq!(resample_for_octave(&beats, OctaveCorrectionKind::Quarter), vec![0.0, 4.0, 8.0]);
        assert_eq!(resample_for_octave(&beats, OctaveCorrectionKind::BalladBoost), beats);
    }

    #[test]
    fn test_double_respects_min_gap() {
        let beats = [0.0, 0.3, 0.6];
        let doubled = resample_for_octave(&beats, OctaveCorrectionKind::Double);
        for w in doubled.windows(2) {
            assert!(w[1] - w[0] > 0.2);
        }
    }

    #[test]
    fn test_short_signal_uses_basic_engine() {
        let samples = vec![0.0f32; 1000];
        let result = run(&samples, 22050, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.metadata.engine, RhythmEngine::Basic);
        assert!(result.fallback_engaged());
        assert!(!result.metadata.warnings.is_empty());
        assert!(!result.beats.is_empty());
    }

    #[test]
    fn test_explicit_basic_engine_is_not_a_fallback() {
        let samples = vec![0.0f32; 22050 * 3];
        let config = AnalysisConfig {
            engine: RhythmEngine::Basic,
            ..AnalysisConfig::default()
        };
        let result = run(&samples, 22050, &config).unwrap();
        assert_eq!(result.metadata.engine, RhythmEngine::Basic);
        assert!(!result.fallback_engaged());
    }
}
