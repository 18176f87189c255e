//! Basic rhythm engine
//!
//! Degraded analysis for when the enhanced engine cannot run (audio shorter than one
//! STFT frame) or is deselected in the configuration:
//!
//! 1. Energy-flux onsets (2048-sample frames, 512 hop, -30 dB threshold)
//! 2. Tempo from the median inter-onset interval between 0.3 s and 1.5 s, 120 BPM otherwise
//! 3. Constant beat grid from the first onset (or 0.0), thinned to the 200 ms minimum gap
//!
//! Results carry fixed, explicitly low confidences: 0.5 (0.1 without any onset), meter
//! 4/4 at 0.3, neutral stability, strengths and complexity.

use super::result::RhythmResult;
use crate::error::AnalysisError;
use crate::features::beat_tracking::sequencer::enforce_min_gap;
use crate::features::beat_tracking::BeatSource;
use crate::features::onset::energy_flux::detect_energy_flux_onsets;
use crate::features::onset::synthetic_grid::regular_grid;
use crate::features::onset::OnsetSource;
use crate::features::stats;
use crate::features::tempo::TempoSource;
use crate::config::RhythmEngine;

const BASIC_FRAME_SIZE: usize = 2048;
const BASIC_HOP_SIZE: usize = 512;
const BASIC_THRESHOLD_DB: f32 = -30.0;

/// Inter-onset intervals outside this range are ignored for tempo
const INTERVAL_RANGE: (f32, f32) = (0.3, 1.5);

/// Tempo when no interval qualifies
pub const BASIC_DEFAULT_BPM: f32 = 120.0;

/// Confidence when not a single onset was found
const NO_ONSET_CONFIDENCE: f32 = 0.1;

/// Beats per bar assumed by the basic engine
const BASIC_NUMERATOR: usize = 4;

/// Median inter-onset tempo, if any interval falls in the usable range
pub fn median_interval_tempo(onsets: &[f32]) -> Option<f32> {
    let intervals: Vec<f32> = stats::diff(onsets)
        .into_iter()
        .filter(|i| (INTERVAL_RANGE.0..=INTERVAL_RANGE.1).contains(i))
        .collect();
    stats::median(&intervals).map(|m| 60.0 / m)
}

/// Run the basic engine
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `bpm_override` - Fixed tempo replacing the interval estimate
///
/// # Errors
///
/// Only contract errors (zero sample rate) from the onset detector
pub fn analyze_basic(
    samples: &[f32],
    sample_rate: u32,
    bpm_override: Option<f32>,
) -> Result<RhythmResult, AnalysisError> {
    let duration = samples.len() as f32 / sample_rate as f32;
    let onsets = detect_energy_flux_onsets(
        samples,
        sample_rate,
        BASIC_FRAME_SIZE,
        BASIC_HOP_SIZE,
        BASIC_THRESHOLD_DB,
    )?;

    let (bpm, tempo_source) = match (bpm_override, median_interval_tempo(&onsets)) {
        (Some(bpm), _) => (bpm, TempoSource::Override),
        (None, Some(bpm)) => (bpm, TempoSource::GlobalMedian),
        (None, None) => (BASIC_DEFAULT_BPM, TempoSource::Default),
    };

    let start = onsets.first().copied().unwrap_or(0.0);
    let mut beats = enforce_min_gap(&regular_grid(start, bpm, duration));
    if beats.is_empty() {
        beats.push(start.min(duration));
    }

    log::info!(
        "Basic rhythm engine: {} onsets, {:.1} BPM ({:?}), {} beats",
        onsets.len(),
        bpm,
        tempo_source,
        beats.len()
    );

    let mut result = RhythmResult::from_grid(bpm, beats, BASIC_NUMERATOR);
    if onsets.is_empty() {
        result.confidence = NO_ONSET_CONFIDENCE;
    }
    result.tempo_track[0].time = duration * 0.5;

    let metadata = &mut result.metadata;
    metadata.duration_seconds = duration;
    metadata.sample_rate = sample_rate;
    metadata.engine = RhythmEngine::Basic;
    metadata.onset_source = if onsets.is_empty() {
        OnsetSource::None
    } else {
        OnsetSource::EnergyEnvelope
    };
    metadata.onset_count = onsets.len();
    metadata.tempo_source = tempo_source;
    metadata.beat_source = BeatSource::SyntheticGrid;
    metadata.raw_bpm = bpm;

    Ok(result)
}
