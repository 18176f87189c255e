//! Onset candidate extraction
//!
//! Produces a sorted, deduplicated list of onset times from a waveform through a chain of
//! detectors, each engaged only when the previous one found too little:
//!
//! 1. Multi-band onset-strength envelopes, peaks at three thresholds (`multi_band`)
//! 2. Spectral flux peaks added when fewer than 20 onsets were found (`spectral_flux`)
//! 3. Windowed energy peaks replace everything when fewer than 8 remain (`energy_flux`)
//! 4. A synthetic regular grid when the energy envelope has 10 peaks or fewer
//!    (`synthetic_grid`)
//!
//! Extraction never fails: the worst case is an empty onset list tagged
//! [`OnsetSource::None`], which the tempo tracker and beat sequencer handle with their
//! own fallbacks.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::onset::extract_onsets;
//! use cadenza_dsp::features::spectrogram::Spectrogram;
//!
//! let samples = vec![0.0f32; 22050 * 30];
//! let spec = Spectrogram::compute(&samples, 22050, 2048, 256)?;
//! let detection = extract_onsets(&samples, 22050, &spec);
//! println!("{} onsets via {:?}", detection.onsets.len(), detection.source);
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

pub mod energy_flux;
pub mod multi_band;
pub mod peak_picking;
pub mod spectral_flux;
pub mod synthetic_grid;
pub mod threshold;

use serde::{Deserialize, Serialize};

use crate::features::spectrogram::Spectrogram;
use multi_band::MultiBandEnvelopes;
use peak_picking::find_peaks;
use threshold::mean_plus_k_std;

/// Below this many multi-band onsets, spectral-flux onsets are added
pub const MIN_MULTI_BAND_ONSETS: usize = 20;

/// Below this many onsets, the energy envelope takes over
pub const MIN_SPECTRAL_ONSETS: usize = 8;

/// Peak thresholds on the combined envelope, in standard deviations above the mean
const THRESHOLD_LEVELS: [f32; 3] = [1.5, 1.0, 0.5];

/// Minimum distance between multi-band peaks in seconds
const MIN_PEAK_DISTANCE_SECONDS: f32 = 0.05;

/// Onsets closer than this are treated as duplicates
pub const DEDUP_TOLERANCE_SECONDS: f32 = 0.001;

/// Which detector produced the final onset set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnsetSource {
    /// Multi-band onset-strength peaks alone
    MultiBand,
    /// Multi-band peaks supplemented with spectral-flux peaks
    SpectralFlux,
    /// Windowed energy-envelope peaks
    EnergyEnvelope,
    /// Regular grid at a common tempo
    SyntheticGrid,
    /// No onsets at all
    None,
}

/// Result of onset extraction
#[derive(Debug, Clone)]
pub struct OnsetDetection {
    /// Onset times in seconds, ascending, no two within 1 ms
    pub onsets: Vec<f32>,

    /// Detector that produced `onsets`
    pub source: OnsetSource,

    /// Full-band onset-strength envelope (one value per STFT frame), used to weigh beats
    pub strength_envelope: Vec<f32>,
}

/// Sort ascending and drop onsets within 1 ms of the previous kept one
pub fn sort_and_dedup(mut onsets: Vec<f32>) -> Vec<f32> {
    onsets.retain(|t| t.is_finite());
    onsets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut out: Vec<f32> = Vec::with_capacity(onsets.len());
    for t in onsets {
        match out.last() {
            Some(&last) if t - last < DEDUP_TOLERANCE_SECONDS => {}
            _ => out.push(t),
        }
    }
    out
}

/// Peaks of the combined envelope at three threshold levels, as onset times
fn multi_band_onsets(combined: &[f32], spec: &Spectrogram) -> Vec<f32> {
    let min_distance =
        (MIN_PEAK_DISTANCE_SECONDS * spec.sample_rate() as f32 / spec.hop_size() as f32) as usize;

    let mut frames: Vec<usize> = THRESHOLD_LEVELS
        .iter()
        .flat_map(|&k| find_peaks(combined, mean_plus_k_std(combined, k), min_distance))
        .collect();
    frames.sort_unstable();
    frames.dedup();

    frames.into_iter().map(|f| spec.frame_time(f)).collect()
}

/// Extract onset candidates from a waveform
///
/// # Arguments
///
/// * `samples` - Mono audio samples (used by the energy fallback)
/// * `sample_rate` - Sample rate in Hz
/// * `spec` - Magnitude spectrogram of `samples`
///
/// # Returns
///
/// `OnsetDetection` with sorted, deduplicated onset times and the detector that
/// produced them
pub fn extract_onsets(samples: &[f32], sample_rate: u32, spec: &Spectrogram) -> OnsetDetection {
    let duration = if sample_rate > 0 {
        samples.len() as f32 / sample_rate as f32
    } else {
        0.0
    };

    let bands = MultiBandEnvelopes::compute(spec);
    let mut onsets = multi_band_onsets(&bands.combined, spec);
    let mut source = OnsetSource::MultiBand;

    log::debug!("Multi-band envelopes gave {} onset candidates", onsets.len());

    if onsets.len() < MIN_MULTI_BAND_ONSETS {
        let flux = spectral_flux::detect_spectral_flux_onsets(spec);
        log::debug!(
            "Only {} multi-band onsets, adding {} spectral flux onsets",
            onsets.len(),
            flux.len()
        );
        if !flux.is_empty() {
            source = OnsetSource::SpectralFlux;
        }
        onsets.extend(flux);
        // Merged sets are snapped to the millisecond grid before deduplication
        onsets = onsets.into_iter().map(|t| (t * 1000.0).round() / 1000.0).collect();
    }

    let mut onsets = sort_and_dedup(onsets);

    if onsets.len() < MIN_SPECTRAL_ONSETS {
        log::warn!(
            "Insufficient onsets ({}), falling back to energy envelope",
            onsets.len()
        );
        match energy_flux::detect_energy_envelope_onsets(samples, sample_rate) {
            Some(energy) => {
                onsets = sort_and_dedup(energy);
                source = OnsetSource::EnergyEnvelope;
            }
            None => match synthetic_grid::synthetic_grid(duration) {
                Some((bpm, grid)) => {
                    log::warn!("Using synthetic onset grid at {:.0} BPM", bpm);
                    onsets = grid;
                    source = OnsetSource::SyntheticGrid;
                }
                None => {
                    log::warn!("Audio too short for a synthetic grid, no onsets");
                    onsets = Vec::new();
                    source = OnsetSource::None;
                }
            },
        }
    }

    if onsets.is_empty() {
        source = OnsetSource::None;
    }

    log::debug!("Extracted {} onsets via {:?}", onsets.len(), source);

    OnsetDetection {
        onsets,
        source,
        strength_envelope: bands.full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(bpm: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        let period = 60.0 / bpm * sample_rate as f32;
        let click_len = (0.03 * sample_rate as f32) as usize;
        let mut samples = vec![0.0f32; n];
        let mut state: u32 = 99;
        let mut k = 0usize;
        loop {
            let pos = (0.25 * sample_rate as f32 + k as f32 * period) as usize;
            if pos >= n {
                break;
            }
            for i in 0..click_len.min(n - pos) {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = ((state >> 16) & 0x7fff) as f32 / 16384.0 - 1.0;
                samples[pos + i] += noise * (-(i as f32) / (click_len as f32 / 5.0)).exp();
            }
            k += 1;
        }
        samples
    }

    #[test]
    fn test_sort_and_dedup() {
        let out = sort_and_dedup(vec![1.0, 0.5, 0.5004, 2.0, 1.0, f32::NAN]);
        assert_eq!(out, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_click_track_onsets_sorted_and_unique() {
        let sr = 22050;
        let samples = click_track(120.0, sr, 20.0);
        let spec = Spectrogram::compute(&samples, sr, 2048, 256).unwrap();
        let detection = extract_onsets(&samples, sr, &spec);

        assert!(
            detection.onsets.len() >= 20,
            "20s of clicks at 120 BPM should give at least 20 onsets, got {}",
            detection.onsets.len()
        );
        assert_eq!(detection.source, OnsetSource::MultiBand);
        for w in detection.onsets.windows(2) {
            assert!(
                w[1] - w[0] >= DEDUP_TOLERANCE_SECONDS,
                "Onsets must be ascending and 1ms apart: {} then {}",
                w[0],
                w[1]
            );
        }
        assert_eq!(detection.strength_envelope.len(), spec.n_frames());
    }

    #[test]
    fn test_click_track_onsets_align_with_clicks() {
        let sr = 22050;
        let samples = click_track(100.0, sr, 20.0);
        let spec = Spectrogram::compute(&samples, sr, 2048, 256).unwrap();
        let detection = extract_onsets(&samples, sr, &spec);

        let period = 0.6;
        let aligned = detection
            .onsets
            .iter()
            .filter(|&&t| {
                let phase = ((t - 0.25) / period).rem_euclid(1.0);
                phase < 0.1 || phase > 0.9
            })
            .count();
        assert!(
            aligned * 2 >= detection.onsets.len(),
            "Most onsets should sit on the click grid ({} of {})",
            aligned,
            detection.onsets.len()
        );
    }

    #[test]
    fn test_silence_falls_back_to_synthetic_grid() {
        let sr = 22050;
        let samples = vec![0.0f32; sr as usize * 10];
        let spec = Spectrogram::compute(&samples, sr, 2048, 256).unwrap();
        let detection = extract_onsets(&samples, sr, &spec);

        assert_eq!(detection.source, OnsetSource::SyntheticGrid);
        assert_eq!(detection.onsets.first().copied(), Some(0.5));
        assert_eq!(detection.onsets.len(), 19, "120 BPM grid from 0.5s to 10s");
    }

    #[test]
    fn test_very_short_silence_has_no_onsets() {
        let sr = 22050;
        let samples = vec![0.0f32; 4096];
        let spec = Spectrogram::compute(&samples, sr, 2048, 256).unwrap();
        let detection = extract_onsets(&samples, sr, &spec);
        assert!(detection.onsets.is_empty());
        assert_eq!(detection.source, OnsetSource::None);
    }
}
