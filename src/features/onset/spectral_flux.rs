//! Spectral flux onset detection
//!
//! Used as the first fallback when the multi-band envelopes yield too few onsets.
//!
//! Algorithm:
//! 1. Flux per frame transition: `sum_k (|X[t, k]| - |X[t - 1, k]|)` (signed, not rectified)
//! 2. Prepend a zero so the curve aligns with spectrogram frames
//! 3. Z-score normalize
//! 4. Peak-pick with height 0.5 and a 4-frame minimum distance

use super::peak_picking::find_peaks;
use super::threshold::strict_zscore;
use crate::features::spectrogram::Spectrogram;

/// Peak height on the z-scored flux curve
const FLUX_PEAK_HEIGHT: f32 = 0.5;

/// Minimum distance between flux peaks in frames
const FLUX_PEAK_DISTANCE: usize = 4;

/// Frame-aligned spectral flux curve (first value is 0.0)
pub fn spectral_flux(spec: &Spectrogram) -> Vec<f32> {
    let frames = spec.frames();
    let mut flux = Vec::with_capacity(frames.len());
    if frames.is_empty() {
        return flux;
    }

    flux.push(0.0);
    for pair in frames.windows(2) {
        let delta: f32 = pair[1]
            .iter()
            .zip(pair[0].iter())
            .map(|(&cur, &prev)| cur - prev)
            .sum();
        flux.push(delta);
    }

    flux
}

/// Detect onsets from spectral flux peaks
///
/// # Returns
///
/// Onset times in seconds, ascending. Empty when the flux curve has zero variance.
pub fn detect_spectral_flux_onsets(spec: &Spectrogram) -> Vec<f32> {
    let flux = spectral_flux(spec);

    let Some(normalized) = strict_zscore(&flux) else {
        log::debug!("Spectral flux has zero variance, no flux onsets");
        return Vec::new();
    };

    let onsets: Vec<f32> = find_peaks(&normalized, FLUX_PEAK_HEIGHT, FLUX_PEAK_DISTANCE)
        .into_iter()
        .map(|frame| spec.frame_time(frame))
        .collect();

    log::debug!("Spectral flux detected {} onsets", onsets.len());
    onsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flux_aligned_with_frames() {
        let samples: Vec<f32> = (0..22050).map(|i| if i > 11025 { 0.5 } else { 0.0 }).collect();
        let spec = Spectrogram::compute(&samples, 22050, 2048, 256).unwrap();
        let flux = spectral_flux(&spec);
        assert_eq!(flux.len(), spec.n_frames());
        assert_eq!(flux[0], 0.0);
    }

    #[test]
    fn test_step_produces_onset_near_step() {
        let mut samples = vec![0.0f32; 22050 * 2];
        let mut state: u32 = 7;
        for s in samples.iter_mut().skip(22050) {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *s = ((state >> 8) as f32 / (1u32 << 24) as f32) - 0.5;
        }
        let spec = Spectrogram::compute(&samples, 22050, 2048, 256).unwrap();
        let onsets = detect_spectral_flux_onsets(&spec);
        assert!(!onsets.is_empty(), "Noise onset should produce a flux peak");
        assert!(
            onsets.iter().any(|&t| (t - 1.0).abs() < 0.1),
            "Expected an onset near 1.0s, got {:?}",
            onsets
        );
    }

    #[test]
    fn test_silence_has_no_flux_onsets() {
        let spec = Spectrogram::compute(&vec![0.0f32; 22050], 22050, 2048, 256).unwrap();
        assert!(detect_spectral_flux_onsets(&spec).is_empty());
    }
}
