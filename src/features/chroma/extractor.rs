//! Chroma vector extraction
//!
//! Folds STFT power into 12 pitch classes. Bins between 55 Hz and 5 kHz are mapped to
//! their nearest equal-tempered pitch (A4 = 440 Hz) and each frame is normalized to a
//! peak of 1.0; silent frames stay all-zero.

use super::normalization::normalize_max;
use crate::error::AnalysisError;
use crate::features::spectrogram::Spectrogram;

/// Lowest frequency folded into chroma
const MIN_CHROMA_HZ: f32 = 55.0;

/// Highest frequency folded into chroma
const MAX_CHROMA_HZ: f32 = 5000.0;

/// Reference pitch for pitch-class mapping
const A4_HZ: f32 = 440.0;

/// Pitch class of A
const A_PITCH_CLASS: i32 = 9;

/// Pitch class (0 = C) of the equal-tempered note nearest to `freq_hz`
pub fn pitch_class(freq_hz: f32) -> Option<usize> {
    if freq_hz <= 0.0 || !freq_hz.is_finite() {
        return None;
    }
    let semitones = (12.0 * (freq_hz / A4_HZ).log2()).round() as i32;
    Some((semitones + A_PITCH_CLASS).rem_euclid(12) as usize)
}

/// Chroma vectors from a magnitude spectrogram
pub fn chroma_from_spectrogram(spec: &Spectrogram) -> Vec<Vec<f32>> {
    let bins = spec.band_bins(MIN_CHROMA_HZ, MAX_CHROMA_HZ);
    let classes: Vec<Option<usize>> = bins.clone().map(|b| pitch_class(spec.bin_frequency(b))).collect();

    spec.frames()
        .iter()
        .map(|frame| {
            let mut chroma = vec![0.0f32; 12];
            for (bin, class) in bins.clone().zip(classes.iter()) {
                if let (Some(class), Some(&mag)) = (class, frame.get(bin)) {
                    chroma[*class] += mag * mag;
                }
            }
            normalize_max(&mut chroma);
            chroma
        })
        .collect()
}

/// Extract chroma vectors from audio samples
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `frame_size` - FFT frame size (default: 4096)
/// * `hop_size` - Hop size (default: 512)
///
/// # Returns
///
/// Vector of 12-element chroma vectors (one per frame)
///
/// # Errors
///
/// Propagates spectrogram errors (empty input, invalid sizes, audio shorter than a frame)
pub fn extract_chroma(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    log::debug!("Extracting chroma: {} samples at {} Hz", samples.len(), sample_rate);
    let spec = Spectrogram::compute(samples, sample_rate, frame_size, hop_size)?;
    Ok(chroma_from_spectrogram(&spec))
}
