//! Multi-band onset-strength envelopes
//!
//! Three envelopes are computed over the same STFT: full spectrum (up to 8 kHz), low
//! band (20-200 Hz, kicks and bass) and high band (1-8 kHz, snares and hats). Each is
//! z-scored independently and the three are averaged into one combined envelope.
//!
//! Per-band onset strength (superflux style):
//! 1. Log-power spectrogram in dB, floored 80 dB below its maximum
//! 2. Reference = previous frame, max-filtered over 3 neighbouring bins
//! 3. Half-wave rectified difference `max(0, S[t, k] - ref[t - 1, k])`
//! 4. Median across the band's bins
//!
//! With centered frames a transient first shows up in the frame whose window edge just
//! reaches it, so the envelope is delayed by `frame_size / (2 * hop_size)` frames to line
//! peaks up with the attack itself.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::spectrogram::Spectrogram;
//! use cadenza_dsp::features::onset::multi_band::{onset_strength, FULL_BAND};
//!
//! let samples = vec![0.0f32; 22050 * 10];
//! let spec = Spectrogram::compute(&samples, 22050, 2048, 256)?;
//! let envelope = onset_strength(&spec, FULL_BAND);
//! assert_eq!(envelope.len(), spec.n_frames());
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

use super::threshold::{zscore, ZSCORE_EPSILON};
use crate::features::spectrogram::Spectrogram;

/// Dynamic range kept by the log-power spectrogram
const TOP_DB: f32 = 80.0;

/// Power floor before taking the logarithm
const POWER_FLOOR: f32 = 1e-10;

/// Frequency band for an onset-strength envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetBand {
    /// Band label used in logs
    pub name: &'static str,
    /// Lower edge in Hz (inclusive)
    pub low_hz: f32,
    /// Upper edge in Hz (inclusive)
    pub high_hz: f32,
}

/// Full spectrum up to 8 kHz
pub const FULL_BAND: OnsetBand = OnsetBand {
    name: "full",
    low_hz: 0.0,
    high_hz: 8000.0,
};

/// Kick drum and bass emphasis
pub const LOW_BAND: OnsetBand = OnsetBand {
    name: "low",
    low_hz: 20.0,
    high_hz: 200.0,
};

/// Snare and hi-hat emphasis
pub const HIGH_BAND: OnsetBand = OnsetBand {
    name: "high",
    low_hz: 1000.0,
    high_hz: 8000.0,
};

/// Log-power spectrogram restricted to `bins`, floored `TOP_DB` below its maximum
fn log_power(spec: &Spectrogram, bins: std::ops::Range<usize>) -> Vec<Vec<f32>> {
    let mut db: Vec<Vec<f32>> = spec
        .frames()
        .iter()
        .map(|frame| {
            frame[bins.clone()]
                .iter()
                .map(|&m| 10.0 * (m * m).max(POWER_FLOOR).log10())
                .collect()
        })
        .collect();

    let max_db = db
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    if max_db.is_finite() {
        let floor = max_db - TOP_DB;
        for v in db.iter_mut().flat_map(|f| f.iter_mut()) {
            *v = v.max(floor);
        }
    }

    db
}

/// Onset-strength envelope for one frequency band
///
/// Returns one value per spectrogram frame; the leading `1 + frame_size / (2 * hop)`
/// values are 0.0. An empty band (for example 1-8 kHz at a very low sample rate) yields
/// an all-zero envelope.
pub fn onset_strength(spec: &Spectrogram, band: OnsetBand) -> Vec<f32> {
    let n_frames = spec.n_frames();
    let bins = spec.band_bins(band.low_hz, band.high_hz);
    let mut envelope = vec![0.0f32; n_frames];

    if bins.is_empty() || n_frames < 2 {
        log::debug!("Onset band '{}' has no bins or frames", band.name);
        return envelope;
    }

    let db = log_power(spec, bins);
    let n_bins = db[0].len();
    let delay = spec.frame_size() / (2 * spec.hop_size());
    let mut reference = vec![0.0f32; n_bins];
    let mut scratch = Vec::with_capacity(n_bins);

    for t in 1..n_frames {
        let prev = &db[t - 1];
        for (k, r) in reference.iter_mut().enumerate() {
            let lo = k.saturating_sub(1);
            let hi = (k + 1).min(n_bins - 1);
            *r = prev[lo..=hi].iter().copied().fold(f32::NEG_INFINITY, f32::max);
        }

        scratch.clear();
        scratch.extend(
            db[t]
                .iter()
                .zip(reference.iter())
                .map(|(&cur, &r)| (cur - r).max(0.0)),
        );
        scratch.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let Some(slot) = envelope.get_mut(t + delay) else {
            break;
        };
        let mid = scratch.len() / 2;
        *slot = if scratch.len() % 2 == 0 {
            (scratch[mid - 1] + scratch[mid]) * 0.5
        } else {
            scratch[mid]
        };
    }

    envelope
}

/// Average of independently z-scored envelopes
///
/// All envelopes are expected to have the same length; the result is truncated to the
/// shortest one.
pub fn combine_envelopes(envelopes: &[Vec<f32>]) -> Vec<f32> {
    let len = envelopes.iter().map(Vec::len).min().unwrap_or(0);
    if len == 0 {
        return Vec::new();
    }

    let mut combined = vec![0.0f32; len];
    for envelope in envelopes {
        let normalized = zscore(&envelope[..len], ZSCORE_EPSILON);
        for (c, v) in combined.iter_mut().zip(normalized) {
            *c += v;
        }
    }

    let inv = 1.0 / envelopes.len() as f32;
    combined.iter_mut().for_each(|c| *c *= inv);
    combined
}

/// Full, low and high band envelopes plus their combination
#[derive(Debug, Clone)]
pub struct MultiBandEnvelopes {
    /// Full-spectrum onset strength (raw, not normalized)
    pub full: Vec<f32>,
    /// Low-band onset strength
    pub low: Vec<f32>,
    /// High-band onset strength
    pub high: Vec<f32>,
    /// Mean of the three z-scored envelopes
    pub combined: Vec<f32>,
}

impl MultiBandEnvelopes {
    /// Compute all three band envelopes and their combination
    pub fn compute(spec: &Spectrogram) -> Self {
        let full = onset_strength(spec, FULL_BAND);
        let low = onset_strength(spec, LOW_BAND);
        let high = onset_strength(spec, HIGH_BAND);
        let combined = combine_envelopes(&[full.clone(), low.clone(), high.clone()]);

        Self {
            full,
            low,
            high,
            combined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(bpm: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        let period = (60.0 / bpm * sample_rate as f32) as usize;
        let click_len = (0.02 * sample_rate as f32) as usize;
        let mut samples = vec![0.0f32; n];
        let mut state: u32 = 12345;
        let mut pos = period / 2;
        while pos < n {
            for i in 0..click_len.min(n - pos) {
                // Deterministic noise burst with decay
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = ((state >> 16) & 0x7fff) as f32 / 16384.0 - 1.0;
                samples[pos + i] = noise * (-(i as f32) / (click_len as f32 / 4.0)).exp();
            }
            pos += period;
        }
        samples
    }

    #[test]
    fn test_onset_strength_peaks_at_clicks() {
        let sr = 22050;
        let samples = click_track(120.0, sr, 4.0);
        let spec = Spectrogram::compute(&samples, sr, 2048, 256).unwrap();
        let env = onset_strength(&spec, FULL_BAND);

        assert_eq!(env.len(), spec.n_frames());
        assert!(env[..5].iter().all(|&v| v == 0.0));

        // The strongest frame should sit within ~50 ms of a click (first click at 0.25 s)
        let (argmax, _) = env
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        let t = spec.frame_time(argmax);
        let phase = ((t - 0.25) / 0.5).rem_euclid(1.0);
        assert!(
            phase < 0.1 || phase > 0.9,
            "Envelope maximum at {:.3}s should align with the 0.5s click grid",
            t
        );
    }

    #[test]
    fn test_silence_gives_flat_envelope() {
        let samples = vec![0.0f32; 22050];
        let spec = Spectrogram::compute(&samples, 22050, 2048, 256).unwrap();
        let bands = MultiBandEnvelopes::compute(&spec);
        assert!(bands.full.iter().all(|&v| v == 0.0));
        assert!(bands.combined.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_combine_envelopes_averages_zscores() {
        let a = vec![0.0, 1.0, 0.0, 1.0];
        let b = vec![0.0, 10.0, 0.0, 10.0];
        let combined = combine_envelopes(&[a, b]);
        assert_eq!(combined.len(), 4);
        assert!((combined[1] - 1.0).abs() < 1e-3);
        assert!((combined[0] + 1.0).abs() < 1e-3);
    }
}
