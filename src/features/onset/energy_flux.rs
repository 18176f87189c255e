//! Energy-based onset detection
//!
//! Two detectors work directly on samples, without an STFT:
//!
//! * [`detect_energy_flux_onsets`]: frame RMS derivative with a dB threshold relative to
//!   the maximum flux. Drives the basic rhythm engine.
//! * [`detect_energy_envelope_onsets`]: peaks of 100 ms mean-square energy windows
//!   (50 ms hop) above `mean + 0.3 * std`. Second fallback of the onset extractor.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::onset::energy_flux::detect_energy_flux_onsets;
//!
//! let samples = vec![0.0f32; 22050 * 30]; // 30 seconds of audio
//! let onsets = detect_energy_flux_onsets(&samples, 22050, 2048, 512, -30.0)?;
//! println!("Found {} onsets", onsets.len());
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

use super::peak_picking::find_peaks;
use super::threshold::mean_plus_k_std;
use crate::error::AnalysisError;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Energy window length in seconds
const ENVELOPE_WINDOW_SECONDS: f32 = 0.1;

/// Energy window hop in seconds
const ENVELOPE_HOP_SECONDS: f32 = 0.05;

/// Envelope threshold in standard deviations above the mean
const ENVELOPE_THRESHOLD_K: f32 = 0.3;

/// Minimum distance between envelope peaks in windows
const ENVELOPE_PEAK_DISTANCE: usize = 4;

/// The envelope detector only trusts its result above this many peaks
const MIN_ENVELOPE_PEAKS: usize = 10;

/// Detect onsets using energy flux
///
/// # Reference
///
/// Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
/// A Tutorial on Onset Detection in Music Signals.
/// *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
///
/// # Arguments
///
/// * `samples` - Audio samples (mono, normalized to [-1.0, 1.0])
/// * `sample_rate` - Sample rate in Hz
/// * `frame_size` - Frame size for analysis (typically 2048)
/// * `hop_size` - Hop size between frames (typically 512)
/// * `threshold_db` - Threshold in dB relative to maximum flux (typically -20 to -30 dB)
///
/// # Returns
///
/// Onset times in seconds, ascending, at least half a hop apart
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the sample rate, frame size or hop size is zero
pub fn detect_energy_flux_onsets(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    threshold_db: f32,
) -> Result<Vec<f32>, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Sample rate must be > 0".to_string(),
        ));
    }
    if frame_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Frame size must be > 0".to_string(),
        ));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Hop size must be > 0".to_string(),
        ));
    }

    if samples.len() < frame_size {
        log::debug!(
            "Frame size ({}) larger than audio length ({}), no energy flux onsets",
            frame_size,
            samples.len()
        );
        return Ok(Vec::new());
    }

    let num_frames = (samples.len() - frame_size) / hop_size + 1;
    if num_frames < 2 {
        return Ok(Vec::new());
    }

    // RMS per frame, then rectified first difference
    let energies: Vec<f32> = (0..num_frames)
        .map(|i| {
            let frame = &samples[i * hop_size..i * hop_size + frame_size];
            (frame.iter().map(|&x| x * x).sum::<f32>() / frame_size as f32).sqrt()
        })
        .collect();
    let flux: Vec<f32> = energies.windows(2).map(|w| (w[1] - w[0]).max(0.0)).collect();

    let max_flux = flux.iter().copied().fold(0.0f32, f32::max);
    if max_flux <= EPSILON {
        log::debug!("Energy flux is flat, no onsets detected");
        return Ok(Vec::new());
    }

    let threshold = max_flux * 10.0_f32.powf(threshold_db / 20.0);

    log::debug!(
        "Energy flux: {} frames, max={:.6}, threshold={:.6} ({:.1} dB)",
        num_frames,
        max_flux,
        threshold,
        threshold_db
    );

    // flux[i] is the change into frame i + 1; edges count when they dominate their
    // single neighbour
    let last = flux.len() - 1;
    let mut onset_samples: Vec<usize> = (0..flux.len())
        .filter(|&i| {
            let f = flux[i];
            if f <= threshold {
                return false;
            }
            let rises = i == 0 || f > flux[i - 1];
            let holds = i == last || f >= flux[i + 1];
            rises && holds
        })
        .map(|i| (i + 1) * hop_size)
        .filter(|&s| s < samples.len())
        .collect();

    onset_samples.dedup_by(|next, kept| *next < *kept + hop_size / 2);

    let onsets: Vec<f32> = onset_samples
        .into_iter()
        .map(|s| s as f32 / sample_rate as f32)
        .collect();

    log::debug!("Energy flux detected {} onsets", onsets.len());
    Ok(onsets)
}

/// Detect onsets from peaks of a windowed energy envelope
///
/// Windows of 100 ms advance by 50 ms; each window's mean-square energy is stamped at its
/// start time. Peaks above `mean + 0.3 * std` with a 4-window minimum distance are kept.
///
/// # Returns
///
/// `Some(onsets)` when more than 10 peaks are found, `None` otherwise (the caller should
/// move on to its next fallback)
pub fn detect_energy_envelope_onsets(samples: &[f32], sample_rate: u32) -> Option<Vec<f32>> {
    let window = (ENVELOPE_WINDOW_SECONDS * sample_rate as f32) as usize;
    let hop = (ENVELOPE_HOP_SECONDS * sample_rate as f32) as usize;
    if window == 0 || hop == 0 || samples.len() <= window {
        return None;
    }

    let starts: Vec<usize> = (0..samples.len() - window).step_by(hop).collect();
    let energies: Vec<f32> = starts
        .iter()
        .map(|&s| samples[s..s + window].iter().map(|&x| x * x).sum::<f32>() / window as f32)
        .collect();

    let threshold = mean_plus_k_std(&energies, ENVELOPE_THRESHOLD_K);
    let peaks = find_peaks(&energies, threshold, ENVELOPE_PEAK_DISTANCE);

    log::debug!(
        "Energy envelope: {} windows, threshold={:.6}, {} peaks",
        energies.len(),
        threshold,
        peaks.len()
    );

    if peaks.len() > MIN_ENVELOPE_PEAKS {
        Some(
            peaks
                .into_iter()
                .map(|p| starts[p] as f32 / sample_rate as f32)
                .collect(),
        )
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kick pattern: exponentially decaying bursts at the given BPM
    fn generate_kick_pattern(
        duration_seconds: f32,
        bpm: f32,
        sample_rate: f32,
        kick_duration_ms: f32,
    ) -> Vec<f32> {
        let num_samples = (duration_seconds * sample_rate) as usize;
        let mut samples = vec![0.0f32; num_samples];
        let beat_interval = (60.0 / bpm * sample_rate) as usize;
        let kick_samples = (kick_duration_ms / 1000.0 * sample_rate) as usize;

        let mut pos = 0;
        while pos < num_samples {
            let end = (pos + kick_samples).min(num_samples);
            for i in 0..(end - pos) {
                let t = i as f32 / kick_samples as f32;
                samples[pos + i] = 0.8 * (-t * 5.0).exp();
            }
            pos += beat_interval;
        }

        samples
    }

    #[test]
    fn test_energy_flux_step() {
        let mut samples = vec![0.0f32; 22050];
        for s in samples.iter_mut().skip(5000) {
            *s = 0.5;
        }

        let onsets = detect_energy_flux_onsets(&samples, 22050, 2048, 512, -30.0).unwrap();
        assert!(!onsets.is_empty(), "Step function should produce an onset");
        let t = onsets[0];
        assert!(
            (0.1..=0.4).contains(&t),
            "Onset should be near the step at ~0.23s, got {:.3}s",
            t
        );
    }

    #[test]
    fn test_energy_flux_kick_pattern_120_bpm() {
        let samples = generate_kick_pattern(4.0, 120.0, 22050.0, 150.0);
        let onsets = detect_energy_flux_onsets(&samples, 22050, 2048, 512, -30.0).unwrap();

        assert!(
            onsets.len() >= 4 && onsets.len() <= 12,
            "Expected 4-12 onsets for 120 BPM over 4s, got {}",
            onsets.len()
        );

        let intervals: Vec<f32> = onsets.windows(2).map(|w| w[1] - w[0]).collect();
        let avg = intervals.iter().sum::<f32>() / intervals.len() as f32;
        assert!(
            (avg - 0.5).abs() < 0.25,
            "Onset intervals should average ~0.5s, got {:.3}s",
            avg
        );
    }

    #[test]
    fn test_energy_flux_silent_and_short() {
        assert!(detect_energy_flux_onsets(&[], 22050, 2048, 512, -20.0)
            .unwrap()
            .is_empty());
        assert!(detect_energy_flux_onsets(&vec![0.0; 22050], 22050, 2048, 512, -20.0)
            .unwrap()
            .is_empty());
        assert!(detect_energy_flux_onsets(&vec![0.5; 1000], 22050, 2048, 512, -20.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_energy_flux_invalid_parameters() {
        let samples = vec![0.5f32; 22050];
        assert!(detect_energy_flux_onsets(&samples, 22050, 0, 512, -20.0).is_err());
        assert!(detect_energy_flux_onsets(&samples, 22050, 2048, 0, -20.0).is_err());
        assert!(detect_energy_flux_onsets(&samples, 0, 2048, 512, -20.0).is_err());
    }

    #[test]
    fn test_energy_envelope_on_kicks() {
        let samples = generate_kick_pattern(10.0, 100.0, 22050.0, 120.0);
        let onsets = detect_energy_envelope_onsets(&samples, 22050)
            .expect("Ten seconds of kicks should give more than 10 envelope peaks");
        assert!(onsets.len() > 10);
        assert!(onsets.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_energy_envelope_rejects_silence() {
        assert!(detect_energy_envelope_onsets(&vec![0.0f32; 22050 * 5], 22050).is_none());
    }
}
