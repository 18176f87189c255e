//! Short-time Fourier transform magnitude spectrogram
//!
//! Frames are centered: the signal is zero padded by `frame_size / 2` on both sides, so
//! frame `i` is centered at `i * hop_size / sample_rate` seconds and a signal of `n`
//! samples yields `1 + n / hop_size` frames.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::spectrogram::Spectrogram;
//!
//! let samples = vec![0.0f32; 22050 * 10];
//! let spec = Spectrogram::compute(&samples, 22050, 2048, 256)?;
//! println!("{} frames x {} bins", spec.n_frames(), spec.n_bins());
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;

/// Magnitude spectrogram (n_frames × n_bins)
#[derive(Debug, Clone)]
pub struct Spectrogram {
    magnitudes: Vec<Vec<f32>>,
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
}

/// Periodic Hann window of length `n`
fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
            0.5 - 0.5 * t.cos()
        })
        .collect()
}

impl Spectrogram {
    /// Compute a centered, Hann-windowed magnitude spectrogram
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono audio samples
    /// * `sample_rate` - Sample rate in Hz
    /// * `frame_size` - FFT size (>= 2)
    /// * `hop_size` - Hop between frames (> 0)
    ///
    /// # Errors
    ///
    /// * `InvalidInput` for empty input or invalid frame/hop sizes
    /// * `ProcessingError` when the signal is shorter than one analysis frame
    pub fn compute(
        samples: &[f32],
        sample_rate: u32,
        frame_size: usize,
        hop_size: usize,
    ) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty samples for spectrogram".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if frame_size < 2 || hop_size == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid STFT parameters: frame={}, hop={}",
                frame_size, hop_size
            )));
        }
        if samples.len() < frame_size {
            return Err(AnalysisError::ProcessingError(format!(
                "Signal of {} samples is shorter than one {}-sample frame",
                samples.len(),
                frame_size
            )));
        }

        let pad = frame_size / 2;
        let n_frames = 1 + samples.len() / hop_size;
        let n_bins = frame_size / 2 + 1;
        let window = hann_window(frame_size);

        log::debug!(
            "Computing STFT: {} samples, frame={}, hop={}, {} frames",
            samples.len(),
            frame_size,
            hop_size,
            n_frames
        );

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
        let mut magnitudes = Vec::with_capacity(n_frames);

        for frame in 0..n_frames {
            let start = frame * hop_size;
            for (k, slot) in buffer.iter_mut().enumerate() {
                // Index into the virtually zero-padded signal
                let x = (start + k)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(x * window[k], 0.0);
            }

            fft.process(&mut buffer);

            magnitudes.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
        }

        Ok(Self {
            magnitudes,
            sample_rate,
            frame_size,
            hop_size,
        })
    }

    /// Magnitude frames, each `n_bins` long
    pub fn frames(&self) -> &[Vec<f32>] {
        &self.magnitudes
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.magnitudes.len()
    }

    /// Number of frequency bins per frame (`frame_size / 2 + 1`)
    pub fn n_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Sample rate of the analysed signal
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// FFT frame size in samples
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.frame_size as f32
    }

    /// Time of a frame center in seconds
    pub fn frame_time(&self, frame: usize) -> f32 {
        frame as f32 * self.hop_size as f32 / self.sample_rate as f32
    }

    /// Bins whose center frequency lies in `[low_hz, high_hz]`
    ///
    /// The range is clipped to the available bins and may be empty.
    pub fn band_bins(&self, low_hz: f32, high_hz: f32) -> std::ops::Range<usize> {
        let bin_hz = self.sample_rate as f32 / self.frame_size as f32;
        let start = (low_hz / bin_hz).ceil().max(0.0) as usize;
        let end = ((high_hz / bin_hz).floor() as usize + 1).min(self.n_bins());
        start.min(end)..end
    }
}
