//! Configuration parameters for rhythm and chord analysis

use crate::error::AnalysisError;
use crate::features::tempo::curve::{MAX_CURVE_BPM, MIN_CURVE_BPM};
use serde::{Deserialize, Serialize};

/// Sample rate decoders are expected to resample to before rhythm analysis
pub const DEFAULT_RHYTHM_SAMPLE_RATE: u32 = 22050;

/// Sample rate decoders are expected to resample to before chord classification
pub const DEFAULT_CHORD_SAMPLE_RATE: u32 = 44100;

/// Which rhythm engine runs the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RhythmEngine {
    /// Multi-band onsets, sliding-window tempo tracking, beat search and corrections
    Enhanced,
    /// Energy-flux onsets and a constant grid at the median onset interval
    Basic,
}

/// Rhythm analysis configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Frame size for the STFT (default: 2048)
    pub frame_size: usize,

    /// Hop size for the STFT (default: 256, ~11.6 ms at 22050 Hz)
    pub hop_size: usize,

    /// Engine to use (default: Enhanced)
    ///
    /// The enhanced engine falls back to the basic engine on its own when the
    /// spectrogram cannot be built.
    pub engine: RhythmEngine,

    /// Fixed tempo in BPM (default: None)
    ///
    /// Bypasses tempo detection and the subdivision/octave corrections. Beat
    /// sequencing still runs against the given tempo, which must lie in 30-300 BPM.
    pub bpm_override: Option<f32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 256,
            engine: RhythmEngine::Enhanced,
            bpm_override: None,
        }
    }
}

impl AnalysisConfig {
    /// Check parameters that have no musically meaningful fallback
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_size < 16 {
            return Err(AnalysisError::InvalidInput(format!(
                "Frame size must be >= 16, got {}",
                self.frame_size
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(AnalysisError::InvalidInput(format!(
                "Hop size must be in [1, frame_size], got {}",
                self.hop_size
            )));
        }
        if let Some(bpm) = self.bpm_override {
            if !(MIN_CURVE_BPM..=MAX_CURVE_BPM).contains(&bpm) {
                return Err(AnalysisError::InvalidInput(format!(
                    "BPM override must be in [{}, {}], got {}",
                    MIN_CURVE_BPM, MAX_CURVE_BPM, bpm
                )));
            }
        }
        Ok(())
    }
}

/// Chord detection and smoothing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordConfig {
    /// Smoothing aggressiveness in [0, 1] (default: 0.5)
    ///
    /// 0 keeps short, complex chord changes; 1 keeps only stable chords.
    pub simplicity_preference: f32,

    /// Frames below this classifier confidence are discarded (default: 0.7)
    pub min_frame_confidence: f32,

    /// Fixed tempo for smoothing thresholds (default: None, use the rhythm result)
    pub bpm_override: Option<f32>,

    /// STFT frame size for the template classifier (default: 4096)
    pub frame_size: usize,

    /// STFT hop size for the template classifier (default: 512)
    pub hop_size: usize,

    /// Minimum cosine similarity for a template match (default: 0.6)
    pub template_threshold: f32,
}

impl Default for ChordConfig {
    fn default() -> Self {
        Self {
            simplicity_preference: 0.5,
            min_frame_confidence: 0.7,
            bpm_override: None,
            frame_size: 4096,
            hop_size: 512,
            template_threshold: 0.6,
        }
    }
}

impl ChordConfig {
    /// Check parameters that have no musically meaningful fallback
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(0.0..=1.0).contains(&self.simplicity_preference) {
            return Err(AnalysisError::InvalidInput(format!(
                "Simplicity preference must be in [0.0, 1.0], got {}",
                self.simplicity_preference
            )));
        }
        if !(0.0..=1.0).contains(&self.min_frame_confidence) {
            return Err(AnalysisError::InvalidInput(format!(
                "Minimum frame confidence must be in [0.0, 1.0], got {}",
                self.min_frame_confidence
            )));
        }
        if let Some(bpm) = self.bpm_override {
            if !bpm.is_finite() || bpm <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "BPM override must be positive, got {}",
                    bpm
                )));
            }
        }
        if self.frame_size < 16 || self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid STFT parameters: frame={}, hop={}",
                self.frame_size, self.hop_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
        assert!(ChordConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_hop_size() {
        let config = AnalysisConfig {
            hop_size: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_simplicity() {
        let config = ChordConfig {
            simplicity_preference: 1.5,
            ..ChordConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bpm_override() {
        let config = AnalysisConfig {
            bpm_override: Some(-10.0),
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bpm_override_range() {
        for bpm in [10.0, 29.9, 300.5, 400.0, f32::NAN] {
            let config = AnalysisConfig {
                bpm_override: Some(bpm),
                ..AnalysisConfig::default()
            };
            assert!(config.validate().is_err(), "{} BPM should be rejected", bpm);
        }
        for bpm in [30.0, 120.0, 300.0] {
            let config = AnalysisConfig {
                bpm_override: Some(bpm),
                ..AnalysisConfig::default()
            };
            assert!(config.validate().is_ok(), "{} BPM should be accepted", bpm);
        }
    }
}
