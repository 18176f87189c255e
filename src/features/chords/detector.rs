//! Caller-owned chord detector
//!
//! Composes a `ChordClassifier` with BPM-aware smoothing and harmonic-rhythm
//! annotation. The detector is created cheaply, loaded once with `initialize`, and can
//! then be shared across threads for any number of `detect` calls.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::chords::{ChordDetector, TemplateChordClassifier};
//! use cadenza_dsp::{analyze_rhythm, AnalysisConfig, ChordConfig};
//!
//! let samples = vec![0.0f32; 44100 * 10];
//! let rhythm = analyze_rhythm(&samples, 44100, AnalysisConfig::default())?;
//!
//! let mut detector = ChordDetector::new(TemplateChordClassifier::default(), ChordConfig::default());
//! detector.initialize()?;
//! let chords = detector.detect(&samples, 44100, &rhythm)?;
//! println!("{} chords, {} unique", chords.total_chords, chords.unique_chords);
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::classifier::{ChordClassifier, TemplateChordClassifier};
use super::harmonic_rhythm::{analyze_harmonic_rhythm, ChordRhythm, RhythmContext};
use super::smoothing::smooth_timeline;
use super::{ChordSegment, RawChordTimeline};
use crate::analysis::result::RhythmResult;
use crate::config::ChordConfig;
use crate::error::AnalysisError;
use crate::features::beat_tracking::{detect_downbeats, NEUTRAL_BEAT_STRENGTH};

/// Bar length assumed for timelines smoothed without a rhythm result
const DEFAULT_BEATS_PER_MEASURE: usize = 4;

/// Smoothed chord timeline with rhythm annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordAnalysis {
    /// Smoothed chord segments (no "N", no adjacent duplicates)
    pub segments: Vec<ChordSegment>,

    /// Beat and bar annotation per segment (empty without a beat grid)
    pub harmonic_rhythm: Vec<ChordRhythm>,

    /// Tempo the smoothing thresholds were derived from
    pub bpm: f32,

    /// Smoothing preference used
    pub simplicity_preference: f32,

    /// Number of segments
    pub total_chords: usize,

    /// Number of distinct chord labels
    pub unique_chords: usize,

    /// Name of the classifier that produced the raw timeline
    pub classifier: String,
}

/// Chord detector owning a classifier
#[derive(Debug)]
pub struct ChordDetector<C: ChordClassifier> {
    classifier: C,
    config: ChordConfig,
    ready: bool,
}

impl ChordDetector<TemplateChordClassifier> {
    /// Detector backed by the chroma-template classifier configured from `config`
    pub fn with_templates(config: ChordConfig) -> Self {
        let classifier = TemplateChordClassifier::from_config(&config);
        Self::new(classifier, config)
    }
}

impl<C: ChordClassifier> ChordDetector<C> {
    /// Create an uninitialized detector
    pub fn new(classifier: C, config: ChordConfig) -> Self {
        Self {
            classifier,
            config,
            ready: false,
        }
    }

    /// Validate configuration and load the classifier
    ///
    /// # Errors
    ///
    /// Configuration errors, or whatever the classifier's `load` reports. The detector
    /// stays unready on failure and `initialize` may be retried.
    pub fn initialize(&mut self) -> Result<(), AnalysisError> {
        self.config.validate()?;
        self.classifier.load()?;
        self.ready = true;
        log::info!("Chord detector ready ({})", self.classifier.name());
        Ok(())
    }

    /// True once `initialize` has succeeded
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Detector configuration
    pub fn config(&self) -> &ChordConfig {
        &self.config
    }

    /// Classify audio and smooth the result against a rhythm analysis
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono audio samples (44.1 kHz expected by the template classifier)
    /// * `sample_rate` - Sample rate in Hz
    /// * `rhythm` - Rhythm analysis of the same audio
    ///
    /// # Errors
    ///
    /// `NotInitialized` before `initialize`, classifier errors, and smoothing contract
    /// errors (non-positive BPM)
    pub fn detect(
        &self,
        samples: &[f32],
        sample_rate: u32,
        rhythm: &RhythmResult,
    ) -> Result<ChordAnalysis, AnalysisError> {
        if !self.ready {
            return Err(AnalysisError::NotInitialized(
                "ChordDetector::initialize must succeed before detect".to_string(),
            ));
        }

        let raw = self.classifier.classify(samples, sample_rate)?;
        let bpm = self.config.bpm_override.unwrap_or(rhythm.tempo_bpm);
        let context = RhythmContext {
            bpm,
            ..rhythm.chord_context()
        };
        self.finish(&raw, bpm, &context)
    }

    /// Smooth an externally produced timeline
    ///
    /// Does not need `initialize`. Bars are assumed to be four beats from the first beat.
    pub fn smooth(&self, raw: &RawChordTimeline, bpm: f32, beats: &[f32]) -> Result<ChordAnalysis, AnalysisError> {
        let bpm = self.config.bpm_override.unwrap_or(bpm);
        let downbeats = detect_downbeats(beats, DEFAULT_BEATS_PER_MEASURE);
        let strengths = vec![NEUTRAL_BEAT_STRENGTH; beats.len()];
        let context = RhythmContext {
            bpm,
            beats,
            downbeats: &downbeats,
            beats_per_measure: DEFAULT_BEATS_PER_MEASURE,
            beat_strengths: &strengths,
        };
        self.finish(raw, bpm, &context)
    }

    fn finish(
        &self,
        raw: &RawChordTimeline,
        bpm: f32,
        context: &RhythmContext<'_>,
    ) -> Result<ChordAnalysis, AnalysisError> {
        let preference = self.config.simplicity_preference;
        let segments = smooth_timeline(raw, bpm, preference, self.config.min_frame_confidence)?;
        let harmonic_rhythm = analyze_harmonic_rhythm(&segments, context);
        let unique_chords = segments.iter().map(|s| s.chord.as_str()).collect::<HashSet<_>>().len();

        log::debug!(
            "Chords: {} raw entries -> {} segments ({} unique) at {:.1} BPM",
            raw.len(),
            segments.len(),
            unique_chords,
            bpm
        );

        Ok(ChordAnalysis {
            total_chords: segments.len(),
            unique_chords,
            segments,
            harmonic_rhythm,
            bpm,
            simplicity_preference: preference,
            classifier: self.classifier.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chords::ChordFrame;

    /// Classifier returning a fixed timeline
    struct FixedClassifier {
        timeline: RawChordTimeline,
        loads: usize,
    }

    impl ChordClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn load(&mut self) -> Result<(), AnalysisError> {
            self.loads += 1;
            Ok(())
        }

        fn classify(&self, _samples: &[f32], _sample_rate: u32) -> Result<RawChordTimeline, AnalysisError> {
            Ok(self.timeline.clone())
        }
    }

    fn fixed(timeline: RawChordTimeline) -> FixedClassifier {
        FixedClassifier { timeline, loads: 0 }
    }

    fn rhythm_at(bpm: f32, n_beats: usize) -> RhythmResult {
        let beats: Vec<f32> = (0..n_beats).map(|i| i as f32 * 60.0 / bpm).collect();
        RhythmResult::from_grid(bpm, beats, 4)
    }

    #[test]
    fn test_detect_requires_initialize() {
        let detector = ChordDetector::new(fixed(RawChordTimeline::Segments(vec![])), ChordConfig::default());
        assert!(!detector.is_ready());
        let result = detector.detect(&[0.0; 10], 44100, &rhythm_at(120.0, 8));
        assert!(matches!(result, Err(AnalysisError::NotInitialized(_))));
    }

    #[test]
    fn test_initialize_rejects_bad_config() {
        let config = ChordConfig {
            simplicity_preference: 2.0,
            ..ChordConfig::default()
        };
        let mut detector = ChordDetector::new(fixed(RawChordTimeline::Segments(vec![])), config);
        assert!(detector.initialize().is_err());
        assert!(!detector.is_ready());
        assert_eq!(detector.classifier.loads, 0);
    }

    #[test]
    fn test_detect_smooths_and_annotates() {
        let timeline = RawChordTimeline::Segments(vec![
            ChordSegment::new(0.0, 0.3, "C"),
            ChordSegment::new(0.3, 0.5, "G"),
            ChordSegment::new(0.5, 4.0, "C"),
            ChordSegment::new(4.0, 8.0, "F"),
        ]);
        let mut detector = ChordDetector::new(fixed(timeline), ChordConfig::default());
        detector.initialize().unwrap();
        assert!(detector.is_ready());

        let analysis = detector.detect(&[0.0; 10], 44100, &rhythm_at(120.0, 17)).unwrap();
        assert_eq!(analysis.segments, vec![ChordSegment::new(0.0, 4.0, "C"), ChordSegment::new(4.0, 8.0, "F")]);
        assert_eq!(analysis.total_chords, 2);
        assert_eq!(analysis.unique_chords, 2);
        assert_eq!(analysis.bpm, 120.0);
        assert_eq!(analysis.classifier, "fixed");
        assert_eq!(analysis.harmonic_rhythm.len(), 2);
        assert_eq!(analysis.harmonic_rhythm[0].beats, 9, "beats 0.0 to 4.0 inclusive");
    }

    #[test]
    fn test_bpm_override_replaces_rhythm_tempo() {
        // 0.6s F#: merged at 120 BPM (short = 0.7s), kept at 240 BPM (medium = 0.55s)
        let timeline = RawChordTimeline::Segments(vec![
            ChordSegment::new(0.0, 2.0, "C"),
            ChordSegment::new(2.0, 2.6, "F#"),
            ChordSegment::new(2.6, 5.0, "Eb"),
        ]);
        let config = ChordConfig {
            bpm_override: Some(240.0),
            ..ChordConfig::default()
        };
        let mut detector = ChordDetector::new(fixed(timeline.clone()), config);
        detector.initialize().unwrap();
        let analysis = detector.detect(&[0.0; 10], 44100, &rhythm_at(120.0, 10)).unwrap();
        assert_eq!(analysis.bpm, 240.0);
        assert_eq!(analysis.total_chords, 3);

        let mut detector = ChordDetector::new(fixed(timeline), ChordConfig::default());
        detector.initialize().unwrap();
        let analysis = detector.detect(&[0.0; 10], 44100, &rhythm_at(120.0, 10)).unwrap();
        assert_eq!(analysis.total_chords, 2);
    }

    #[test]
    fn test_smooth_external_frames() {
        let frames: Vec<ChordFrame> = (0..20)
            .map(|i| ChordFrame::new(i as f32 * 0.5, if i < 10 { "Am" } else { "N" }, 0.9))
            .collect();
        let detector = ChordDetector::new(fixed(RawChordTimeline::Frames(vec![])), ChordConfig::default());
        let beats: Vec<f32> = (0..20).map(|i| i as f32 * 0.5).collect();
        let analysis = detector.smooth(&RawChordTimeline::Frames(frames), 120.0, &beats).unwrap();
        assert_eq!(analysis.total_chords, 1);
        assert_eq!(analysis.segments[0].chord, "Am");
        assert_eq!(analysis.harmonic_rhythm[0].beat_position, 1);
    }

    #[test]
    fn test_detector_is_shareable() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<ChordDetector<TemplateChordClassifier>>();
    }
}
