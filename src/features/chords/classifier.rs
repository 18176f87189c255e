//! Frame-level chord classification
//!
//! `ChordClassifier` is the seam for whatever produces raw chord labels (a neural
//! model, a remote service, a template matcher). `TemplateChordClassifier` is the
//! built-in reference implementation: chroma from a 4096-point STFT, cosine similarity
//! against binary chord templates, best match above a threshold or `"N"`.

use super::label::NO_CHORD;
use super::templates::ChordTemplates;
use super::{ChordFrame, RawChordTimeline};
use crate::config::ChordConfig;
use crate::error::AnalysisError;
use crate::features::chroma::normalization::cosine_similarity;
use crate::features::chroma::extract_chroma;

/// Produces a raw chord timeline from audio
///
/// `load` is called once by `ChordDetector::initialize`; `classify` may then be
/// called concurrently from several threads.
pub trait ChordClassifier: Send + Sync {
    /// Short identifier reported in chord analysis results
    fn name(&self) -> &str;

    /// Load models or build lookup tables
    fn load(&mut self) -> Result<(), AnalysisError>;

    /// Classify audio into frames or segments
    fn classify(&self, samples: &[f32], sample_rate: u32) -> Result<RawChordTimeline, AnalysisError>;
}

/// Chroma template matcher
#[derive(Debug, Clone)]
pub struct TemplateChordClassifier {
    frame_size: usize,
    hop_size: usize,
    threshold: f32,
    templates: Option<ChordTemplates>,
}

impl TemplateChordClassifier {
    /// Create an unloaded classifier with the given STFT sizes and match threshold
    pub fn new(frame_size: usize, hop_size: usize, threshold: f32) -> Self {
        Self {
            frame_size,
            hop_size,
            threshold,
            templates: None,
        }
    }

    /// Create an unloaded classifier from chord configuration
    pub fn from_config(config: &ChordConfig) -> Self {
        Self::new(config.frame_size, config.hop_size, config.template_threshold)
    }

    /// Best template for one chroma vector
    ///
    /// Returns `("N", 0.0)` when nothing scores above the threshold. Earlier templates
    /// win ties.
    pub fn match_chroma(&self, chroma: &[f32]) -> Result<(String, f32), AnalysisError> {
        let templates = self.templates()?;
        let mut best: Option<(&str, f32)> = None;
        for template in templates.iter() {
            let score = cosine_similarity(chroma, &template.profile);
            if score > self.threshold && best.map_or(true, |(_, s)| score > s) {
                best = Some((template.name.as_str(), score));
            }
        }
        Ok(best.map_or_else(|| (NO_CHORD.to_string(), 0.0), |(name, score)| (name.to_string(), score)))
    }

    fn templates(&self) -> Result<&ChordTemplates, AnalysisError> {
        self.templates
            .as_ref()
            .ok_or_else(|| AnalysisError::NotInitialized("Chord templates not loaded".to_string()))
    }
}

impl Default for TemplateChordClassifier {
    fn default() -> Self {
        Self::from_config(&ChordConfig::default())
    }
}

impl ChordClassifier for TemplateChordClassifier {
    fn name(&self) -> &str {
        "chroma-template"
    }

    fn load(&mut self) -> Result<(), AnalysisError> {
        if !(0.0..1.0).contains(&self.threshold) {
            return Err(AnalysisError::InvalidInput(format!(
                "Template threshold must be in [0, 1), got {}",
                self.threshold
            )));
        }
        let templates = ChordTemplates::new();
        log::debug!("Loaded {} chord templates", templates.len());
        self.templates = Some(templates);
        Ok(())
    }

    fn classify(&self, samples: &[f32], sample_rate: u32) -> Result<RawChordTimeline, AnalysisError> {
        self.templates()?;
        let chroma = extract_chroma(samples, sample_rate, self.frame_size, self.hop_size)?;
        let seconds_per_frame = self.hop_size as f32 / sample_rate as f32;

        let frames = chroma
            .iter()
            .enumerate()
            .map(|(i, vector)| {
                let (chord, confidence) = self.match_chroma(vector)?;
                Ok(ChordFrame::new(i as f32 * seconds_per_frame, chord, confidence))
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        log::debug!("Template classifier: {} frames", frames.len());
        Ok(RawChordTimeline::Frames(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> TemplateChordClassifier {
        let mut classifier = TemplateChordClassifier::default();
        classifier.load().unwrap();
        classifier
    }

    #[test]
    fn test_classify_requires_load() {
        let classifier = TemplateChordClassifier::default();
        let result = classifier.classify(&vec![0.0; 44100], 44100);
        assert!(matches!(result, Err(AnalysisError::NotInitialized(_))));
    }

    #[test]
    fn test_match_triads() {
        let classifier = loaded();
        let mut a_minor = [0.0f32; 12];
        a_minor[9] = 1.0;
        a_minor[0] = 0.8;
        a_minor[4] = 0.9;
        assert_eq!(classifier.match_chroma(&a_minor).unwrap().0, "Am");

        let mut g7 = [0.0f32; 12];
        for pc in [7, 11, 2, 5] {
            g7[pc] = 1.0;
        }
        let (label, score) = classifier.match_chroma(&g7).unwrap();
        assert_eq!(label, "G7");
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_silence_is_no_chord() {
        let classifier = loaded();
        assert_eq!(classifier.match_chroma(&[0.0; 12]).unwrap(), ("N".to_string(), 0.0));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mut classifier = TemplateChordClassifier::new(4096, 512, 1.5);
        assert!(classifier.load().is_err());
    }

    #[test]
    fn test_classify_major_triad_audio() {
        let classifier = loaded();
        let sr = 44100;
        // C4 E4 G4
        let samples: Vec<f32> = (0..sr)
            .map(|i| {
                let t = i as f32 / sr as f32;
                [261.63f32, 329.63, 392.0]
                    .iter()
                    .map(|f| (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum::<f32>()
                    / 3.0
            })
            .collect();
        let RawChordTimeline::Frames(frames) = classifier.classify(&samples, sr as u32).unwrap() else {
            panic!("template classifier emits frames");
        };
        let mid = &frames[frames.len() / 2];
        assert_eq!(mid.chord, "C", "got {:?}", mid);
        assert!(mid.confidence > 0.6);
        assert!((frames[1].time - 512.0 / 44100.0).abs() < 1e-6);
    }
}
