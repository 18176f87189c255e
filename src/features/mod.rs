//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - STFT magnitude spectrogram and small statistics helpers
//! - Onset detection (multi-band envelopes with three fallbacks)
//! - Sliding-window tempo tracking
//! - Beat tracking, meter and octave validation
//! - Chroma extraction
//! - Chord classification, smoothing and harmonic rhythm

pub mod beat_tracking;
pub mod chords;
pub mod chroma;
pub mod onset;
pub mod spectrogram;
pub mod stats;
pub mod tempo;
