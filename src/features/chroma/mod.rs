//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Chroma vector computation
//! - Normalization and template similarity

pub mod extractor;
pub mod normalization;

pub use extractor::{chroma_from_spectrogram, extract_chroma};
