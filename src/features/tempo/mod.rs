//! Tempo estimation
//!
//! Sliding-window interval histograms produce a sparse tempo track, which is turned into
//! a continuous [`TempoCurve`] for beat sequencing.

pub mod curve;
pub mod filters;
pub mod tracker;

pub use curve::{TempoCurve, TempoTrackPoint};
pub use tracker::{track_tempo, TempoSource, TempoTrack};
