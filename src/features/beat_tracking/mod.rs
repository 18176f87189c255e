//! Beat tracking modules
//!
//! Turn onsets and a tempo curve into a beat grid, then correct and describe it:
//! - Onset-guided beat walking with refinement (`sequencer`)
//! - Half/double-time subdivision correction (`subdivision`)
//! - Meter estimation and downbeats (`time_signature`)
//! - Octave error validation of the headline tempo (`octave`)
//! - Stability, beat strength and complexity descriptors (`descriptors`)

pub mod descriptors;
pub mod octave;
pub mod sequencer;
pub mod subdivision;
pub mod time_signature;

pub use descriptors::{
    beat_strengths, rhythmic_complexity, tempo_stability, NEUTRAL_BEAT_STRENGTH, NEUTRAL_COMPLEXITY,
};
pub use octave::{validate_bpm, OctaveCorrection, OctaveCorrectionKind, OctavePolicy};
pub use sequencer::{sequence_beats, BeatSequence, BeatSource};
pub use subdivision::{correct_subdivision, SubdivisionCorrection};
pub use time_signature::{detect_downbeats, detect_time_signature, TimeSignature};
