//! Audio preprocessing modules
//!
//! Utilities for preparing audio at the analysis boundary:
//! - Channel mixing (stereo or interleaved multi-channel to mono)

pub mod channel_mixer;
