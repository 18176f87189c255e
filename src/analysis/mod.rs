//! Analysis and result aggregation modules
//!
//! Runs the rhythm engines and packages their output:
//! - Enhanced pipeline (`pipeline`) and the basic engine (`fallback`)
//! - Confidence scoring
//! - Result types
//! - Metadata

pub mod confidence;
pub mod fallback;
pub mod metadata;
pub mod pipeline;
pub mod result;
