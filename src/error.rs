//! Error types for the rhythm and chord analysis engine

use std::fmt;

/// Errors that can occur during analysis
///
/// Only contract violations surface here. Recoverable conditions (too few onsets,
/// empty tempo track, no beat sequence) are handled by explicit fallback branches and
/// reported through result metadata instead.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters (empty waveform, zero sample rate, bad config)
    InvalidInput(String),

    /// Audio decoding error
    DecodingError(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (non-finite samples, overflow, etc.)
    NumericalError(String),

    /// A detector was used before its `initialize` step succeeded
    NotInitialized(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            AnalysisError::NotInitialized(msg) => write!(f, "Not initialized: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefixes() {
        let err = AnalysisError::InvalidInput("Empty audio samples".to_string());
        assert_eq!(err.to_string(), "Invalid input: Empty audio samples");

        let err = AnalysisError::NotInitialized("chord detector".to_string());
        assert!(err.to_string().starts_with("Not initialized"));
    }
}
