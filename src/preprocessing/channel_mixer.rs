//! Channel mixing utilities (stereo to mono conversion)
//!
//! The analysis core works on mono waveforms only. Stereo or multi-channel input is
//! folded down once, here, before it reaches any feature extractor.

use crate::error::AnalysisError;

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMixMode {
    /// Simple average: (L + R) / 2
    #[default]
    Mono,
    /// Keep louder channel per sample
    Dominant,
}

/// Convert stereo to mono
///
/// # Arguments
///
/// * `left` - Left channel samples
/// * `right` - Right channel samples
/// * `mode` - Mixing mode
///
/// # Returns
///
/// Mono samples
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the channels differ in length
pub fn stereo_to_mono(
    left: &[f32],
    right: &[f32],
    mode: ChannelMixMode,
) -> Result<Vec<f32>, AnalysisError> {
    if left.len() != right.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "Channel length mismatch: left={}, right={}",
            left.len(),
            right.len()
        )));
    }

    log::debug!("Converting {} stereo frames to mono using {:?}", left.len(), mode);

    let mono = left
        .iter()
        .zip(right.iter())
        .map(|(&l, &r)| match mode {
            ChannelMixMode::Mono => (l + r) * 0.5,
            ChannelMixMode::Dominant => {
                if l.abs() >= r.abs() {
                    l
                } else {
                    r
                }
            }
        })
        .collect();

    Ok(mono)
}

/// Average interleaved multi-channel samples into mono
///
/// # Arguments
///
/// * `interleaved` - Samples laid out as `[c0, c1, ..., c0, c1, ...]`
/// * `channels` - Number of interleaved channels (>= 1)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `channels` is zero or the buffer is not a
/// whole number of frames
pub fn downmix_interleaved(interleaved: &[f32], channels: usize) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }
    if interleaved.len() % channels != 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Interleaved buffer of {} samples is not divisible into {} channels",
            interleaved.len(),
            channels
        )));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }

    let inv = 1.0 / channels as f32;
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * inv)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_to_mono_average() {
        let mono = stereo_to_mono(&[1.0, 0.0], &[0.0, -1.0], ChannelMixMode::Mono).unwrap();
        assert_eq!(mono, vec![0.5, -0.5]);
    }

    #[test]
    fn test_stereo_to_mono_dominant() {
        let mono = stereo_to_mono(&[0.2, -0.9], &[0.5, 0.1], ChannelMixMode::Dominant).unwrap();
        assert_eq!(mono, vec![0.5, -0.9]);
    }

    #[test]
    fn test_stereo_length_mismatch() {
        assert!(stereo_to_mono(&[0.0; 3], &[0.0; 2], ChannelMixMode::Mono).is_err());
    }

    #[test]
    fn test_downmix_interleaved() {
        let mono = downmix_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, -1.0], 2).unwrap();
        assert_eq!(mono, vec![0.5, 0.5, -1.0]);
        assert!(downmix_interleaved(&[0.0; 5], 2).is_err());
        assert!(downmix_interleaved(&[0.0; 4], 0).is_err());
    }
}
