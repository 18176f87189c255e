//! Audio decoding using Symphonia
//!
//! Decodes any container/codec pair enabled in the Symphonia feature set to mono `f32`
//! samples at the file's native sample rate. Resampling is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::io::decode_audio;
//!
//! let audio = decode_audio("song.flac")?;
//! println!("{:.1}s at {} Hz", audio.duration_seconds(), audio.sample_rate);
//! # Ok::<(), cadenza_dsp::AnalysisError>(())
//! ```

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::downmix_interleaved;

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Native sample rate of the source in Hz
    pub sample_rate: u32,

    /// Channel count of the source before down-mixing
    pub source_channels: usize,
}

impl DecodedAudio {
    /// Duration of the decoded audio in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f32 / self.sample_rate as f32
        }
    }
}

fn decoding_error(context: &str, err: SymphoniaError) -> AnalysisError {
    AnalysisError::DecodingError(format!("{}: {}", context, err))
}

/// Decode an audio file to mono PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file (extension is used as a probe hint)
///
/// # Returns
///
/// `DecodedAudio` with mono samples at the file's native sample rate
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened, probed or
/// decoded, or contains no audio track. Corrupt packets are skipped.
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<DecodedAudio, AnalysisError> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path).map_err(|e| {
        AnalysisError::DecodingError(format!("Cannot open {}: {}", path.display(), e))
    })?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decoding_error("Unsupported format", e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::DecodingError("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        AnalysisError::DecodingError("Audio track does not declare a sample rate".to_string())
    })?;
    let mut source_channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decoding_error("Unsupported codec", e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decoding_error("Failed to read packet", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count();
                source_channels = channels;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                let mono = downmix_interleaved(buffer.samples(), channels)?;
                samples.extend_from_slice(&mono);
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped_packets += 1;
                log::debug!("Skipping corrupt packet: {}", msg);
            }
            Err(e) => return Err(decoding_error("Decoder failure", e)),
        }
    }

    if skipped_packets > 0 {
        log::warn!("Skipped {} undecodable packets in {}", skipped_packets, path.display());
    }

    log::debug!(
        "Decoded {} mono samples at {} Hz ({} source channels)",
        samples.len(),
        sample_rate,
        source_channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        source_channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_missing_file() {
        let err = decode_audio("/nonexistent/path/to/audio.wav").unwrap_err();
        assert!(matches!(err, AnalysisError::DecodingError(_)));
    }

    #[test]
    fn test_duration_seconds() {
        let audio = DecodedAudio {
            samples: vec![0.0; 22050],
            sample_rate: 22050,
            source_channels: 2,
        };
        assert!((audio.duration_seconds() - 1.0).abs() < 1e-6);
    }
}
