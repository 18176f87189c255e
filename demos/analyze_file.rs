//! Example: Analyze a single audio file
//!
//! Usage:
//!   cargo run --release --example analyze_file -- <file> [--bpm N] [--basic]
//!
//! Prints tempo, meter and the smoothed chord timeline. Set `RUST_LOG=debug` to follow
//! the pipeline stages.

use cadenza_dsp::io::decode_audio;
use cadenza_dsp::{
    analyze_track, compute_confidence, AnalysisConfig, ChordConfig, ChordDetector, RhythmEngine,
};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut path: Option<String> = None;
    let mut config = AnalysisConfig::default();
    let mut chord_config = ChordConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bpm" => {
                let bpm = args.next().ok_or("--bpm requires a value")?.parse::<f32>()?;
                config.bpm_override = Some(bpm);
                chord_config.bpm_override = Some(bpm);
            }
            "--basic" => config.engine = RhythmEngine::Basic,
            _ => path = Some(arg),
        }
    }
    let path = path.ok_or("Usage: analyze_file <file> [--bpm N] [--basic]")?;

    let audio = decode_audio(&path)?;
    println!(
        "{}: {:.1}s at {} Hz ({} channels)",
        path,
        audio.duration_seconds(),
        audio.sample_rate,
        audio.source_channels
    );

    let mut detector = ChordDetector::with_templates(chord_config);
    detector.initialize()?;

    let track = analyze_track(&audio.samples, audio.sample_rate, config, &detector)?;
    let rhythm = &track.rhythm;
    let confidence = compute_confidence(rhythm);

    println!("Rhythm:");
    println!("  BPM: {:.2} (confidence: {:.2})", rhythm.tempo_bpm, rhythm.confidence);
    println!(
        "  Meter: {}/4 (confidence: {:.2}), {} beats, {} bars",
        rhythm.time_signature_numerator,
        rhythm.time_signature_confidence,
        rhythm.beats.len(),
        rhythm.downbeats.len()
    );
    println!("  Stability: {:.2}  Complexity: {:.2}", rhythm.tempo_stability, rhythm.rhythmic_complexity);
    println!("  Overall: {:.2} ({})", confidence.overall_confidence, confidence.confidence_level());
    if !confidence.flags.is_empty() {
        println!("  Flags: {:?}", confidence.flags);
    }
    for warning in &rhythm.metadata.warnings {
        println!("  Warning: {}", warning);
    }

    println!("Chords ({} segments, {} unique):", track.chords.total_chords, track.chords.unique_chords);
    for entry in &track.chords.harmonic_rhythm {
        println!(
            "  {:>7.2}s  {:<6} {:>4} beats  {:?}",
            entry.start, entry.chord, entry.beats, entry.role
        );
    }
    println!("Processing time: {:.2} ms", rhythm.metadata.processing_time_ms);

    Ok(())
}
