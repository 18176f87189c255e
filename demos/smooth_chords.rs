//! Example: Smooth a chord timeline produced by another tool
//!
//! Usage:
//!   cargo run --example smooth_chords -- <timeline.json> <bpm>
//!
//! The file holds either frames (`[{"time": 0.0, "chord": "C", "confidence": 0.9}, ...]`)
//! or segments (`[{"start": 0.0, "end": 2.0, "chord": "C"}, ...]`); `timestamp`,
//! `startTime`/`endTime` and `label` spellings are accepted too. The smoothed timeline is
//! written to stdout as JSON.

use cadenza_dsp::{ChordConfig, ChordDetector, RawChordTimeline};
use std::env;
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [path, bpm] = args.as_slice() else {
        eprintln!("Usage: smooth_chords <timeline.json> <bpm>");
        std::process::exit(2);
    };
    let bpm: f32 = bpm.parse()?;

    let raw: RawChordTimeline = serde_json::from_str(&fs::read_to_string(path)?)?;
    let beat = 60.0 / bpm;
    let end = match &raw {
        RawChordTimeline::Frames(frames) => frames.last().map_or(0.0, |f| f.time),
        RawChordTimeline::Segments(segments) => segments.last().map_or(0.0, |s| s.end),
    };
    let beats: Vec<f32> = (0..)
        .map(|i| i as f32 * beat)
        .take_while(|t| *t < end)
        .collect();

    // Smoothing alone needs no classifier
    let detector = ChordDetector::with_templates(ChordConfig::default());
    let analysis = detector.smooth(&raw, bpm, &beats)?;

    eprintln!("{} entries -> {} segments", raw.len(), analysis.total_chords);
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
