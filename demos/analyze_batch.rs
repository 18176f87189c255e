//! Example: Analyze multiple audio files in parallel
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files (batch-level). Each file analysis is still single-threaded.
//! - One chord detector is initialized up front and shared by every worker.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use cadenza_dsp::io::decode_audio;
use cadenza_dsp::{analyze_track, compute_confidence, AnalysisConfig, ChordConfig, ChordDetector, TrackAnalysis};
use rayon::prelude::*;
use serde_json::json;
use std::env;
use std::time::Instant;

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn percentile(mut xs: Vec<f32>, p: f32) -> Option<f32> {
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(|a, b| a.total_cmp(b));
    let idx = ((xs.len() - 1) as f32 * p.clamp(0.0, 1.0)).round() as usize;
    Some(xs[idx.min(xs.len() - 1)])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_batch [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let mut detector = ChordDetector::with_templates(ChordConfig::default());
    detector.initialize()?;

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<(String, Result<TrackAnalysis, String>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let result = decode_audio(path)
                    .map_err(|e| format!("decode failed: {e}"))
                    .and_then(|audio| {
                        analyze_track(&audio.samples, audio.sample_rate, AnalysisConfig::default(), &detector)
                            .map_err(|e| format!("analysis failed: {e}"))
                    });
                (path.clone(), result)
            })
            .collect()
    });

    for (idx, (path, out)) in outs.iter().enumerate() {
        match out {
            Ok(track) => {
                let rhythm = &track.rhythm;
                let confidence = compute_confidence(rhythm);
                if json {
                    let line = json!({
                        "file": path,
                        "bpm": rhythm.tempo_bpm,
                        "bpm_confidence": rhythm.confidence,
                        "time_signature": rhythm.time_signature_numerator,
                        "beats": rhythm.beats.len(),
                        "overall_confidence": confidence.overall_confidence,
                        "flags": confidence.flags,
                        "chords": track.chords.segments,
                        "processing_time_ms": rhythm.metadata.processing_time_ms,
                    });
                    println!("{}", line);
                } else {
                    println!(
                        "[{}/{}] {}: BPM={:.2} (conf={:.3}) {}/4 chords={} ({} unique) time={:.2}ms",
                        idx + 1,
                        outs.len(),
                        path,
                        rhythm.tempo_bpm,
                        rhythm.confidence,
                        rhythm.time_signature_numerator,
                        track.chords.total_chords,
                        track.chords.unique_chords,
                        rhythm.metadata.processing_time_ms
                    );
                }
            }
            Err(error) => {
                if json {
                    println!("{}", json!({ "file": path, "error": error }));
                } else {
                    println!("[{}/{}] {}: ERROR: {}", idx + 1, outs.len(), path, error);
                }
            }
        }
    }

    let ok_times: Vec<f32> = outs
        .iter()
        .filter_map(|(_, out)| out.as_ref().ok())
        .map(|t| t.rhythm.metadata.processing_time_ms)
        .collect();
    let wall_ms = t0.elapsed().as_secs_f64() * 1000.0;

    eprintln!("Done: ok={}/{} wall={:.0}ms", ok_times.len(), outs.len(), wall_ms);
    if !ok_times.is_empty() {
        let mean = ok_times.iter().sum::<f32>() / ok_times.len() as f32;
        let p50 = percentile(ok_times.clone(), 0.50).unwrap_or(mean);
        let p90 = percentile(ok_times.clone(), 0.90).unwrap_or(mean);
        let min = ok_times.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = ok_times.iter().cloned().fold(0.0, f32::max);
        eprintln!(
            "processing_time_ms: mean={:.2} p50={:.2} p90={:.2} min={:.2} max={:.2}",
            mean, p50, p90, min, max
        );
    }

    Ok(())
}
