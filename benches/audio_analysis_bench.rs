//! Performance benchmarks for rhythm analysis and chord smoothing

use cadenza_dsp::features::chords::smooth_segments;
use cadenza_dsp::{analyze_rhythm, AnalysisConfig, ChordSegment};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn click_track(bpm: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let mut samples = vec![0.0f32; (seconds * sample_rate as f32) as usize];
    let period = (60.0 / bpm * sample_rate as f32) as usize;
    let click_len = (0.02 * sample_rate as f32) as usize;
    for start in (0..samples.len()).step_by(period) {
        for (i, s) in samples.iter_mut().skip(start).take(click_len).enumerate() {
            *s = (i as f32 * 0.7).sin() * (-(i as f32) / 80.0).exp();
        }
    }
    samples
}

fn bench_analyze_rhythm(c: &mut Criterion) {
    // 30 seconds at the default rhythm rate
    let samples = click_track(124.0, 22050, 30.0);
    let config = AnalysisConfig::default();

    c.bench_function("analyze_rhythm_30s", |b| {
        b.iter(|| {
            let _ = analyze_rhythm(black_box(&samples), black_box(22050), black_box(config.clone()));
        });
    });
}

fn bench_smooth_segments(c: &mut Criterion) {
    // Four-bar progression with a flicker every bar, repeated for ~3 minutes at 120 BPM
    let labels = ["C", "Em", "G", "D", "Am", "F"];
    let mut segments = Vec::new();
    let mut t = 0.0f32;
    for i in 0..360 {
        let duration = if i % 3 == 1 { 0.15 } else { 0.85 };
        segments.push(ChordSegment::new(t, t + duration, labels[i % labels.len()]));
        t += duration;
    }

    c.bench_function("smooth_segments_360", |b| {
        b.iter(|| {
            let _ = smooth_segments(black_box(&segments), black_box(120.0));
        });
    });
}

criterion_group!(benches, bench_analyze_rhythm, bench_smooth_segments);
criterion_main!(benches);
