//! Sliding-window tempo tracking
//!
//! Algorithm:
//! 1. Slide an 8 s window with a 2 s hop over the song
//! 2. In each window with at least 3 onsets, histogram the inter-onset intervals that map
//!    to 40-200 BPM (30 bins), smooth the histogram (Gaussian, sigma 0.5) and take the
//!    peak bin center as the beat interval
//! 3. Windows without a valid interval estimate tempo from onset density instead
//! 4. If no window yields a tempo, use the median valid interval of the whole track, or
//!    a fixed 85 BPM default
//! 5. Drop points further than 2 standard deviations from the median tempo and smooth
//!    the survivors (Gaussian, sigma 1.0)

use serde::{Deserialize, Serialize};

use super::curve::{TempoCurve, TempoTrackPoint};
use super::filters::gaussian_filter1d;
use crate::features::stats;

/// Analysis window length in seconds
pub const WINDOW_SECONDS: f32 = 8.0;

/// Hop between analysis windows in seconds
pub const WINDOW_HOP_SECONDS: f32 = 2.0;

/// Fallback tempo when no interval evidence exists
///
/// Deliberately a ballad-leaning prior rather than 120 BPM.
pub const DEFAULT_BPM: f32 = 85.0;

/// Fastest tempo the histogram considers
const MAX_WINDOW_BPM: f32 = 200.0;

/// Slowest tempo the histogram considers
const MIN_WINDOW_BPM: f32 = 40.0;

/// Interval histogram resolution
const HISTOGRAM_BINS: usize = 30;

/// Histogram smoothing
const HISTOGRAM_SIGMA: f32 = 0.5;

/// Tempo-track smoothing
const TRACK_SIGMA: f32 = 1.0;

/// Minimum onsets a window needs before it is analysed
const MIN_WINDOW_ONSETS: usize = 3;

/// Valid global inter-onset interval range in seconds
const GLOBAL_INTERVAL_RANGE: (f32, f32) = (0.3, 1.5);

/// Outlier cut-off in standard deviations from the median
const OUTLIER_STD_FACTOR: f32 = 2.0;

/// How the tempo track was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempoSource {
    /// At least one sliding window produced a tempo
    SlidingWindow,
    /// One global tempo from the median inter-onset interval
    GlobalMedian,
    /// Fixed default tempo
    Default,
    /// Caller-supplied tempo
    Override,
}

/// Sparse tempo track and its provenance
#[derive(Debug, Clone)]
pub struct TempoTrack {
    /// Tempo samples, times strictly increasing, never empty
    pub points: Vec<TempoTrackPoint>,

    /// How the track was obtained
    pub source: TempoSource,
}

impl TempoTrack {
    /// Single-point track at the middle of the song
    pub fn constant(bpm: f32, duration: f32, source: TempoSource) -> Self {
        Self {
            points: vec![TempoTrackPoint {
                time: duration * 0.5,
                bpm,
            }],
            source,
        }
    }

    /// Interpolating curve over the track
    pub fn curve(&self) -> TempoCurve {
        TempoCurve::new(self.points.clone()).unwrap_or_else(|| TempoCurve::constant(DEFAULT_BPM))
    }

    /// Mean tempo of the track
    pub fn mean_bpm(&self) -> f32 {
        let bpms: Vec<f32> = self.points.iter().map(|p| p.bpm).collect();
        stats::mean(&bpms).unwrap_or(DEFAULT_BPM)
    }

    /// Median tempo of the track
    pub fn median_bpm(&self) -> f32 {
        let bpms: Vec<f32> = self.points.iter().map(|p| p.bpm).collect();
        stats::median(&bpms).unwrap_or(DEFAULT_BPM)
    }

    /// Lowest and highest tempo of the track
    pub fn range(&self) -> (f32, f32) {
        self.points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.bpm), hi.max(p.bpm))
        })
    }
}

/// Number of sliding windows for a song, using truncating division
///
/// Songs between 6 and 8 seconds still get one (partially empty) window.
pub fn window_count(duration: f32) -> usize {
    let n = ((duration - WINDOW_SECONDS) / WINDOW_HOP_SECONDS).trunc() as i64 + 1;
    n.max(0) as usize
}

/// Beat interval from a histogram of inter-onset intervals
///
/// Intervals outside 0.3-1.5 s (40-200 BPM) are ignored. Returns the tempo of the
/// smoothed histogram's peak bin center, or `None` without valid intervals.
pub fn histogram_tempo(intervals: &[f32]) -> Option<f32> {
    let min_interval = 60.0 / MAX_WINDOW_BPM;
    let max_interval = 60.0 / MIN_WINDOW_BPM;
    let bin_width = (max_interval - min_interval) / HISTOGRAM_BINS as f32;

    let mut histogram = vec![0.0f32; HISTOGRAM_BINS];
    let mut valid = 0usize;
    for &interval in intervals {
        if !(min_interval..=max_interval).contains(&interval) {
            continue;
        }
        // Right edge belongs to the last bin
        let bin = (((interval - min_interval) / bin_width) as usize).min(HISTOGRAM_BINS - 1);
        histogram[bin] += 1.0;
        valid += 1;
    }

    if valid == 0 {
        return None;
    }

    let smoothed = gaussian_filter1d(&histogram, HISTOGRAM_SIGMA);
    let peak = smoothed
        .iter()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0;

    let center = min_interval + (peak as f32 + 0.5) * bin_width;
    Some(60.0 / center)
}

/// Tempo for one analysis window
///
/// `window_onsets` are the onsets inside the window (inclusive bounds). Falls back to the
/// onset density (onsets per window times 60 / window length) when no interval is valid;
/// density tempos outside 40-200 BPM are rejected.
pub fn window_tempo(window_onsets: &[f32]) -> Option<f32> {
    if window_onsets.len() < MIN_WINDOW_ONSETS {
        return None;
    }

    let intervals = stats::diff(window_onsets);
    if let Some(bpm) = histogram_tempo(&intervals) {
        return Some(bpm);
    }

    let density_bpm = window_onsets.len() as f32 / WINDOW_SECONDS * 60.0;
    if (MIN_WINDOW_BPM..=MAX_WINDOW_BPM).contains(&density_bpm) {
        log::debug!("Density-based window tempo: {:.1} BPM", density_bpm);
        Some(density_bpm)
    } else {
        None
    }
}

/// Global tempo from the median of all valid inter-onset intervals
fn global_tempo(onsets: &[f32]) -> Option<f32> {
    if onsets.len() < MIN_WINDOW_ONSETS {
        return None;
    }
    let (lo, hi) = GLOBAL_INTERVAL_RANGE;
    let valid: Vec<f32> = stats::diff(onsets)
        .into_iter()
        .filter(|i| (lo..=hi).contains(i))
        .collect();
    stats::median(&valid).map(|m| 60.0 / m)
}

/// Drop points further than `2 * std` from the median tempo
fn remove_outliers(points: Vec<TempoTrackPoint>) -> Vec<TempoTrackPoint> {
    if points.len() < 2 {
        return points;
    }
    let bpms: Vec<f32> = points.iter().map(|p| p.bpm).collect();
    let (Some(median), Some(std)) = (stats::median(&bpms), stats::std_dev(&bpms)) else {
        return points;
    };
    let limit = OUTLIER_STD_FACTOR * std;
    let kept: Vec<TempoTrackPoint> = points
        .into_iter()
        .filter(|p| (p.bpm - median).abs() <= limit)
        .collect();
    kept
}

/// Estimate a possibly time-varying tempo track
///
/// # Arguments
///
/// * `onsets` - Onset times in seconds, ascending
/// * `duration` - Song duration in seconds
///
/// # Returns
///
/// A non-empty `TempoTrack`; never fails, the worst case is a single 85 BPM point at the
/// middle of the song
pub fn track_tempo(onsets: &[f32], duration: f32) -> TempoTrack {
    let n_windows = window_count(duration);
    let mut points = Vec::new();

    for w in 0..n_windows {
        let start = w as f32 * WINDOW_HOP_SECONDS;
        let end = start + WINDOW_SECONDS;
        let lo = onsets.partition_point(|&t| t < start);
        let hi = onsets.partition_point(|&t| t <= end);

        if let Some(bpm) = window_tempo(&onsets[lo..hi]) {
            let center = (start + end) * 0.5;
            log::debug!("Window {:.1}s: {:.1} BPM", center, bpm);
            points.push(TempoTrackPoint { time: center, bpm });
        }
    }

    let mut source = TempoSource::SlidingWindow;

    if points.is_empty() {
        log::warn!("No tempo detected in any of {} windows, using global analysis", n_windows);
        match global_tempo(onsets) {
            Some(bpm) => {
                log::debug!("Using global tempo: {:.1} BPM", bpm);
                points = [0.25f32, 0.5, 0.75]
                    .iter()
                    .map(|&f| TempoTrackPoint {
                        time: duration * f,
                        bpm,
                    })
                    .collect();
                source = TempoSource::GlobalMedian;
            }
            None => {
                log::warn!("No usable onset intervals, using default tempo {} BPM", DEFAULT_BPM);
                return TempoTrack::constant(DEFAULT_BPM, duration, TempoSource::Default);
            }
        }
    }

    let points = remove_outliers(points);
    if points.is_empty() {
        log::warn!("All tempo values filtered out, using default tempo");
        return TempoTrack::constant(DEFAULT_BPM, duration, TempoSource::Default);
    }

    let points = if points.len() > 1 {
        let bpms: Vec<f32> = points.iter().map(|p| p.bpm).collect();
        let smoothed = gaussian_filter1d(&bpms, TRACK_SIGMA);
        points
            .iter()
            .zip(smoothed)
            .map(|(p, bpm)| TempoTrackPoint { time: p.time, bpm })
            .collect()
    } else {
        points
    };

    let track = TempoTrack { points, source };
    let (lo, hi) = track.range();
    log::debug!("Tempo range: {:.1} - {:.1} BPM ({:?})", lo, hi, source);
    track
}
