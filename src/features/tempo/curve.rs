//! Piecewise-linear tempo curve
//!
//! Interpolates a sparse tempo track over the whole song. Outside the first and last
//! points the end segments are extended linearly; a single point is a constant tempo.

use serde::{Deserialize, Serialize};

/// Lowest tempo the curve will report
pub const MIN_CURVE_BPM: f32 = 30.0;

/// Highest tempo the curve will report
pub const MAX_CURVE_BPM: f32 = 300.0;

/// Tempo sample at a window center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoTrackPoint {
    /// Time in seconds
    pub time: f32,
    /// Tempo in BPM
    pub bpm: f32,
}

/// Tempo as a function of time
#[derive(Debug, Clone, PartialEq)]
pub struct TempoCurve {
    points: Vec<TempoTrackPoint>,
}

impl TempoCurve {
    /// Build a curve from points with strictly increasing times
    ///
    /// Returns `None` for an empty track.
    pub fn new(points: Vec<TempoTrackPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    /// Constant tempo everywhere
    pub fn constant(bpm: f32) -> Self {
        Self {
            points: vec![TempoTrackPoint { time: 0.0, bpm }],
        }
    }

    /// Points the curve interpolates
    pub fn points(&self) -> &[TempoTrackPoint] {
        &self.points
    }

    /// Unclamped interpolated tempo at `time`
    fn raw_bpm_at(&self, time: f32) -> f32 {
        let pts = &self.points;
        if pts.len() == 1 {
            return pts[0].bpm;
        }

        // Segment containing `time`, or the nearest end segment for extrapolation
        let upper = pts.partition_point(|p| p.time <= time).clamp(1, pts.len() - 1);
        let (a, b) = (pts[upper - 1], pts[upper]);
        let span = b.time - a.time;
        if span <= f32::EPSILON {
            return b.bpm;
        }
        a.bpm + (b.bpm - a.bpm) * (time - a.time) / span
    }

    /// Tempo at `time`, clamped to `[MIN_CURVE_BPM, MAX_CURVE_BPM]`
    ///
    /// Clamping keeps far extrapolation from producing zero or negative tempos.
    pub fn bpm_at(&self, time: f32) -> f32 {
        let bpm = self.raw_bpm_at(time);
        if bpm.is_finite() {
            bpm.clamp(MIN_CURVE_BPM, MAX_CURVE_BPM)
        } else {
            MIN_CURVE_BPM
        }
    }

    /// Mean of the track's tempo values
    pub fn mean_bpm(&self) -> f32 {
        self.points.iter().map(|p| p.bpm).sum::<f32>() / self.points.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(time: f32, bpm: f32) -> TempoTrackPoint {
        TempoTrackPoint { time, bpm }
    }

    #[test]
    fn test_single_point_is_constant() {
        let curve = TempoCurve::new(vec![pt(15.0, 85.0)]).unwrap();
        assert_eq!(curve.bpm_at(0.0), 85.0);
        assert_eq!(curve.bpm_at(100.0), 85.0);
    }

    #[test]
    fn test_interpolation_and_extrapolation() {
        let curve = TempoCurve::new(vec![pt(4.0, 100.0), pt(6.0, 110.0), pt(8.0, 110.0)]).unwrap();
        assert!((curve.bpm_at(5.0) - 105.0).abs() < 1e-4);
        assert!((curve.bpm_at(7.0) - 110.0).abs() < 1e-4);
        // Left extrapolation continues the first segment's slope
        assert!((curve.bpm_at(2.0) - 90.0).abs() < 1e-4);
        // Right extrapolation continues the flat last segment
        assert!((curve.bpm_at(20.0) - 110.0).abs() < 1e-4);
    }

    #[test]
    fn test_extrapolation_is_clamped() {
        let curve = TempoCurve::new(vec![pt(4.0, 60.0), pt(6.0, 40.0)]).unwrap();
        assert_eq!(curve.bpm_at(100.0), MIN_CURVE_BPM);
        let curve = TempoCurve::new(vec![pt(4.0, 100.0), pt(6.0, 200.0)]).unwrap();
        assert_eq!(curve.bpm_at(100.0), MAX_CURVE_BPM);
    }

    #[test]
    fn test_empty_track_has_no_curve() {
        assert!(TempoCurve::new(Vec::new()).is_none());
    }
}
