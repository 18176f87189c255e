//! Octave error validation
//!
//! Corrects the most common tempo-tracker failure: locking onto a harmonic or subharmonic
//! of the felt beat. Slow songs are the main victims, so the evidence model leans on a
//! tally of ballad indicators computed from the beat intervals.
//!
//! Checks run in order and the first accepted correction wins:
//!
//! 1. 100-200 BPM: halve when the octave-error probability clears one of three tiers
//! 2. 40-80 BPM: double (conservative, probability above 0.8)
//!    or 200-400 BPM: quarter into 50-100 BPM
//!    or 150-220 BPM: divide by three into 50-75 BPM
//! 3. 40-90 BPM with confidence below 0.8: flat confidence boost without a tempo change
//!
//! All thresholds live in [`OctavePolicy`]; they were tuned on real recordings and are
//! kept as a table rather than derived.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_dsp::features::beat_tracking::octave::{validate_bpm, OctavePolicy};
//!
//! let intervals = vec![0.92f32; 32];
//! let correction = validate_bpm(130.0, 0.75, &intervals, &OctavePolicy::default());
//! println!("{:.1} BPM ({:?}, confidence {:.2})", correction.bpm, correction.kind, correction.confidence);
//! ```

use serde::{Deserialize, Serialize};

use crate::features::stats;

/// Inclusive BPM range
pub type BpmRange = (f32, f32);

fn within(range: BpmRange, value: f32) -> bool {
    range.0 <= value && value <= range.1
}

/// One halving tier: probability threshold, confidence boost, confidence cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalvingTier {
    pub min_probability: f32,
    pub boost: f32,
    pub cap: f32,
}

/// A ratio correction (quarter or third time) into a target range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioCheck {
    /// Raw tempo range the check applies to
    pub range: BpmRange,
    /// Tempo divisor
    pub divisor: f32,
    /// Range the corrected tempo must land in
    pub target: BpmRange,
    pub min_probability: f32,
    /// Confidence multiplier on acceptance
    pub confidence_scale: f32,
}

/// Tuning table for the octave validator
#[derive(Debug, Clone, PartialEq)]
pub struct OctavePolicy {
    pub halving_range: BpmRange,
    /// Tiers in descending probability order
    pub halving_tiers: [HalvingTier; 3],

    pub doubling_range: BpmRange,
    pub max_doubled_bpm: f32,
    pub doubling_min_probability: f32,
    pub doubling_boost: f32,
    pub doubling_cap: f32,

    pub quarter: RatioCheck,
    pub third: RatioCheck,

    pub ballad_range: BpmRange,
    /// Ballad boost applies only below this confidence
    pub ballad_max_confidence: f32,
    pub ballad_boost: f32,
}

impl Default for OctavePolicy {
    fn default() -> Self {
        Self {
            halving_range: (100.0, 200.0),
            halving_tiers: [
                HalvingTier {
                    min_probability: 0.5,
                    boost: 0.1,
                    cap: 0.95,
                },
                HalvingTier {
                    min_probability: 0.35,
                    boost: 0.05,
                    cap: 0.85,
                },
                HalvingTier {
                    min_probability: 0.25,
                    boost: 0.0,
                    cap: 0.75,
                },
            ],
            doubling_range: (40.0, 80.0),
            max_doubled_bpm: 160.0,
            doubling_min_probability: 0.8,
            doubling_boost: 0.1,
            doubling_cap: 0.95,
            quarter: RatioCheck {
                range: (200.0, 400.0),
                divisor: 4.0,
                target: (50.0, 100.0),
                min_probability: 0.4,
                confidence_scale: 0.85,
            },
            third: RatioCheck {
                range: (150.0, 220.0),
                divisor: 3.0,
                target: (50.0, 75.0),
                min_probability: 0.4,
                confidence_scale: 0.8,
            },
            ballad_range: (40.0, 90.0),
            ballad_max_confidence: 0.8,
            ballad_boost: 0.25,
        }
    }
}

/// Kind of correction the validator applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OctaveCorrectionKind {
    /// Tempo and confidence unchanged
    None,
    Half,
    Double,
    Quarter,
    Third,
    /// Tempo unchanged, confidence raised for a slow song
    BalladBoost,
}

impl OctaveCorrectionKind {
    /// Ratio between corrected and raw tempo
    pub fn tempo_ratio(&self) -> f32 {
        match self {
            OctaveCorrectionKind::Half => 0.5,
            OctaveCorrectionKind::Double => 2.0,
            OctaveCorrectionKind::Quarter => 0.25,
            OctaveCorrectionKind::Third => 1.0 / 3.0,
            OctaveCorrectionKind::None | OctaveCorrectionKind::BalladBoost => 1.0,
        }
    }

    /// True when the tempo itself changed
    pub fn changes_tempo(&self) -> bool {
        self.tempo_ratio() != 1.0
    }
}

/// Validator output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctaveCorrection {
    /// Corrected tempo in BPM
    pub bpm: f32,
    /// Corrected confidence (0.0-1.0)
    pub confidence: f32,
    pub kind: OctaveCorrectionKind,
    /// Octave-error probability of the last evaluated hypothesis, if any
    pub probability: Option<f32>,
}

/// Probability that a track detected at `original_bpm` really moves at `corrected_bpm`
///
/// Combines how well the median interval fits each hypothesis with a weighted tally of
/// ballad indicators. Indicators that describe the hypothesis pair rather than the
/// intervals (octave-error range, near-2 ratio, classic ballad range and the tuned
/// 130 -> 65 pattern) only count once the intervals themselves show ballad evidence.
///
/// # Returns
///
/// Probability in [0, 0.98]; 0.5 without intervals
pub fn octave_error_probability(original_bpm: f32, corrected_bpm: f32, intervals: &[f32]) -> f32 {
    let (Some(median), Some(std)) = (stats::median(intervals), stats::std_dev(intervals)) else {
        return 0.5;
    };
    if original_bpm <= 0.0 || corrected_bpm <= 0.0 {
        return 0.5;
    }

    let original_fit = 1.0 / (1.0 + (median - 60.0 / original_bpm).abs());
    let corrected_fit = 1.0 / (1.0 + (median - 60.0 / corrected_bpm).abs());

    // (fires, indicator count, confidence boost)
    let evidence = [
        // Wide ballad interval, roughly 40-100 BPM
        ((0.6..=1.5).contains(&median), 1, 0.35),
        // Beatles-style ballad detected at double time
        (
            (120.0..=140.0).contains(&original_bpm)
                && (60.0..=70.0).contains(&corrected_bpm)
                && (0.8..=1.1).contains(&median),
            2,
            0.5,
        ),
        // Consistent slow intervals
        (std < 0.4 && median > 0.7, 1, 0.25),
        // Corrected tempo fits clearly better
        (corrected_fit > original_fit * 1.1, 1, 0.3),
        // Strong joint ballad evidence
        (
            median > 0.8 && original_bpm > 110.0 && corrected_bpm < 80.0 && std < 0.5,
            2,
            0.45,
        ),
        // Perfect ballad interval, roughly 57-71 BPM
        ((0.85..=1.05).contains(&median), 2, 0.4),
    ];

    let ratio = original_bpm / corrected_bpm;
    let context = [
        // Common octave-error range
        ((100.0..=180.0).contains(&original_bpm), 1, 0.3),
        // Near-2 ratio between hypotheses
        ((1.7..=2.3).contains(&ratio), 1, 0.35),
        // Classic ballad range
        ((55.0..=80.0).contains(&corrected_bpm), 1, 0.4),
        // Tuned 130 -> 65 pattern
        (
            (125.0..=135.0).contains(&original_bpm) && (62.0..=68.0).contains(&corrected_bpm),
            3,
            0.6,
        ),
    ];

    let mut indicators = 0u32;
    let mut boost = 0.0f32;
    for &(fires, count, weight) in evidence.iter() {
        if fires {
            indicators += count;
            boost += weight;
        }
    }
    if indicators > 0 {
        for &(fires, count, weight) in context.iter() {
            if fires {
                indicators += count;
                boost += weight;
            }
        }
    }

    let fit_confidence = if corrected_fit > original_fit {
        ((corrected_fit - original_fit) / corrected_fit).min(0.9)
    } else {
        0.0
    };

    let ballad_score = boost.min(1.0);
    let probability = if indicators >= 4 {
        (ballad_score * 0.8 + fit_confidence * 0.2).min(0.98)
    } else if indicators >= 2 {
        (ballad_score * 0.7 + fit_confidence * 0.3).min(0.9)
    } else if indicators >= 1 {
        (ballad_score * 0.6 + fit_confidence * 0.4).min(0.8)
    } else {
        (ballad_score * 0.3 + fit_confidence * 0.7).min(0.6)
    };

    log::debug!(
        "Octave analysis {:.1} -> {:.1}: original_fit={:.2}, corrected_fit={:.2}, indicators={}, probability={:.2}",
        original_bpm,
        corrected_bpm,
        original_fit,
        corrected_fit,
        indicators,
        probability
    );

    probability
}

/// Validate a tempo estimate and correct octave errors
///
/// # Arguments
///
/// * `bpm` - Raw tempo estimate
/// * `confidence` - Raw confidence (0.0-1.0)
/// * `intervals` - Inter-beat intervals in seconds
/// * `policy` - Tuning table
///
/// # Returns
///
/// The corrected tempo and confidence with the kind of correction applied
pub fn validate_bpm(
    bpm: f32,
    confidence: f32,
    intervals: &[f32],
    policy: &OctavePolicy,
) -> OctaveCorrection {
    let unchanged = OctaveCorrection {
        bpm,
        confidence,
        kind: OctaveCorrectionKind::None,
        probability: None,
    };
    if !bpm.is_finite() || bpm <= 0.0 {
        return unchanged;
    }

    let mut last_probability = None;

    if within(policy.halving_range, bpm) {
        let half = bpm / 2.0;
        let probability = octave_error_probability(bpm, half, intervals);
        last_probability = Some(probability);

        for tier in policy.halving_tiers.iter() {
            if probability > tier.min_probability {
                log::info!(
                    "Octave error detected: {:.1} -> {:.1} BPM (probability {:.2})",
                    bpm,
                    half,
                    probability
                );
                return OctaveCorrection {
                    bpm: half,
                    confidence: (confidence + tier.boost).min(tier.cap),
                    kind: OctaveCorrectionKind::Half,
                    probability: Some(probability),
                };
            }
        }
        log::debug!("Possible octave error with very low probability: {:.2}", probability);
    }

    if within(policy.doubling_range, bpm) {
        let double = bpm * 2.0;
        if double <= policy.max_doubled_bpm {
            // (raw, candidate) like every other branch, not (double, raw)
            let probability = octave_error_probability(bpm, double, intervals);
            last_probability = Some(probability);
            if probability > policy.doubling_min_probability {
                log::info!("Half-time error detected: {:.1} -> {:.1} BPM", bpm, double);
                return OctaveCorrection {
                    bpm: double,
                    confidence: (confidence + policy.doubling_boost).min(policy.doubling_cap),
                    kind: OctaveCorrectionKind::Double,
                    probability: Some(probability),
                };
            }
        }
    } else if let Some(check) = [
        (&policy.quarter, OctaveCorrectionKind::Quarter),
        (&policy.third, OctaveCorrectionKind::Third),
    ]
    .into_iter()
    .find(|(check, _)| within(check.range, bpm))
    {
        let (ratio, kind) = check;
        let target = bpm / ratio.divisor;
        if within(ratio.target, target) {
            let probability = octave_error_probability(bpm, target, intervals);
            last_probability = Some(probability);
            if probability > ratio.min_probability {
                log::info!("Corrected {:?}-time error: {:.1} -> {:.1} BPM", kind, bpm, target);
                return OctaveCorrection {
                    bpm: target,
                    confidence: confidence * ratio.confidence_scale,
                    kind,
                    probability: Some(probability),
                };
            }
        }
    }

    if within(policy.ballad_range, bpm) && confidence < policy.ballad_max_confidence {
        let boosted = (confidence + policy.ballad_boost).min(1.0);
        log::info!(
            "Ballad tempo confidence boost: {:.1} BPM (confidence {:.2} -> {:.2})",
            bpm,
            confidence,
            boosted
        );
        return OctaveCorrection {
            bpm,
            confidence: boosted,
            kind: OctaveCorrectionKind::BalladBoost,
            probability: last_probability,
        };
    }

    OctaveCorrection {
        probability: last_probability,
        ..unchanged
    }
}
