//! Subdivision correction
//!
//! Tempo trackers often lock onto a subdivision of the felt beat (172 BPM for a song felt
//! at 86). The sequence tempo is re-scored at half, unchanged and double tempo against a
//! musical-plausibility table, and the beat grid is resampled to the winner.

/// Candidate factors, in tie-break order
pub const SUBDIVISION_FACTORS: [f32; 3] = [0.5, 1.0, 2.0];

/// Plausibility of a tempo in BPM
///
/// Base score by range (ballad 40-80: 2.0, normal 80-140: 1.5, fast 140-200: 1.0,
/// otherwise 0.1) plus a classic-ballad bonus for 55-70 (+1.0) or a moderate-tempo bonus
/// for 110-130 (+0.5).
pub fn plausibility_score(bpm: f32) -> f32 {
    let base = if (40.0..=80.0).contains(&bpm) {
        2.0
    } else if (80.0..=140.0).contains(&bpm) {
        1.5
    } else if (140.0..=200.0).contains(&bpm) {
        1.0
    } else {
        0.1
    };

    let bonus = if (55.0..=70.0).contains(&bpm) {
        1.0
    } else if (110.0..=130.0).contains(&bpm) {
        0.5
    } else {
        0.0
    };

    base + bonus
}

/// Best subdivision factor for `bpm`; the earliest candidate wins ties
pub fn choose_factor(bpm: f32) -> f32 {
    let mut best_factor = 1.0;
    let mut best_score = f32::NEG_INFINITY;
    for &factor in SUBDIVISION_FACTORS.iter() {
        let score = plausibility_score(bpm * factor);
        log::debug!(
            "Subdivision test: {}x = {:.1} BPM, score: {:.1}",
            factor,
            bpm * factor,
            score
        );
        if score > best_score {
            best_score = score;
            best_factor = factor;
        }
    }
    best_factor
}

/// Resample a beat grid by a subdivision factor
///
/// * `0.5` keeps beats 0, 2, 4, ... (`ceil(n / 2)` beats)
/// * `2.0` inserts the midpoint of every consecutive pair (`2n - 1` beats)
/// * anything else returns the grid unchanged
pub fn apply_factor(beats: &[f32], factor: f32) -> Vec<f32> {
    if factor == 0.5 {
        beats.iter().step_by(2).copied().collect()
    } else if factor == 2.0 {
        let mut out = Vec::with_capacity(beats.len() * 2);
        for pair in beats.windows(2) {
            out.push(pair[0]);
            out.push((pair[0] + pair[1]) * 0.5);
        }
        if let Some(&last) = beats.last() {
            out.push(last);
        }
        out
    } else {
        beats.to_vec()
    }
}

/// Outcome of subdivision correction
#[derive(Debug, Clone)]
pub struct SubdivisionCorrection {
    /// Corrected tempo in BPM
    pub bpm: f32,
    /// Applied factor (0.5, 1.0 or 2.0)
    pub factor: f32,
    /// Resampled beat grid
    pub beats: Vec<f32>,
}

/// Choose and apply the most plausible subdivision
pub fn correct_subdivision(bpm: f32, beats: &[f32]) -> SubdivisionCorrection {
    let factor = choose_factor(bpm);
    if factor != 1.0 {
        log::info!(
            "Applying subdivision correction: {:.1} BPM -> {:.1} BPM (factor: {}x)",
            bpm,
            bpm * factor,
            factor
        );
    }
    SubdivisionCorrection {
        bpm: bpm * factor,
        factor,
        beats: apply_factor(beats, factor),
    }
}
