//! Peak detection for onset envelopes
//!
//! Mirrors the semantics of SciPy's `find_peaks(x, height=h, distance=d)`:
//!
//! 1. Strict local maxima; flat plateaus count once, at their middle sample
//! 2. Height filter (`x[peak] >= height`)
//! 3. Distance suppression: peaks are visited from tallest to shortest and every
//!    lower-priority peak closer than `distance` samples to a kept peak is removed
//!
//! The returned indices are sorted ascending.
//!
//! # Example
//!
//! ```
//! use cadenza_dsp::features::onset::peak_picking::find_peaks;
//!
//! let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
//! let peaks = find_peaks(&signal, 0.5, 2);
//! assert_eq!(peaks, vec![2, 5]);
//! ```

/// Local maxima with plateau handling
///
/// Returns the midpoint (rounded down) of each rising-then-falling run. Edge samples are
/// never peaks.
fn local_maxima(signal: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let right_edge = ahead - 1;
                peaks.push((i + right_edge) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    peaks
}

/// Remove peaks closer than `distance` to a taller peak
fn select_by_distance(peaks: &[usize], signal: &[f32], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    let mut keep = vec![true; peaks.len()];

    // Tallest first; ties favour the later index like NumPy's argsort visited backwards
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        signal[peaks[a]]
            .partial_cmp(&signal[peaks[b]])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }

        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Find peaks above `height` separated by at least `distance` samples
///
/// # Arguments
///
/// * `signal` - Envelope to search
/// * `height` - Minimum peak height (inclusive)
/// * `distance` - Minimum index distance between kept peaks (0 or 1 disables the check)
///
/// # Returns
///
/// Ascending peak indices
pub fn find_peaks(signal: &[f32], height: f32, distance: usize) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(signal)
        .into_iter()
        .filter(|&i| signal[i] >= height)
        .collect();

    let peaks = select_by_distance(&candidates, signal, distance);

    log::debug!(
        "find_peaks: {} samples, height={:.3}, distance={} -> {} peaks",
        signal.len(),
        height,
        distance,
        peaks.len()
    );

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plateau_resolves_to_middle() {
        let signal = vec![0.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(find_peaks(&signal, 0.0, 1), vec![2]);

        let signal = vec![0.0, 1.0, 1.0, 0.0];
        assert_eq!(find_peaks(&signal, 0.0, 1), vec![1]);
    }

    #[test]
    fn test_edges_are_not_peaks() {
        let signal = vec![5.0, 1.0, 2.0, 1.0, 5.0];
        assert_eq!(find_peaks(&signal, 0.0, 1), vec![2]);
    }

    #[test]
    fn test_height_is_inclusive() {
        let signal = vec![0.0, 0.5, 0.0, 0.4, 0.0];
        assert_eq!(find_peaks(&signal, 0.5, 1), vec![1]);
    }

    #[test]
    fn test_distance_keeps_tallest() {
        let signal = vec![0.0, 0.6, 0.0, 1.0, 0.0, 0.7, 0.0, 0.0, 0.0, 0.8, 0.0];
        // 1.0 at 3 suppresses 1 and 5; 9 is far enough away
        assert_eq!(find_peaks(&signal, 0.0, 4), vec![3, 9]);
    }

    #[test]
    fn test_rising_plateau_to_edge_is_not_peak() {
        let signal = vec![0.0, 1.0, 1.0, 1.0];
        assert!(find_peaks(&signal, 0.0, 1).is_empty());
    }

    #[test]
    fn test_short_signals() {
        assert!(find_peaks(&[], 0.0, 1).is_empty());
        assert!(find_peaks(&[1.0, 2.0], 0.0, 1).is_empty());
    }
}
