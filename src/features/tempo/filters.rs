//! 1-D smoothing filters for tempo tracks and interval histograms
//!
//! Both filters follow the SciPy conventions the tempo constants were tuned against:
//! `gaussian_filter1d` with `truncate = 4.0` and `mode = "reflect"`, and a first-order
//! Savitzky-Golay filter with `mode = "interp"` edges.

/// Mirror an out-of-range index back into `0..n` (`d c b a | a b c d | d c b a`)
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Normalized Gaussian kernel with radius `round(4 * sigma)`
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|x| (-(x * x) as f32 / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Gaussian smoothing with reflected boundaries
///
/// A non-positive `sigma` returns the input unchanged.
pub fn gaussian_filter1d(values: &[f32], sigma: f32) -> Vec<f32> {
    if values.is_empty() || sigma <= 0.0 {
        return values.to_vec();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let n = values.len();

    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, &w)| w * values[reflect_index(i + k as isize - radius, n)])
                .sum()
        })
        .collect()
}

/// Least-squares line through `(x, y)` pairs, returned as `(intercept, slope)`
fn fit_line(xs: &[f32], ys: &[f32]) -> (f32, f32) {
    let n = xs.len() as f32;
    let mean_x = xs.iter().sum::<f32>() / n;
    let mean_y = ys.iter().sum::<f32>() / n;
    let sxx: f32 = xs.iter().map(|&x| (x - mean_x) * (x - mean_x)).sum();
    if sxx <= f32::EPSILON {
        return (mean_y, 0.0);
    }
    let sxy: f32 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x - mean_x) * (y - mean_y))
        .sum();
    let slope = sxy / sxx;
    (mean_y - slope * mean_x, slope)
}

/// First-order Savitzky-Golay filter
///
/// Interior points get the centered moving average over `window` samples (the value of
/// a local linear fit at its center). The first and last `window / 2` points are
/// evaluated on a single line fitted to the first (last) `window` samples.
///
/// `window` is reduced to the largest odd value not above `values.len()`; windows below 3
/// return the input unchanged.
pub fn savgol_linear(values: &[f32], window: usize) -> Vec<f32> {
    let n = values.len();
    let mut window = window.min(n);
    if window % 2 == 0 {
        window = window.saturating_sub(1);
    }
    if window < 3 {
        return values.to_vec();
    }

    let half = window / 2;
    let mut out = vec![0.0f32; n];

    for i in half..n - half {
        out[i] = values[i - half..=i + half].iter().sum::<f32>() / window as f32;
    }

    let xs: Vec<f32> = (0..window).map(|x| x as f32).collect();

    let (a, b) = fit_line(&xs, &values[..window]);
    for (i, slot) in out.iter_mut().enumerate().take(half) {
        *slot = a + b * i as f32;
    }

    let (a, b) = fit_line(&xs, &values[n - window..]);
    for i in n - half..n {
        out[i] = a + b * (i - (n - window)) as f32;
    }

    out
}
