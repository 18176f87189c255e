//! Small descriptive-statistics helpers shared by the rhythm stages
//!
//! All functions use population statistics (divide by `n`) and treat an empty slice as
//! having no defined value.

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

/// Population variance, `None` for an empty slice
pub fn variance(values: &[f32]) -> Option<f32> {
    let m = mean(values)?;
    Some(values.iter().map(|&v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32)
}

/// Population standard deviation, `None` for an empty slice
pub fn std_dev(values: &[f32]) -> Option<f32> {
    variance(values).map(f32::sqrt)
}

/// Median (mean of the two middle values for even lengths), `None` for an empty slice
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) * 0.5)
    } else {
        Some(sorted[mid])
    }
}

/// Coefficient of variation `std / mean`, 0.0 when the mean is not positive
pub fn coefficient_of_variation(values: &[f32]) -> f32 {
    match (mean(values), std_dev(values)) {
        (Some(m), Some(s)) if m > 0.0 => s / m,
        _ => 0.0,
    }
}

/// First differences `x[i + 1] - x[i]`
pub fn diff(values: &[f32]) -> Vec<f32> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}
