//! Chroma normalization

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Scale a chroma vector in place so its largest bin is 1.0
///
/// All-zero (or near-zero) vectors are left untouched.
pub fn normalize_max(chroma: &mut [f32]) {
    let max = chroma.iter().cloned().fold(0.0f32, f32::max);
    if max > EPSILON {
        chroma.iter_mut().for_each(|v| *v /= max);
    }
}

/// Euclidean norm
pub fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Cosine similarity of two vectors of equal length
///
/// Returns 0.0 when either vector has (near-)zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na <= EPSILON || nb <= EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (na * nb)
}
