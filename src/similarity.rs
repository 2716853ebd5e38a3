//! Similarity between a target histogram and a weighted sample combination
//!
//! similarity = 100 · (1 − Σⱼ|cⱼ − Tⱼ| / (2·Σⱼ|Tⱼ|)), clamped to [0, 100]
//!
//! For two vectors of equal mass this is exactly the histogram intersection
//! Σⱼ min(cⱼ, Tⱼ) expressed as a percentage of that mass: 100 when the
//! combination reproduces the target, 0 when they share no calls. Normalizing
//! by the target's magnitude makes the value independent of scale.

/// Tolerance below which a vector is treated as all-zero
const ZERO_MASS: f64 = 1e-12;

/// Σⱼ |aⱼ − bⱼ|
pub fn l1_deviation(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Similarity percentage of `combination` against `target`
///
/// When the target is the zero vector the result is 100 if the combination
/// is also (effectively) zero and 0 otherwise.
///
/// # Example
/// ```
/// use selector::similarity::similarity;
///
/// assert_eq!(similarity(&[50.0, 50.0], &[50.0, 50.0]), 100.0);
/// assert_eq!(similarity(&[100.0, 0.0], &[0.0, 100.0]), 0.0);
/// assert!((similarity(&[60.0, 40.0], &[50.0, 50.0]) - 90.0).abs() < 1e-9);
/// ```
pub fn similarity(target: &[f64], combination: &[f64]) -> f64 {
    let target_mass: f64 = target.iter().map(|v| v.abs()).sum();
    if target_mass <= ZERO_MASS {
        let combination_mass: f64 = combination.iter().map(|v| v.abs()).sum();
        return if combination_mass <= ZERO_MASS { 100.0 } else { 0.0 };
    }
    similarity_from_deviation(l1_deviation(target, combination), target_mass)
}

/// Similarity for a known L1 deviation against a target of `target_mass`
pub fn similarity_from_deviation(deviation: f64, target_mass: f64) -> f64 {
    (100.0 * (1.0 - deviation / (2.0 * target_mass))).clamp(0.0, 100.0)
}

/// Largest L1 deviation that still reaches `min_similarity`
pub fn deviation_budget(min_similarity: f64, target_mass: f64) -> f64 {
    2.0 * target_mass * (1.0 - min_similarity / 100.0)
}

/// Histogram intersection Σⱼ min(aⱼ, bⱼ)
pub fn intersection(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x.min(*y)).sum()
}
