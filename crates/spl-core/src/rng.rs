use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

use crate::constants::NORM_EPSILON;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Draw one standard-normal sample.
///
/// Box-Muller on the caller's stream.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Vector of `dims` independent N(0, scale²) samples.
pub fn gaussian_vector<R: Rng + ?Sized>(rng: &mut R, dims: usize, scale: f64) -> Vec<f64> {
    (0..dims).map(|_| standard_normal(rng) * scale).collect()
}

/// Uniformly distributed direction on the unit sphere.
///
/// A degenerate (near-zero) draw is returned unnormalized rather than retried,
/// so the number of RNG draws per call stays fixed.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R, dims: usize) -> Vec<f64> {
    let mut v = gaussian_vector(rng, dims, 1.0);
    let norm = crate::geometry::norm(&v);
    if norm > NORM_EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
