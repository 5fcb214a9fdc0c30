use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Seeded generator when a seed is given, entropy-seeded otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Standard deviation used for latent factors of dimensionality `k`.
pub fn factor_std(k: usize) -> f64 {
    1.0 / k as f64
}

/// Box-Muller Gaussian sample.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // u1 in (0, 1] keeps ln finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

pub fn normal<R: Rng + ?Sized>(rng: &mut R, size: usize, mean: f64, std_dev: f64) -> Vec<f64> {
    (0..size)
        .map(|_| standard_normal(rng) * std_dev + mean)
        .collect()
}

/// Zero-mean Gaussian factor vector with standard deviation `1/k`.
pub fn factor_vector<R: Rng + ?Sized>(rng: &mut R, k: usize) -> Array1<f64> {
    Array1::from_vec(normal(rng, k, 0.0, factor_std(k)))
}

/// `rows x k` matrix of zero-mean Gaussian factors with standard deviation `1/k`.
pub fn factor_matrix<R: Rng + ?Sized>(rng: &mut R, rows: usize, k: usize) -> Array2<f64> {
    let std_dev = factor_std(k);
    Array2::from_shape_fn((rows, k), |_| standard_normal(rng) * std_dev)
}
