//! Synthetic inputs for benchmarks and liveness tests

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    error::{KMeansError, Result},
    types::Observation,
};

/// Isotropic Gaussian blobs, `per_blob` points around each center
///
/// Points are emitted blob after blob with unassigned labels.
///
/// # Errors
/// * [`KMeansError::Distribution`] for a negative or non-finite `sigma`
/// * [`KMeansError::Allocation`] if the point store cannot be reserved
pub fn gaussian_blobs(
    centers: &[(f64, f64)],
    per_blob: usize,
    sigma: f64,
    seed: u64,
) -> Result<Vec<Observation>> {
    if sigma < 0.0 {
        return Err(KMeansError::Distribution(format!("negative standard deviation {sigma}")));
    }
    let noise = Normal::new(0.0, sigma).map_err(|e| KMeansError::Distribution(e.to_string()))?;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let mut points = reserved(centers.len().checked_mul(per_blob), "synthetic points")?;
    for &(cx, cy) in centers {
        for _ in 0..per_blob {
            let x = cx + noise.sample(&mut rng);
            let y = cy + noise.sample(&mut rng);
            points.push(Observation::new(x, y));
        }
    }
    Ok(points)
}

/// Concatenate `factor` copies of `points`, labels reset
///
/// # Errors
/// * [`KMeansError::Allocation`] if the copies do not fit in memory
pub fn replicate(points: &[Observation], factor: usize) -> Result<Vec<Observation>> {
    let mut replicated = reserved(points.len().checked_mul(factor), "replicated points")?;
    for _ in 0..factor {
        replicated.extend(points.iter().map(|p| Observation::new(p.x, p.y)));
    }
    Ok(replicated)
}

/// Empty Vec with room for `len` points; an overflowed length fails as a capacity overflow
fn reserved(len: Option<usize>, what: &'static str) -> Result<Vec<Observation>> {
    let mut points = Vec::new();
    points
        .try_reserve_exact(len.unwrap_or(usize::MAX))
        .map_err(KMeansError::allocation(what))?;
    Ok(points)
}
