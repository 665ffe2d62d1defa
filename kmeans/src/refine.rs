//! Lloyd refinement loop
//!
//! One run walks `INIT → ACCUMULATE → NORMALIZE → REASSIGN` and loops back to
//! accumulation while more than [`min_accepted_error`] labels changed. Every
//! phase is handed to the [`ExecutionBackend`] and fully joins before the next
//! one starts.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::RngExt;

use crate::{
    backend::ExecutionBackend,
    context::RefineContext,
    error::{KMeansError, Result},
    types::{Centroid, CentroidTable, Observation},
};

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// `k <= 1`, a single centroid at the mean
    Trivial,
    /// `k >= size`, one singleton centroid per point
    Degenerate,
    /// Changed labels dropped to the accepted error
    Converged,
    /// Stopped by [`RefineContext::max_iterations`] before converging
    IterationCap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationStats {
    /// Labels rewritten by the reassignment phase
    pub changed: usize,
    /// Accumulate and normalize
    pub accumulate: Duration,
    pub reassign: Duration,
}

/// Result of a refinement run; final labels are left in the point store
#[derive(Clone, Debug, PartialEq)]
pub struct Refinement {
    pub centroids: Vec<Centroid>,
    pub iterations: usize,
    pub status: Status,
    pub history: Vec<IterationStats>,
}

impl Refinement {
    fn finished(centroids: Vec<Centroid>, status: Status) -> Self {
        Self { centroids, iterations: 0, status, history: Vec::new() }
    }

    pub fn converged(&self) -> bool {
        self.status != Status::IterationCap
    }

    /// Time spent in the iterated phases
    pub fn elapsed(&self) -> Duration {
        self.history.iter().map(|it| it.accumulate + it.reassign).sum()
    }
}

/// Number of label changes still accepted as converged (0.01% of the points)
pub fn min_accepted_error(size: usize) -> usize {
    size / 10_000
}

/// Cluster `points` into `k` groups starting from a random labelling
///
/// # Arguments
/// * `points` - Point store, labels are overwritten
/// * `k` - Requested number of clusters
/// * `backend` - Strategy running the accumulation and reassignment phases
/// * `ctx` - Seed and optional iteration cap
///
/// # Errors
/// * [`KMeansError::EmptyInput`] for an empty point store
/// * Any backend failure, which aborts the run without committing the phase
pub fn fit<B>(
    points: &mut [Observation],
    k: usize,
    backend: &B,
    ctx: &RefineContext,
) -> Result<Refinement>
where
    B: ExecutionBackend + ?Sized,
{
    if points.is_empty() {
        return Err(KMeansError::EmptyInput);
    }
    if let Some(done) = initialize_trivial(points, k)? {
        return Ok(done);
    }

    let mut rng = ctx.seed.rng();
    points.iter_mut().for_each(|point| point.group = rng.random_range(0..k));

    refine(points, k, backend, ctx)
}

/// Same as [`fit`], but keeps the labels already present in `points`
///
/// # Errors
/// * [`KMeansError::InvalidLabel`] if a label does not fit `k`
pub fn fit_preassigned<B>(
    points: &mut [Observation],
    k: usize,
    backend: &B,
    ctx: &RefineContext,
) -> Result<Refinement>
where
    B: ExecutionBackend + ?Sized,
{
    if points.is_empty() {
        return Err(KMeansError::EmptyInput);
    }
    if let Some(done) = initialize_trivial(points, k)? {
        return Ok(done);
    }
    if let Some((index, point)) = points.iter().enumerate().find(|(_, p)| p.group >= k) {
        return Err(KMeansError::InvalidLabel { index, group: point.group, k });
    }

    refine(points, k, backend, ctx)
}

fn initialize_trivial(points: &mut [Observation], k: usize) -> Result<Option<Refinement>> {
    let size = points.len();

    if k <= 1 {
        let (sum_x, sum_y) = points.iter_mut().fold((0.0, 0.0), |(sx, sy), point| {
            point.group = 0;
            (sx + point.x, sy + point.y)
        });
        let centroid = Centroid { x: sum_x / size as f64, y: sum_y / size as f64, count: size };
        debug!("k = {k}, single centroid over {size} points");
        return Ok(Some(Refinement::finished(vec![centroid], Status::Trivial)));
    }

    if k >= size {
        let mut table = CentroidTable::zeroed(k)?;
        for (i, (point, centroid)) in points.iter_mut().zip(table.as_mut_slice()).enumerate() {
            *centroid = Centroid { x: point.x, y: point.y, count: 1 };
            point.group = i;
        }
        debug!("k = {k} >= {size} points, every point is its own centroid");
        return Ok(Some(Refinement::finished(table.into_vec(), Status::Degenerate)));
    }

    Ok(None)
}

fn refine<B>(
    points: &mut [Observation],
    k: usize,
    backend: &B,
    ctx: &RefineContext,
) -> Result<Refinement>
where
    B: ExecutionBackend + ?Sized,
{
    if ctx.max_iterations == Some(0) {
        return Err(KMeansError::InvalidConfig("max iterations must be at least 1".into()));
    }

    let size = points.len();
    let threshold = min_accepted_error(size);
    let mut table = CentroidTable::zeroed(k)?;
    let mut history = Vec::new();
    let caps = backend.capabilities();
    debug!(
        "refining {size} points into {k} groups on {} ({} workers), accepted error {threshold}",
        backend.name(),
        caps.workers
    );

    let status = loop {
        let timer = Instant::now();
        let sums = backend.accumulate(points, k)?;
        let found = sums.total();
        if found != size {
            return Err(KMeansError::AccumulationMismatch { expected: size, found });
        }
        backend.normalize(&mut table, &sums);
        let accumulate = timer.elapsed();

        let timer = Instant::now();
        let changed = backend.reassign(points, table.as_slice())?;
        let reassign = timer.elapsed();

        history.push(IterationStats { changed, accumulate, reassign });
        debug!(
            "iteration {}: {changed} changed, accumulate {accumulate:?}, reassign {reassign:?}",
            history.len()
        );

        if changed <= threshold {
            break Status::Converged;
        }
        if ctx.max_iterations.is_some_and(|cap| history.len() >= cap) {
            warn!(
                "stopped after {} iterations with {changed} labels still changing (accepted {threshold})",
                history.len()
            );
            break Status::IterationCap;
        }
    };

    let refinement = Refinement {
        centroids: table.into_vec(),
        iterations: history.len(),
        status,
        history,
    };
    info!(
        "{}: {:?} after {} iterations in {:?}",
        backend.name(),
        refinement.status,
        refinement.iterations,
        refinement.elapsed()
    );
    Ok(refinement)
}
