//! Coarse-grained offloaded loop backend
//!
//! Both phases are expressed as one data-parallel loop over all points with a
//! reduction clause, leaving the split into work items to the runtime:
//! accumulation folds points into per-split sums and reduces them pairwise,
//! reassignment sums the per-point change flags.

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{
    backend::{Capabilities, ExecutionBackend, reassign_one},
    error::Result,
    types::{Centroid, CentroidSums, CentroidTable, Observation},
};

/// Offloaded loop with tree reduction
#[derive(Debug)]
pub struct Offload {
    pool: ThreadPool,
    workers: usize,
}

impl Offload {
    /// Start the offload target with `workers` execution units
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("kmeans-offload-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }
}

impl ExecutionBackend for Offload {
    fn name(&self) -> &'static str {
        "offload"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            parallel_accumulate: true,
            offload_accumulate: true,
            offload_reassign: true,
            workers: self.workers,
        }
    }

    fn accumulate(&self, points: &[Observation], k: usize) -> Result<CentroidSums> {
        self.pool.install(|| {
            points
                .par_iter()
                .enumerate()
                // Step 1: fold every split of the loop into its own sums
                .fold(
                    || CentroidSums::zero(k),
                    |acc: Result<CentroidSums>, (index, point)| {
                        let mut acc = acc?;
                        acc.add_checked(index, point)?;
                        Ok(acc)
                    },
                )
                // Step 2: pairwise reduction of the partial sums
                .reduce(
                    || CentroidSums::zero(k),
                    |left, right| Ok(left?.sum_by_field(&right?)),
                )
        })
    }

    fn normalize(&self, table: &mut CentroidTable, sums: &CentroidSums) {
        self.pool.install(|| table.normalize_parallel(sums));
    }

    fn reassign(&self, points: &mut [Observation], centroids: &[Centroid]) -> Result<usize> {
        Ok(self.pool.install(|| {
            points
                .par_iter_mut()
                .map(|point| reassign_one(point, centroids) as usize)
                .sum()
        }))
    }
}
