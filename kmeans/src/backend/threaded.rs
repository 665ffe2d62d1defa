//! Shared-memory multi-threaded backend
//!
//! Accumulation gives every worker a private set of k slots and merges them
//! into the result under a mutex. Reassignment hands every worker a disjoint
//! mutable range of points and adds up the per-range change counts.

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    backend::{Capabilities, ExecutionBackend, reassign_range},
    error::Result,
    partition::{map_partitioned_mut, reduce_partitioned},
    types::{Centroid, CentroidSums, CentroidTable, Observation},
};

/// Worker pool with thread-local accumulation
#[derive(Debug)]
pub struct Threaded {
    pool: ThreadPool,
    workers: usize,
}

impl Threaded {
    /// Start a dedicated pool of `workers` threads
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("kmeans-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl ExecutionBackend for Threaded {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            parallel_accumulate: true,
            offload_accumulate: false,
            offload_reassign: false,
            workers: self.workers,
        }
    }

    fn accumulate(&self, points: &[Observation], k: usize) -> Result<CentroidSums> {
        reduce_partitioned(
            &self.pool,
            points,
            self.workers,
            || CentroidSums::zero(k),
            |local, index, point| local.add_checked(index, point),
            CentroidSums::merge,
        )
    }

    fn normalize(&self, table: &mut CentroidTable, sums: &CentroidSums) {
        self.pool.install(|| table.normalize_parallel(sums));
    }

    fn reassign(&self, points: &mut [Observation], centroids: &[Centroid]) -> Result<usize> {
        map_partitioned_mut(&self.pool, points, self.workers, |_, chunk| {
            Ok(reassign_range(chunk, centroids))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Sequential;

    fn grid(n: usize, k: usize) -> Vec<Observation> {
        (0..n)
            .map(|i| Observation { x: (i % 17) as f64, y: (i / 17) as f64 * 0.5, group: i % k })
            .collect()
    }

    #[test]
    fn counts_cover_every_point_for_all_worker_counts() {
        let points = grid(1003, 5);
        let reference = Sequential.accumulate(&points, 5).unwrap();
        for workers in [1, 2, 4, 8] {
            let backend = Threaded::new(workers).unwrap();
            let sums = backend.accumulate(&points, 5).unwrap();
            assert_eq!(sums.total(), points.len());
            assert_eq!(sums.count, reference.count);
            for (a, b) in sums.sum_x.iter().zip(&reference.sum_x) {
                assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0));
            }
        }
    }

    #[test]
    fn reassign_matches_sequential() {
        let centroids = [
            Centroid { x: 2.0, y: 2.0, count: 0 },
            Centroid { x: 12.0, y: 10.0, count: 0 },
            Centroid { x: 4.0, y: 20.0, count: 0 },
        ];
        let mut expected = grid(500, 3);
        let changed = Sequential.reassign(&mut expected, &centroids).unwrap();
        for workers in [1, 3, 8] {
            let mut points = grid(500, 3);
            let backend = Threaded::new(workers).unwrap();
            assert_eq!(backend.reassign(&mut points, &centroids).unwrap(), changed);
            assert_eq!(points, expected);
        }
    }

    #[test]
    fn more_workers_than_points() {
        let points = grid(3, 2);
        let backend = Threaded::new(8).unwrap();
        assert_eq!(backend.accumulate(&points, 2).unwrap().total(), 3);
    }
}
