//! Single-threaded reference backend

use crate::{
    backend::{Capabilities, ExecutionBackend, accumulate_range, reassign_range},
    error::Result,
    types::{Centroid, CentroidSums, Observation},
};

/// Runs both phases as one pass on the calling thread
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl ExecutionBackend for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            parallel_accumulate: false,
            offload_accumulate: false,
            offload_reassign: false,
            workers: 1,
        }
    }

    fn accumulate(&self, points: &[Observation], k: usize) -> Result<CentroidSums> {
        let mut sums = CentroidSums::zero(k)?;
        accumulate_range(&mut sums, 0, points)?;
        Ok(sums)
    }

    fn reassign(&self, points: &mut [Observation], centroids: &[Centroid]) -> Result<usize> {
        Ok(reassign_range(points, centroids))
    }
}
