//! Execution backends
//!
//! The refinement loop only depends on the [`ExecutionBackend`] trait. Each
//! backend decides how the accumulation and reassignment phases are split
//! across workers or a device; none of them changes the algorithmic result
//! beyond the order in which floating point partial sums are added.
//!
//! ```text
//! ┌──────────────┬─────────────────────────┬──────────────────────────────┐
//! │ backend      │ accumulate              │ reassign                     │
//! ├──────────────┼─────────────────────────┼──────────────────────────────┤
//! │ sequential   │ single pass             │ single pass                  │
//! │ threaded     │ local buffers + mutex   │ disjoint ranges, summed      │
//! │ offload      │ fold / reduce clause    │ offloaded loop, sum clause   │
//! │ discrete     │ host (or device blocks) │ upload, kernel, download     │
//! └──────────────┴─────────────────────────┴──────────────────────────────┘
//! ```

use std::{fmt, str::FromStr};

use crate::{
    error::{KMeansError, Result},
    nearest::nearest,
    types::{Centroid, CentroidSums, CentroidTable, Observation},
};

mod device;
mod discrete;
mod offload;
mod sequential;
mod threaded;

pub use device::{Device, DeviceBuffers, HostDevice};
pub use discrete::Discrete;
pub use offload::Offload;
pub use sequential::Sequential;
pub use threaded::Threaded;

/// What a backend runs in parallel and where
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Accumulation is split across workers
    pub parallel_accumulate: bool,
    /// Accumulation runs on the offload target instead of the host
    pub offload_accumulate: bool,
    /// Reassignment runs on the offload target instead of the host
    pub offload_reassign: bool,
    /// Number of workers used by the parallel phases (1 when sequential)
    pub workers: usize,
}

/// Parallel primitives the refinement loop is written against
pub trait ExecutionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Sum coordinates and counts of all points per current label
    ///
    /// # Errors
    /// * [`KMeansError::InvalidLabel`] if a label does not fit `k`
    /// * [`KMeansError::Allocation`] if an accumulator cannot be allocated
    fn accumulate(&self, points: &[Observation], k: usize) -> Result<CentroidSums>;

    /// Turn sums into coordinates, keeping stale coordinates of empty slots
    fn normalize(&self, table: &mut CentroidTable, sums: &CentroidSums) {
        table.normalize(sums);
    }

    /// Relabel every point to its nearest centroid
    ///
    /// # Returns
    /// * Number of points whose label changed
    fn reassign(&self, points: &mut [Observation], centroids: &[Centroid]) -> Result<usize>;
}

impl<B: ExecutionBackend + ?Sized> ExecutionBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }
    fn accumulate(&self, points: &[Observation], k: usize) -> Result<CentroidSums> {
        (**self).accumulate(points, k)
    }
    fn normalize(&self, table: &mut CentroidTable, sums: &CentroidSums) {
        (**self).normalize(table, sums)
    }
    fn reassign(&self, points: &mut [Observation], centroids: &[Centroid]) -> Result<usize> {
        (**self).reassign(points, centroids)
    }
}

/// Fold a contiguous range starting at global index `offset` into `sums`
pub(crate) fn accumulate_range(
    sums: &mut CentroidSums,
    offset: usize,
    points: &[Observation],
) -> Result<()> {
    points
        .iter()
        .enumerate()
        .try_for_each(|(i, point)| sums.add_checked(offset + i, point))
}

/// Relabel one point, returning whether its label changed
#[inline]
pub(crate) fn reassign_one(point: &mut Observation, centroids: &[Centroid]) -> bool {
    let group = nearest(point.x, point.y, centroids);
    if group != point.group {
        point.group = group;
        return true;
    }
    false
}

/// Relabel a range, returning how many labels changed
pub(crate) fn reassign_range(points: &mut [Observation], centroids: &[Centroid]) -> usize {
    points
        .iter_mut()
        .map(|point| reassign_one(point, centroids) as usize)
        .sum()
}

/// Backend selector used by configuration and the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Sequential,
    Threaded,
    Offload,
    Discrete,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Sequential,
        BackendKind::Threaded,
        BackendKind::Offload,
        BackendKind::Discrete,
    ];

    /// Whether the worker count changes how this backend runs
    pub fn uses_workers(&self) -> bool {
        !matches!(self, BackendKind::Sequential)
    }

    /// Construct the backend
    ///
    /// # Arguments
    /// * `options` - Worker count and device parameters; ignored where they do not apply
    ///
    /// # Errors
    /// * [`KMeansError::ThreadPool`] if a worker pool cannot be started
    /// * [`KMeansError::InvalidConfig`] for a zero worker count or block size
    pub fn build(&self, options: &BackendOptions) -> Result<Box<dyn ExecutionBackend>> {
        if options.workers == 0 {
            return Err(KMeansError::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(match self {
            BackendKind::Sequential => Box::new(Sequential),
            BackendKind::Threaded => Box::new(Threaded::new(options.workers)?),
            BackendKind::Offload => Box::new(Offload::new(options.workers)?),
            BackendKind::Discrete => Box::new(Discrete::new(
                HostDevice::new(options.workers)?,
                options.block_size,
                options.device_accumulate,
            )?),
        })
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            BackendKind::Sequential => "sequential",
            BackendKind::Threaded => "threaded",
            BackendKind::Offload => "offload",
            BackendKind::Discrete => "discrete",
        })
    }
}

impl FromStr for BackendKind {
    type Err = KMeansError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "seq" => Ok(BackendKind::Sequential),
            "threaded" | "cpu" => Ok(BackendKind::Threaded),
            "offload" => Ok(BackendKind::Offload),
            "discrete" | "gpu" => Ok(BackendKind::Discrete),
            other => Err(KMeansError::InvalidConfig(format!("unknown backend '{other}'"))),
        }
    }
}

/// Parameters shared by backend constructors
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendOptions {
    pub workers: usize,
    /// Points per kernel block on the discrete backend
    pub block_size: usize,
    /// Run accumulation as a device-side segmented reduction
    pub device_accumulate: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self { workers: 1, block_size: 256, device_accumulate: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
        assert_eq!(" GPU ".parse::<BackendKind>().unwrap(), BackendKind::Discrete);
        assert!("opencl".parse::<BackendKind>().is_err());
    }

    #[test]
    fn build_reports_capabilities() {
        let options = BackendOptions { workers: 2, ..Default::default() };
        let seq = BackendKind::Sequential.build(&options).unwrap();
        assert_eq!(seq.capabilities().workers, 1);
        assert!(!seq.capabilities().parallel_accumulate);

        let threaded = BackendKind::Threaded.build(&options).unwrap();
        assert_eq!(threaded.capabilities().workers, 2);
        assert!(threaded.capabilities().parallel_accumulate);
        assert!(!threaded.capabilities().offload_reassign);

        let discrete = BackendKind::Discrete.build(&options).unwrap();
        assert!(discrete.capabilities().offload_reassign);
        assert!(!discrete.capabilities().offload_accumulate);

        let options = BackendOptions { device_accumulate: true, ..options };
        let discrete = BackendKind::Discrete.build(&options).unwrap();
        assert!(discrete.capabilities().offload_accumulate);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let options = BackendOptions { workers: 0, ..Default::default() };
        assert!(matches!(
            BackendKind::Threaded.build(&options),
            Err(KMeansError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reassign_range_counts_changes() {
        let centroids = [
            Centroid { x: 0.0, y: 0.0, count: 0 },
            Centroid { x: 10.0, y: 0.0, count: 0 },
        ];
        let mut points = vec![
            Observation { x: 1.0, y: 0.0, group: 0 },
            Observation { x: 9.0, y: 0.0, group: 0 },
            Observation { x: 8.0, y: 1.0, group: 1 },
        ];
        assert_eq!(reassign_range(&mut points, &centroids), 1);
        assert_eq!(points.iter().map(|p| p.group).collect::<Vec<_>>(), vec![0, 1, 1]);
    }
}
