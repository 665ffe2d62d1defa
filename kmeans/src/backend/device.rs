//! Device abstraction for the explicit-transfer backend
//!
//! A device owns its own copies of the data. The host stages point
//! coordinates, labels and the centroid table into [`DeviceBuffers`], launches
//! block-partitioned kernels over them and copies the labels back. Nothing
//! stays resident between iterations.

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{
    error::{KMeansError, Result},
    nearest::nearest,
    types::{Centroid, CentroidSums, Observation, zeroed_vec},
};

/// Struct-of-arrays copy of the point store and centroid table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceBuffers {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub groups: Vec<usize>,
    pub centroids: Vec<Centroid>,
}

impl DeviceBuffers {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Memory transfers and kernels of an offload device
pub trait Device: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of blocks the device runs concurrently
    fn units(&self) -> usize;

    /// Copy points and centroids host to device
    ///
    /// # Errors
    /// * [`KMeansError::Allocation`] when device memory cannot be reserved
    fn upload(&self, points: &[Observation], centroids: &[Centroid]) -> Result<DeviceBuffers>;

    /// Relabel every point on the device
    ///
    /// # Returns
    /// * One changed count per block, reduced by the caller
    fn launch_reassign(&self, buffers: &mut DeviceBuffers, block_size: usize) -> Result<Vec<usize>>;

    /// Per-block partial sums of the current labels
    fn launch_accumulate(
        &self,
        buffers: &DeviceBuffers,
        k: usize,
        block_size: usize,
    ) -> Result<Vec<CentroidSums>>;

    /// Copy labels device to host
    fn download(&self, buffers: &DeviceBuffers, points: &mut [Observation]) -> Result<()>;
}

/// Device that executes kernels on a host worker pool
///
/// Stands in for real accelerator memory: buffers are separate allocations
/// that only reach the point store through [`Device::download`].
#[derive(Debug)]
pub struct HostDevice {
    pool: ThreadPool,
    units: usize,
}

impl HostDevice {
    pub fn new(units: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(units)
            .thread_name(|i| format!("kmeans-device-{i}"))
            .build()?;
        Ok(Self { pool, units })
    }
}

impl Device for HostDevice {
    fn name(&self) -> &'static str {
        "host"
    }

    fn units(&self) -> usize {
        self.units
    }

    fn upload(&self, points: &[Observation], centroids: &[Centroid]) -> Result<DeviceBuffers> {
        let mut buffers = DeviceBuffers {
            x: zeroed_vec(points.len(), "device coordinates")?,
            y: zeroed_vec(points.len(), "device coordinates")?,
            groups: zeroed_vec(points.len(), "device labels")?,
            centroids: zeroed_vec(centroids.len(), "device centroids")?,
        };
        for (i, point) in points.iter().enumerate() {
            buffers.x[i] = point.x;
            buffers.y[i] = point.y;
            buffers.groups[i] = point.group;
        }
        buffers.centroids.copy_from_slice(centroids);
        Ok(buffers)
    }

    fn launch_reassign(&self, buffers: &mut DeviceBuffers, block_size: usize) -> Result<Vec<usize>> {
        let DeviceBuffers { x, y, groups, centroids } = buffers;
        let (x, y, centroids) = (&*x, &*y, &*centroids);
        Ok(self.pool.install(|| {
            groups
                .par_chunks_mut(block_size)
                .enumerate()
                .map(|(block, labels)| {
                    let base = block * block_size;
                    let mut changed = 0;
                    for (i, label) in labels.iter_mut().enumerate() {
                        let best = nearest(x[base + i], y[base + i], centroids);
                        if best != *label {
                            *label = best;
                            changed += 1;
                        }
                    }
                    changed
                })
                .collect()
        }))
    }

    fn launch_accumulate(
        &self,
        buffers: &DeviceBuffers,
        k: usize,
        block_size: usize,
    ) -> Result<Vec<CentroidSums>> {
        self.pool.install(|| {
            buffers
                .groups
                .par_chunks(block_size)
                .enumerate()
                .map(|(block, labels)| {
                    let base = block * block_size;
                    let mut sums = CentroidSums::zero(k)?;
                    for (i, &group) in labels.iter().enumerate() {
                        if group >= k {
                            return Err(KMeansError::InvalidLabel { index: base + i, group, k });
                        }
                        sums.add(group, buffers.x[base + i], buffers.y[base + i]);
                    }
                    Ok(sums)
                })
                .collect()
        })
    }

    fn download(&self, buffers: &DeviceBuffers, points: &mut [Observation]) -> Result<()> {
        if buffers.len() != points.len() {
            return Err(KMeansError::InvalidConfig(format!(
                "device holds {} labels for {} points",
                buffers.len(),
                points.len()
            )));
        }
        points
            .iter_mut()
            .zip(&buffers.groups)
            .for_each(|(point, &group)| point.group = group);
        Ok(())
    }
}
