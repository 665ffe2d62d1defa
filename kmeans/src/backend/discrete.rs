//! Explicit-transfer discrete device backend
//!
//! Each reassignment stages coordinates, labels and centroids onto the device,
//! runs the nearest-centroid kernel block by block and copies labels back;
//! block change counts are reduced on the host. Accumulation stays on the host
//! unless `device_accumulate` is set, in which case the device produces one
//! partial sum per block and the host combines them.

use log::trace;

use crate::{
    backend::{Capabilities, Device, ExecutionBackend, Sequential},
    error::{KMeansError, Result},
    types::{Centroid, CentroidSums, Observation},
};

#[derive(Debug)]
pub struct Discrete<D> {
    device: D,
    block_size: usize,
    device_accumulate: bool,
}

impl<D: Device> Discrete<D> {
    /// # Errors
    /// * [`KMeansError::InvalidConfig`] when `block_size` is zero
    pub fn new(device: D, block_size: usize, device_accumulate: bool) -> Result<Self> {
        if block_size == 0 {
            return Err(KMeansError::InvalidConfig("block size must be at least 1".into()));
        }
        Ok(Self { device, block_size, device_accumulate })
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: Device> ExecutionBackend for Discrete<D> {
    fn name(&self) -> &'static str {
        "discrete"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            parallel_accumulate: self.device_accumulate,
            offload_accumulate: self.device_accumulate,
            offload_reassign: true,
            workers: self.device.units(),
        }
    }

    fn accumulate(&self, points: &[Observation], k: usize) -> Result<CentroidSums> {
        if !self.device_accumulate {
            return Sequential.accumulate(points, k);
        }
        let buffers = self.device.upload(points, &[])?;
        let partials = self.device.launch_accumulate(&buffers, k, self.block_size)?;
        partials
            .iter()
            .try_fold(CentroidSums::zero(k)?, |acc, block| Ok(acc.sum_by_field(block)))
    }

    fn reassign(&self, points: &mut [Observation], centroids: &[Centroid]) -> Result<usize> {
        let mut buffers = self.device.upload(points, centroids)?;
        let blocks = self.device.launch_reassign(&mut buffers, self.block_size)?;
        self.device.download(&buffers, points)?;
        trace!("{} kernel blocks on {} device", blocks.len(), self.device.name());
        Ok(blocks.iter().sum())
    }
}
