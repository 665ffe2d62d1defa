//! Type definitions for 2-D K-Means clustering
//! Includes observations with their mutable group labels, the per-iteration
//! centroid accumulators and the normalized centroid table

use rayon::prelude::*;

use crate::error::{KMeansError, Result};

/// Label carried by an observation that has not been assigned to a group yet
pub const UNASSIGNED: usize = usize::MAX;

/// One 2-D point together with the index of the centroid it belongs to
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub group: usize,
}

impl Observation {
    /// Create an unassigned observation
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, group: UNASSIGNED }
    }
    /// Restore the unassigned sentinel
    pub fn reset(&mut self) {
        self.group = UNASSIGNED;
    }
}

/// Reset every label to [`UNASSIGNED`] before a new run
pub fn reset_labels(points: &mut [Observation]) {
    points.iter_mut().for_each(Observation::reset);
}

/// Mean position of a group plus the number of members
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
    pub count: usize,
}

/// Running totals for k centroid slots
///
/// Every worker owns one of these during accumulation. Combining two of them
/// is associative and commutative, so partial sums may be merged in any order.
#[derive(Clone, Debug, PartialEq)]
pub struct CentroidSums {
    pub sum_x: Vec<f64>,
    pub sum_y: Vec<f64>,
    pub count: Vec<usize>,
}

impl CentroidSums {
    /// Allocate k empty slots
    ///
    /// # Errors
    /// * [`KMeansError::Allocation`] when the slots cannot be reserved
    pub fn zero(k: usize) -> Result<Self> {
        Ok(Self {
            sum_x: zeroed_vec(k, "accumulator sums")?,
            sum_y: zeroed_vec(k, "accumulator sums")?,
            count: zeroed_vec(k, "accumulator counts")?,
        })
    }

    pub fn len(&self) -> usize {
        self.count.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count.is_empty()
    }

    /// Add one observation into its slot
    #[inline]
    pub fn add(&mut self, group: usize, x: f64, y: f64) {
        self.sum_x[group] += x;
        self.sum_y[group] += y;
        self.count[group] += 1;
    }

    /// Add one observation after checking its label fits the table
    ///
    /// # Errors
    /// * [`KMeansError::InvalidLabel`] when `point.group >= k`
    #[inline]
    pub fn add_checked(&mut self, index: usize, point: &Observation) -> Result<()> {
        let k = self.len();
        if point.group >= k {
            return Err(KMeansError::InvalidLabel { index, group: point.group, k });
        }
        self.add(point.group, point.x, point.y);
        Ok(())
    }

    /// Add another accumulator into this one slot by slot
    pub fn merge(&mut self, right: &Self) {
        self.sum_x.iter_mut().zip(&right.sum_x).for_each(|(a, b)| *a += b);
        self.sum_y.iter_mut().zip(&right.sum_y).for_each(|(a, b)| *a += b);
        self.count.iter_mut().zip(&right.count).for_each(|(a, b)| *a += b);
    }

    /// Slot-wise sum of two accumulators, the combine step of every reduction
    pub fn sum_by_field(mut self, right: &Self) -> Self {
        self.merge(right);
        self
    }

    /// Number of observations accumulated over all slots
    pub fn total(&self) -> usize {
        self.count.iter().sum()
    }
}

/// The k centroids of the current iteration
#[derive(Clone, Debug, PartialEq)]
pub struct CentroidTable {
    centroids: Vec<Centroid>,
}

impl CentroidTable {
    /// Allocate k centroids at the origin with no members
    ///
    /// # Errors
    /// * [`KMeansError::Allocation`] when the table cannot be reserved
    pub fn zeroed(k: usize) -> Result<Self> {
        Ok(Self { centroids: zeroed_vec(k, "centroid table")? })
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn as_slice(&self) -> &[Centroid] {
        &self.centroids
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Centroid] {
        &mut self.centroids
    }

    pub fn into_vec(self) -> Vec<Centroid> {
        self.centroids
    }

    /// Turn accumulated sums into centroid coordinates
    ///
    /// Slots with no members keep the coordinates of the previous iteration.
    /// The result depends only on `sums` and those stale coordinates, so
    /// normalizing twice with the same sums leaves the table unchanged.
    pub fn normalize(&mut self, sums: &CentroidSums) {
        self.centroids
            .iter_mut()
            .enumerate()
            .for_each(|(i, centroid)| normalize_slot(centroid, sums, i));
    }

    /// Same as [`CentroidTable::normalize`], one task per centroid
    pub fn normalize_parallel(&mut self, sums: &CentroidSums) {
        self.centroids
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, centroid)| normalize_slot(centroid, sums, i));
    }
}

impl From<Vec<Centroid>> for CentroidTable {
    fn from(centroids: Vec<Centroid>) -> Self {
        Self { centroids }
    }
}

#[inline]
fn normalize_slot(centroid: &mut Centroid, sums: &CentroidSums, i: usize) {
    let count = sums.count[i];
    centroid.count = count;
    if count > 0 {
        centroid.x = sums.sum_x[i] / count as f64;
        centroid.y = sums.sum_y[i] / count as f64;
    }
}

/// Vec of `len` default values, reporting allocation failure instead of aborting
pub(crate) fn zeroed_vec<T: Default + Clone>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(KMeansError::allocation(what))?;
    v.resize(len, T::default());
    Ok(v)
}
