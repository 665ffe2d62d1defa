//! Nearest-centroid classification

use crate::types::Centroid;

/// Squared Euclidean distance between a point and a centroid
#[inline]
pub fn squared_distance(x: f64, y: f64, centroid: &Centroid) -> f64 {
    let dx = centroid.x - x;
    let dy = centroid.y - y;
    dx * dx + dy * dy
}

/// Index of the centroid closest to `(x, y)`
///
/// Centroids are scanned left to right and only a strictly smaller distance
/// replaces the current best, so ties always resolve to the lowest index no
/// matter which worker evaluates the point.
///
/// # Arguments
/// * `x`, `y` - Coordinates of the observation
/// * `centroids` - Current centroid table, at least one entry
///
/// # Returns
/// * Index into `centroids`; 0 when the table is empty
#[inline]
pub fn nearest(x: f64, y: f64, centroids: &[Centroid]) -> usize {
    let mut best = 0;
    let mut min_d = f64::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(x, y, centroid);
        if d < min_d {
            min_d = d;
            best = i;
        }
    }
    best
}
