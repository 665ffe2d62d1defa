//! Error type shared by the refinement loop and every execution backend

use std::collections::TryReserveError;

use thiserror::Error;

/// Failures surfaced to the caller of a refinement run
///
/// Degenerate cluster counts (`k <= 1`, `k >= size`) are not errors, they
/// are handled as trivial branches of initialization.
#[derive(Debug, Error)]
pub enum KMeansError {
    /// The point store is empty, there is nothing to partition
    #[error("no observations to cluster")]
    EmptyInput,
    /// Accumulator or centroid table could not be allocated
    #[error("unable to allocate {what}: {source}")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
    /// A label does not index into the centroid table
    #[error("observation {index} carries group {group}, expected < {k}")]
    InvalidLabel { index: usize, group: usize, k: usize },
    /// The accumulated counts do not cover every observation exactly once
    #[error("accumulation counted {found} observations, expected {expected}")]
    AccumulationMismatch { expected: usize, found: usize },
    /// A worker panicked while holding the combine lock
    #[error("worker panicked while combining partial sums")]
    WorkerPoisoned,
    /// The worker pool could not be started
    #[error("unable to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// A backend or run parameter is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Synthetic data distribution rejected its parameters
    #[error("invalid distribution: {0}")]
    Distribution(String),
}

impl KMeansError {
    pub(crate) fn allocation(what: &'static str) -> impl FnOnce(TryReserveError) -> Self {
        move |source| KMeansError::Allocation { what, source }
    }
}

/// Convenient alias for results produced by this crate
pub type Result<T> = std::result::Result<T, KMeansError>;
