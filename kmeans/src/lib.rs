//! K-Means clustering of 2-D points by Lloyd refinement
//!
//! The refinement loop in [`refine`] is written once against the
//! [`ExecutionBackend`] trait; [`backend`] provides sequential, threaded,
//! offloaded-loop and explicit-transfer device strategies for its two
//! parallel phases.
//!
//! ```no_run
//! use kmeans::{BackendKind, BackendOptions, RefineContext, fit, synthetic};
//!
//! let mut points = synthetic::gaussian_blobs(&[(0.0, 0.0), (20.0, 20.0)], 1_000, 1.0, 7)?;
//! let backend = BackendKind::Threaded.build(&BackendOptions { workers: 4, ..Default::default() })?;
//! let result = fit(&mut points, 2, &backend, &RefineContext::seeded(7))?;
//! println!("{:?}", result.centroids);
//! # Ok::<(), kmeans::KMeansError>(())
//! ```

pub mod backend;
pub mod context;
pub mod error;
pub mod nearest;
pub mod partition;
pub mod refine;
pub mod synthetic;
pub mod types;

pub use backend::{BackendKind, BackendOptions, Capabilities, ExecutionBackend};
pub use context::{RefineContext, Seed};
pub use error::{KMeansError, Result};
pub use refine::{IterationStats, Refinement, Status, fit, fit_preassigned, min_accepted_error};
pub use types::{Centroid, CentroidSums, CentroidTable, Observation, UNASSIGNED, reset_labels};
