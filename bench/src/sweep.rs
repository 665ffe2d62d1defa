use std::time::{Duration, Instant};

use kmeans::{
    BackendKind, BackendOptions, KMeansError, Observation, RefineContext, Refinement, Result, Seed,
    fit, reset_labels,
};

use crate::cli::Args;

/// Timings of one backend and worker count over every run
#[derive(Debug)]
pub struct Measurement {
    pub backend: BackendKind,
    pub workers: usize,
    pub runs: usize,
    pub total: Duration,
    /// Iterations of every run, in order
    pub iterations: Vec<usize>,
    /// Runs stopped by the iteration cap
    pub capped: usize,
    /// Result of the last run
    pub last: Refinement,
}

impl Measurement {
    pub fn mean(&self) -> Duration {
        self.total.div_f64(self.runs.max(1) as f64)
    }

    pub fn mean_iterations(&self) -> f64 {
        self.iterations.iter().sum::<usize>() as f64 / self.iterations.len().max(1) as f64
    }
}

/// Configurations in sweep order; backends without workers are measured once
pub fn configurations(args: &Args) -> Vec<(BackendKind, usize)> {
    args.backends()
        .into_iter()
        .flat_map(|kind| {
            let workers = if kind.uses_workers() { args.threads.clone() } else { vec![1] };
            workers.into_iter().map(move |w| (kind, w))
        })
        .collect()
}

/// Run `args.runs` refinements of `points` on one configuration
///
/// Labels are reset to the unassigned sentinel before every run so each run
/// starts from the same state.
pub fn measure(
    points: &mut [Observation],
    kind: BackendKind,
    workers: usize,
    args: &Args,
) -> Result<Measurement> {
    let options = BackendOptions {
        workers,
        block_size: args.block_size,
        device_accumulate: args.device_accumulate,
    };
    let backend = kind.build(&options)?;
    let ctx = RefineContext { seed: Seed::from(args.seed), max_iterations: args.max_iter };

    let mut iterations = Vec::with_capacity(args.runs);
    let mut total = Duration::ZERO;
    let mut capped = 0;
    let mut last = None;
    for run in 0..args.runs {
        reset_labels(points);
        let timer = Instant::now();
        let refinement = fit(points, args.k, &backend, &ctx)?;
        total += timer.elapsed();
        debug!("{kind} x{workers} run {run}: {} iterations", refinement.iterations);
        iterations.push(refinement.iterations);
        capped += usize::from(!refinement.converged());
        last = Some(refinement);
    }

    let last = last.ok_or_else(|| KMeansError::InvalidConfig("no runs requested".into()))?;
    Ok(Measurement { backend: kind, workers, runs: args.runs, total, iterations, capped, last })
}
