use clap::Parser;
use kmeans::BackendKind;

/// Sweep K-Means backends and worker counts over replicated synthetic blobs
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Backend to measure: sequential, threaded, offload or discrete (repeatable, default all)
    #[arg(long = "backend")]
    pub backends: Vec<BackendKind>,
    /// Worker counts swept by the parallel backends
    #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 4, 8, 16, 32])]
    pub threads: Vec<usize>,
    /// Number of clusters
    #[arg(short, default_value_t = 5)]
    pub k: usize,
    /// Refinement runs per configuration
    #[arg(long, default_value_t = 30)]
    pub runs: usize,
    /// Copies of the generated sample in the measured input
    #[arg(long, default_value_t = 1000)]
    pub replication: usize,
    /// Number of Gaussian blobs in the sample
    #[arg(long, default_value_t = 5)]
    pub blobs: usize,
    /// Points per blob before replication
    #[arg(long, default_value_t = 520)]
    pub per_blob: usize,
    /// Standard deviation of every blob
    #[arg(long, default_value_t = 2.5)]
    pub sigma: f64,
    /// Seed of the sample and the initial labels; labels are clock-seeded when omitted
    #[arg(long)]
    pub seed: Option<u64>,
    /// Stop a run after this many iterations (unbounded by default)
    #[arg(long)]
    pub max_iter: Option<usize>,
    /// Points per kernel block on the discrete backend
    #[arg(long, default_value_t = 256)]
    pub block_size: usize,
    /// Accumulate on the device as well on the discrete backend
    #[arg(long)]
    pub device_accumulate: bool,
    /// Print one JSON summary per configuration
    #[arg(long)]
    pub json: bool,
    /// Verbose logging
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Selected backends, all of them when none was given
    pub fn backends(&self) -> Vec<BackendKind> {
        if self.backends.is_empty() {
            BackendKind::ALL.to_vec()
        } else {
            self.backends.clone()
        }
    }

    pub fn sample_size(&self) -> usize {
        self.blobs.saturating_mul(self.per_blob)
    }

    /// Log every problem with the arguments
    pub fn validate(&self) -> bool {
        let mut is_ok = true;

        if self.k == 0 {
            error!("-k must be at least 1");
            is_ok = false;
        }

        if self.runs == 0 {
            error!("--runs must be at least 1");
            is_ok = false;
        }

        if self.replication == 0 {
            error!("--replication must be at least 1");
            is_ok = false;
        }

        if self.blobs == 0 || self.per_blob == 0 {
            error!("--blobs and --per-blob must be at least 1");
            is_ok = false;
        }

        if !self.sigma.is_finite() || self.sigma < 0.0 {
            error!("--sigma must be a non-negative number");
            is_ok = false;
        }

        if self.threads.is_empty() || self.threads.contains(&0) {
            error!("--threads must list worker counts of at least 1");
            is_ok = false;
        }

        if self.block_size == 0 {
            error!("--block-size must be at least 1");
            is_ok = false;
        }

        if self.max_iter == Some(0) {
            error!("--max-iter must be at least 1");
            is_ok = false;
        }

        if self.k >= self.sample_size().saturating_mul(self.replication) {
            warn!("-k is not below the number of points, every run is degenerate");
        }

        if self.device_accumulate && !self.backends().contains(&BackendKind::Discrete) {
            warn!("--device-accumulate only applies to the discrete backend");
        }

        is_ok
    }
}
