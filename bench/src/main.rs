//! Benchmark driver for the K-Means backends
//! Builds a replicated synthetic sample once, then times repeated refinement
//! runs for every selected backend and worker count

extern crate pretty_env_logger;

#[macro_use]
extern crate log;

use std::f64::consts::TAU;

use clap::Parser;
use kmeans::{Observation, Result, synthetic};

mod cli;
mod report;
mod sweep;

use cli::Args;

/// Blob centers evenly spaced on a circle wide enough to keep them apart
fn blob_centers(count: usize, sigma: f64) -> Vec<(f64, f64)> {
    let radius = (20.0 * sigma).max(10.0) * count as f64;
    (0..count)
        .map(|i| {
            let angle = TAU * i as f64 / count as f64;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

fn load(args: &Args) -> Result<Vec<Observation>> {
    let centers = blob_centers(args.blobs, args.sigma);
    let sample = synthetic::gaussian_blobs(&centers, args.per_blob, args.sigma, args.seed.unwrap_or(0))?;
    synthetic::replicate(&sample, args.replication)
}

fn run(args: &Args) -> Result<()> {
    let mut points = load(args)?;
    info!("{} observations, {} clusters", points.len(), args.k);

    for (kind, workers) in sweep::configurations(args) {
        let measurement = sweep::measure(&mut points, kind, workers, args)?;
        if args.json {
            println!("{}", report::summary(&measurement, points.len(), args.k));
        } else {
            report::print_measurement(&measurement);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };

    pretty_env_logger::formatted_timed_builder()
        .filter_level(level)
        .init();

    info!("starting");
    debug!("params: {:#?}", args);
    if !args.validate() {
        error!("please fix arguments");
        std::process::exit(1);
    }

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
    info!("finished");
}
