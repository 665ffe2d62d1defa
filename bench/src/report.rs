use chrono::Utc;
use serde_json::{Value, json};

use crate::sweep::Measurement;

/// Timing line followed by the centroid table of the last run
pub fn print_measurement(m: &Measurement) {
    println!(
        "{:<10} threads: {:>2} -> total ({} runs): {:.6} s, mean: {:.6} s, iterations: {:.1}",
        m.backend,
        m.workers,
        m.runs,
        m.total.as_secs_f64(),
        m.mean().as_secs_f64(),
        m.mean_iterations()
    );
    if m.capped > 0 {
        println!("  {} of {} runs stopped at the iteration cap", m.capped, m.runs);
    }
    for (i, centroid) in m.last.centroids.iter().enumerate() {
        println!("  [{i}] x: {:>12.6} y: {:>12.6} count: {}", centroid.x, centroid.y, centroid.count);
    }
}

/// One JSON object per configuration
pub fn summary(m: &Measurement, points: usize, k: usize) -> Value {
    let centroids: Vec<Value> = m
        .last
        .centroids
        .iter()
        .map(|c| json!({"x": c.x, "y": c.y, "count": c.count}))
        .collect();
    json!({
        "time": Utc::now().timestamp(),
        "backend": m.backend.to_string(),
        "workers": m.workers,
        "points": points,
        "k": k,
        "runs": m.runs,
        "total_s": m.total.as_secs_f64(),
        "mean_s": m.mean().as_secs_f64(),
        "iterations": m.iterations,
        "capped": m.capped,
        "status": format!("{:?}", m.last.status),
        "centroids": centroids,
    })
}
