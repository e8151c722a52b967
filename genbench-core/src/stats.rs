use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::outcome::RequestOutcome;

/// Aggregate over one concurrency level. Latency and throughput figures
/// cover successful requests only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyLevelStats {
    pub concurrency_level: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_time_seconds: f64,
    pub avg_latency: f64,
    pub median_latency: f64,
    pub p95_latency: f64,
    pub p99_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
    pub avg_tokens_per_second: f64,
    pub total_tokens_generated: u64,
    pub overall_throughput: f64,
    #[serde(default)]
    pub errors: BTreeMap<String, u64>,
}

impl ConcurrencyLevelStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64 * 100.0
        }
    }
}

/// Reduces a batch to its statistics. Returns `None` when no request
/// succeeded, in which case there is nothing meaningful to report.
pub fn aggregate(
    outcomes: &[RequestOutcome],
    concurrency_level: u64,
    elapsed_seconds: f64,
) -> Option<ConcurrencyLevelStats> {
    let (successful, failed): (Vec<&RequestOutcome>, Vec<&RequestOutcome>) =
        outcomes.iter().partition(|o| o.succeeded());
    if successful.is_empty() {
        return None;
    }

    let mut latencies: Vec<f64> = successful.iter().map(|o| o.latency_seconds()).collect();
    latencies.sort_by(f64::total_cmp);

    let mut errors = BTreeMap::new();
    for outcome in &failed {
        let message = outcome.error_message().unwrap_or("unknown error").to_owned();
        *errors.entry(message).or_insert(0) += 1;
    }

    let total_tokens_generated: u64 = successful.iter().map(|o| o.completion_tokens()).sum();
    let tokens_per_second: Vec<f64> = successful.iter().map(|o| o.tokens_per_second()).collect();
    let overall_throughput = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
        total_tokens_generated as f64 / elapsed_seconds
    } else {
        0.0
    };

    Some(ConcurrencyLevelStats {
        concurrency_level,
        total_requests: outcomes.len() as u64,
        successful_requests: successful.len() as u64,
        failed_requests: failed.len() as u64,
        total_time_seconds: elapsed_seconds,
        avg_latency: mean(&latencies),
        median_latency: percentile(&latencies, 50.0),
        p95_latency: percentile(&latencies, 95.0),
        p99_latency: percentile(&latencies, 99.0),
        min_latency: latencies[0],
        max_latency: latencies[latencies.len() - 1],
        avg_tokens_per_second: mean(&tokens_per_second),
        total_tokens_generated,
        overall_throughput,
        errors,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile of an ascending slice using linear interpolation between the
/// two closest ranks: `rank = p/100 * (n - 1)`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}
