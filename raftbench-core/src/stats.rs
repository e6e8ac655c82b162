//! Outcome aggregation: throughput and latency summaries.

use std::time::Duration;

use crate::bench::OperationOutcome;

/// Throughput summary for one benchmarked operation category. Derived once,
/// never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub label: String,
    pub successful: u64,
    pub total: u64,
    pub elapsed: Duration,
    pub ops_per_sec: f64,
}

/// Latency spread of the successful operations in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencySummary {
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

/// `ops_per_sec` is successes over wall-clock seconds, and exactly `0.0` on
/// a degenerate zero-length run rather than a division error.
pub fn summarize(label: &str, outcomes: &[OperationOutcome], elapsed: Duration) -> BenchmarkReport {
    let successful = outcomes.iter().filter(|o| o.success).count() as u64;
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = if secs > 0.0 { successful as f64 / secs } else { 0.0 };
    BenchmarkReport {
        label: label.to_string(),
        successful,
        total: outcomes.len() as u64,
        elapsed,
        ops_per_sec,
    }
}

/// Arithmetic mean of the per-category rates. This is deliberately NOT a
/// weighted global rate (total successes over total elapsed); each category
/// weighs equally in the scalar summary.
pub fn mean_throughput(reports: &[BenchmarkReport]) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    reports.iter().map(|r| r.ops_per_sec).sum::<f64>() / reports.len() as f64
}

/// Min/avg/max/p95/p99 over the latencies of successful operations;
/// all-zero when nothing succeeded.
pub fn latency_summary(outcomes: &[OperationOutcome]) -> LatencySummary {
    let mut sorted: Vec<Duration> =
        outcomes.iter().filter(|o| o.success).map(|o| o.latency()).collect();
    if sorted.is_empty() {
        return LatencySummary::default();
    }
    sorted.sort();

    let len = sorted.len();
    let avg_nanos = sorted.iter().map(|d| d.as_nanos() as u64).sum::<u64>() / len as u64;
    LatencySummary {
        min: sorted[0],
        avg: Duration::from_nanos(avg_nanos),
        max: sorted[len - 1],
        p95: sorted[(len as f64 * 0.95) as usize],
        p99: sorted[((len as f64 * 0.99).min(len as f64 - 1.0)) as usize],
    }
}
