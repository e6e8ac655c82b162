//! Benchmark suites against the current leader.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use raftbench_core::bench::{get_plan, mixed_plan, put_plan, put_plan_prefixed, LoadGenerator};
use raftbench_core::bootstrap::LeaderDiscoverer;
use raftbench_core::control::HttpControlPlane;
use raftbench_core::kv::HttpKvClient;
use raftbench_core::stats::{self, BenchmarkReport};
use raftbench_core::topology::ClusterTopology;
use raftbench_core::RetryPolicy;

use super::{DASH, RULE};

/// Resolve the benchmark target: an explicit URL, or whichever node
/// currently claims leadership. Unlike during bootstrap, no reachable
/// leader here is a hard usage error - there is nothing to benchmark.
async fn resolve_target(target: Option<String>, base_port: u16, nodes: u64) -> Result<String> {
    if let Some(url) = target {
        return Ok(url);
    }

    println!("Finding leader...");
    let topology = ClusterTopology::full_mesh(base_port, nodes);
    let policy = RetryPolicy::new(1, Duration::ZERO, Duration::from_secs(1));
    let control = HttpControlPlane::localhost(policy.timeout_per_attempt);
    let discoverer = LeaderDiscoverer::new(policy);

    match discoverer.scan(&control, &topology).await {
        Some(handle) => {
            println!("✓ Leader found: node {} on port {}", handle.leader_id, handle.leader_port);
            println!();
            Ok(handle.url("127.0.0.1"))
        }
        None => bail!("no leader found - start the cluster first: raftbench cluster start"),
    }
}

fn print_report(report: &BenchmarkReport) {
    println!("  ✓ {}/{} successful in {:.2}s", report.successful, report.total,
        report.elapsed.as_secs_f64());
    println!("  {:.2} ops/sec", report.ops_per_sec);
    println!();
}

pub async fn run_suite(
    num_ops: usize,
    warmup: usize,
    target: Option<String>,
    base_port: u16,
    nodes: u64,
) -> Result<()> {
    println!("{}", RULE);
    println!("  Raft KV store - performance benchmark");
    println!("{}", RULE);
    println!();

    let target = resolve_target(target, base_port, nodes).await?;
    let store = Arc::new(HttpKvClient::new(target, Duration::from_secs(2)));
    let generator = LoadGenerator::new(store);

    if warmup > 0 {
        println!("Warming up with {} operations...", warmup);
        generator.warmup(warmup).await;
        println!("✓ Warmup complete");
        println!();
    }

    let mut reports = Vec::new();

    println!("Benchmarking {} PUT operations...", num_ops);
    let plan = put_plan(num_ops);
    let started = Instant::now();
    let outcomes = generator.run_sequential(&plan).await;
    let report = stats::summarize("PUT", &outcomes, started.elapsed());
    print_report(&report);
    reports.push(report);

    println!("Benchmarking {} GET operations...", num_ops);
    let plan = get_plan(num_ops);
    generator.seed_keys(&plan).await;
    let started = Instant::now();
    let outcomes = generator.run_sequential(&plan).await;
    let report = stats::summarize("GET", &outcomes, started.elapsed());
    print_report(&report);
    reports.push(report);

    println!("Benchmarking {} mixed PUT/GET operations...", num_ops);
    let plan = mixed_plan(num_ops);
    let started = Instant::now();
    let outcomes = generator.run_sequential(&plan).await;
    let report = stats::summarize("MIXED", &outcomes, started.elapsed());
    print_report(&report);
    reports.push(report);

    println!("{}", RULE);
    println!("  Benchmark summary");
    println!("{}", RULE);
    println!("  {:<10} {:>12} {:>12} {:>14}", "Operation", "Ops/sec", "Time (s)", "Success");
    println!("{}", DASH);
    for report in &reports {
        println!(
            "  {:<10} {:>12.2} {:>12.2} {:>10}/{}",
            report.label,
            report.ops_per_sec,
            report.elapsed.as_secs_f64(),
            report.successful,
            report.total
        );
    }
    println!();
    println!("  Average throughput: {:.2} ops/sec", stats::mean_throughput(&reports));
    println!();
    Ok(())
}

pub async fn flood(
    num_ops: usize,
    concurrency: usize,
    warmup: usize,
    target: Option<String>,
    base_port: u16,
    nodes: u64,
) -> Result<()> {
    println!("{}", RULE);
    println!("  Raft KV store - concurrent flood");
    println!("{}", RULE);
    println!("  Operations:   {}", num_ops);
    println!("  Concurrency:  {}", concurrency);
    println!("{}", RULE);
    println!();

    let target = resolve_target(target, base_port, nodes).await?;
    let store = Arc::new(HttpKvClient::new(target, Duration::from_secs(30)));
    let generator = LoadGenerator::new(store);

    if warmup > 0 {
        println!("Warming up with {} operations...", warmup);
        generator.warmup(warmup).await;
        println!("✓ Warmup complete");
        println!();
    }

    let plan = put_plan_prefixed("flood", num_ops);
    let started = Instant::now();
    let outcomes = generator.run_concurrent(&plan, concurrency).await;
    let report = stats::summarize("FLOOD", &outcomes, started.elapsed());
    let latency = stats::latency_summary(&outcomes);

    println!("{}", RULE);
    println!("  FLOOD RESULTS");
    println!("{}", RULE);
    println!(
        "  Operations:   {}/{} ({} failed)",
        report.successful,
        report.total,
        report.total - report.successful
    );
    println!("  Duration:     {:.2}s", report.elapsed.as_secs_f64());
    println!("  Throughput:   {:.2} ops/sec", report.ops_per_sec);
    println!("{}", DASH);
    println!("  Latency (ms):");
    println!("    Min:  {:.2}", latency.min.as_secs_f64() * 1000.0);
    println!("    Avg:  {:.2}", latency.avg.as_secs_f64() * 1000.0);
    println!("    Max:  {:.2}", latency.max.as_secs_f64() * 1000.0);
    println!("    P95:  {:.2}", latency.p95.as_secs_f64() * 1000.0);
    println!("    P99:  {:.2}", latency.p99.as_secs_f64() * 1000.0);
    println!("{}", RULE);
    Ok(())
}
