//! Cluster lifecycle: start, stop, status.

use std::time::Duration;

use anyhow::Result;
use raftbench_core::bootstrap::Bootstrap;
use raftbench_core::control::{ControlPlane, HttpControlPlane};
use raftbench_core::process::{self, NodeProcessManager, WorkerBinary};
use raftbench_core::topology::ClusterTopology;
use raftbench_core::RetryPolicy;

use super::{DASH, RULE};

/// Split a `--build-cmd` string into program + args.
fn split_build_cmd(cmd: Option<&str>) -> Option<Vec<String>> {
    let parts: Vec<String> = cmd?.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}

pub async fn start(
    base_port: u16,
    nodes: u64,
    binary: &str,
    build_cmd: Option<&str>,
) -> Result<()> {
    println!("{}", RULE);
    println!("  Raft KV store - cluster startup");
    println!("{}", RULE);
    println!();

    let topology = ClusterTopology::full_mesh(base_port, nodes);
    let worker = WorkerBinary::new(binary, split_build_cmd(build_cmd));
    let pattern = worker.kill_pattern();
    let mut manager = NodeProcessManager::new(worker);

    let resolve_policy = RetryPolicy::address_resolution();
    let discovery_policy = RetryPolicy::leader_discovery();
    let control = HttpControlPlane::localhost(resolve_policy.timeout_per_attempt);

    let last_port = base_port + (nodes as u16).saturating_sub(1);
    println!("Starting {}-node cluster on ports {}..{}...", nodes, base_port, last_port);

    // only a worker-binary build failure can make this return Err
    let outcome = Bootstrap::new(&topology)
        .with_policies(resolve_policy, discovery_policy)
        .run(&mut manager, &control, &pattern)
        .await?;

    println!();
    println!("  Addresses resolved: {}/{}", outcome.resolved, nodes);
    println!("  Peer connects:      {}", outcome.connects_issued);
    println!("  Ready signals:      {}/{}", outcome.ready_acks, nodes);
    println!();

    match outcome.handle {
        Some(handle) => {
            println!("{}", RULE);
            println!("  ✓ Cluster is running!");
            println!("{}", RULE);
            println!("  Leader: node {} on port {}", handle.leader_id, handle.leader_port);
            println!();
            println!("  Benchmark it with: raftbench bench -n 100");
            println!("  Stop it with:      raftbench cluster stop");
        }
        None => {
            // degraded result, still exit 0; only a build failure is fatal
            println!("  ⚠ Cluster started but no leader found yet.");
            println!("  Check node logs, then: raftbench cluster status");
        }
    }
    Ok(())
}

pub async fn stop(pattern: &str) -> Result<()> {
    println!("Stopping cluster ({})...", pattern);
    process::kill_by_pattern(pattern).await;
    println!("✓ Cluster stopped");
    Ok(())
}

pub async fn status(base_port: u16, nodes: u64) -> Result<()> {
    let topology = ClusterTopology::full_mesh(base_port, nodes);
    let control = HttpControlPlane::localhost(Duration::from_secs(2));

    println!("{}", RULE);
    println!("  CLUSTER STATUS");
    println!("{}", RULE);
    let mut leaders = 0;
    for node in topology.nodes() {
        match control.is_leader(node.port).await {
            Ok(true) => {
                leaders += 1;
                println!("  node {} (port {})  UP   leader", node.id, node.port);
            }
            Ok(false) => println!("  node {} (port {})  UP   follower", node.id, node.port),
            Err(err) => println!("  node {} (port {})  DOWN ({})", node.id, node.port, err),
        }
    }
    println!("{}", DASH);
    match leaders {
        0 => println!("  No leader elected yet."),
        1 => println!("  Cluster healthy: one leader."),
        n => println!("  ⚠ {} nodes claim leadership.", n),
    }
    println!("{}", RULE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_build_cmd() {
        assert_eq!(split_build_cmd(None), None);
        assert_eq!(split_build_cmd(Some("   ")), None);
        assert_eq!(
            split_build_cmd(Some("cargo build --release")),
            Some(vec!["cargo".to_string(), "build".to_string(), "--release".to_string()])
        );
    }
}
