//! End-to-end scenarios: full wiring runs over scripted control planes and
//! benchmark runs over fake stores, with simulated time where timing
//! matters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use raftbench_core::bench::{put_plan, LoadGenerator};
use raftbench_core::bootstrap::Bootstrap;
use raftbench_core::control::{ControlError, ControlPlane};
use raftbench_core::kv::{KvError, KvStore};
use raftbench_core::stats;
use raftbench_core::topology::ClusterTopology;
use raftbench_core::RetryPolicy;

/// Control plane for a scripted cluster: some ports resolve, one may be
/// leader, and every call is recorded.
#[derive(Default)]
struct ScriptedCluster {
    addresses: HashMap<u16, String>,
    leader_port: Option<u16>,
    connect_calls: Mutex<Vec<(u16, u64)>>,
    ready_ports: Mutex<Vec<u16>>,
    leader_queries: Mutex<Vec<u16>>,
}

impl ScriptedCluster {
    fn resolving(ports: &[u16]) -> Self {
        let addresses = ports.iter().map(|&p| (p, format!("127.0.0.1:{}", p + 1000))).collect();
        Self { addresses, ..Default::default() }
    }
}

#[async_trait]
impl ControlPlane for ScriptedCluster {
    async fn listen_addr(&self, port: u16) -> Result<String, ControlError> {
        self.addresses.get(&port).cloned().ok_or(ControlError::Status(503))
    }

    async fn connect_peer(
        &self,
        port: u16,
        peer_id: u64,
        _peer_addr: &str,
    ) -> Result<(), ControlError> {
        self.connect_calls.lock().unwrap().push((port, peer_id));
        Ok(())
    }

    async fn mark_ready(&self, port: u16) -> Result<(), ControlError> {
        self.ready_ports.lock().unwrap().push(port);
        Ok(())
    }

    async fn is_leader(&self, port: u16) -> Result<bool, ControlError> {
        self.leader_queries.lock().unwrap().push(port);
        Ok(self.leader_port == Some(port))
    }
}

fn quick(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(500), Duration::from_secs(1))
}

/// Scenario 1: 3-node topology, everything resolves, a leader emerges.
#[tokio::test(start_paused = true)]
async fn healthy_three_node_bootstrap() {
    let mut cluster = ScriptedCluster::resolving(&[8080, 8081, 8082]);
    cluster.leader_port = Some(8080);
    let topology = ClusterTopology::full_mesh(8080, 3);

    let outcome = Bootstrap::new(&topology)
        .with_policies(quick(10), quick(30))
        .wire(&cluster)
        .await;

    assert_eq!(outcome.resolved, 3);
    assert_eq!(outcome.connects_issued, 6);
    assert_eq!(outcome.ready_acks, 3);

    let handle = outcome.handle.expect("leader should be discovered");
    assert_eq!(handle.leader_id, 0);
    assert_eq!(handle.leader_port, 8080);
    assert_eq!(handle.url("127.0.0.1"), "http://127.0.0.1:8080");

    let ready = cluster.ready_ports.lock().unwrap().clone();
    assert_eq!(ready, vec![8080, 8081, 8082]);
}

/// Scenario 2: node 2 never reports an address. The mesh is wired between
/// the two survivors only, but leader discovery still scans all three
/// ports.
#[tokio::test(start_paused = true)]
async fn bootstrap_tolerates_unresolved_node() {
    let mut cluster = ScriptedCluster::resolving(&[8080, 8081]);
    cluster.leader_port = Some(8081);
    let topology = ClusterTopology::full_mesh(8080, 3);

    let outcome = Bootstrap::new(&topology)
        .with_policies(quick(2), quick(30))
        .wire(&cluster)
        .await;

    assert_eq!(outcome.resolved, 2);
    assert_eq!(outcome.connects_issued, 2);

    let connects = cluster.connect_calls.lock().unwrap().clone();
    assert_eq!(connects, vec![(8080, 1), (8081, 0)]);

    // discovery walked ports in order and stopped at the leader
    let queries = cluster.leader_queries.lock().unwrap().clone();
    assert_eq!(queries, vec![8080, 8081]);
    assert_eq!(outcome.handle.unwrap().leader_id, 1);
}

/// A cluster that never elects: the run completes with a degraded result
/// after exactly the configured number of ticks, not an error.
#[tokio::test(start_paused = true)]
async fn bootstrap_reports_leader_absence() {
    let cluster = ScriptedCluster::resolving(&[8080, 8081, 8082]);
    let topology = ClusterTopology::full_mesh(8080, 3);

    let started = tokio::time::Instant::now();
    let outcome = Bootstrap::new(&topology)
        .with_policies(quick(1), quick(30))
        .wire(&cluster)
        .await;

    assert!(outcome.handle.is_none());
    assert_eq!(outcome.resolved, 3);
    assert_eq!(cluster.leader_queries.lock().unwrap().len(), 30 * 3);
    // 30 discovery ticks of 500ms; resolution succeeded without sleeping
    assert_eq!(started.elapsed(), Duration::from_millis(500) * 30);
}

/// KV store that either works perfectly or always fails.
struct FixedStore {
    fail: bool,
    data: Mutex<HashMap<String, String>>,
    calls: AtomicU32,
}

impl FixedStore {
    fn healthy() -> Self {
        Self { fail: false, data: Mutex::new(HashMap::new()), calls: AtomicU32::new(0) }
    }

    fn broken() -> Self {
        Self { fail: true, data: Mutex::new(HashMap::new()), calls: AtomicU32::new(0) }
    }
}

#[async_trait]
impl KvStore for FixedStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(KvError::Status(500));
        }
        self.data.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<(String, bool), KvError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(KvError::Status(500));
        }
        match self.data.lock().unwrap().get(key) {
            Some(value) => Ok((value.clone(), true)),
            None => Ok((String::new(), false)),
        }
    }
}

/// Scenario 3: 100 clean PUTs produce a full success count and a positive
/// rate.
#[tokio::test]
async fn clean_put_benchmark_reports_full_throughput() {
    let generator = LoadGenerator::new(std::sync::Arc::new(FixedStore::healthy()));

    let started = Instant::now();
    let outcomes = generator.run_concurrent(&put_plan(100), 10).await;
    let report = stats::summarize("PUT", &outcomes, started.elapsed());

    assert_eq!(report.total, 100);
    assert_eq!(report.successful, 100);
    assert!(report.ops_per_sec > 0.0);
}

/// Scenario 4: every operation fails; the run still completes with a full
/// outcome set and a clean zero rate.
#[tokio::test]
async fn failing_benchmark_reports_zero_throughput() {
    let store = std::sync::Arc::new(FixedStore::broken());
    let generator = LoadGenerator::new(store.clone());

    let started = Instant::now();
    let outcomes = generator.run_concurrent(&put_plan(100), 10).await;
    let report = stats::summarize("PUT", &outcomes, started.elapsed());

    assert_eq!(report.total, 100);
    assert_eq!(report.successful, 0);
    assert_eq!(report.ops_per_sec, 0.0);
    assert_eq!(store.calls.load(Ordering::Relaxed), 100);
}
