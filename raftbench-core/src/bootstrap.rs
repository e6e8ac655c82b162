//! Phased cluster bring-up.
//!
//! Phases run strictly in order on a single control task: binary check,
//! stale-process cleanup, spawn, address resolution, mesh wiring, readiness
//! signal, leader discovery. Mesh building never starts before address
//! resolution of every node has been attempted.
//!
//! Only the binary check can abort the run. Everything downstream degrades:
//! a node whose address never resolves is left out of the mesh, a failed
//! pairwise connect is skipped, and a cluster that never elects a leader is
//! reported as such rather than raised. The consensus engine is expected to
//! tolerate partial peer knowledge at startup.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;

use crate::config::RetryPolicy;
use crate::control::ControlPlane;
use crate::process::{NodeProcessManager, ProcessError};
use crate::topology::{ClusterTopology, NodeDescriptor};

/// Node id -> resolved transport address. Populated incrementally; entries
/// are never removed during a bootstrap run.
pub type PeerAddressMap = HashMap<u64, String>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// The externally useful output of a successful discovery: where writes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    pub leader_id: u64,
    pub leader_port: u16,
}

impl ClusterHandle {
    pub fn url(&self, host: &str) -> String {
        format!("http://{}:{}", host, self.leader_port)
    }
}

/// Where a leader-discovery run ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    Searching,
    Found(ClusterHandle),
    Exhausted,
}

/// What a bootstrap run produced. `handle: None` with a populated rest of
/// the struct is the "cluster up but no leader yet" degraded result.
#[derive(Debug)]
pub struct BootstrapOutcome {
    pub handle: Option<ClusterHandle>,
    pub resolved: usize,
    pub connects_issued: usize,
    pub ready_acks: usize,
}

/// Polls a freshly spawned node until it reports its bound transport
/// address or the attempt budget runs out.
pub struct AddressResolver {
    policy: RetryPolicy,
}

impl AddressResolver {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Absence after the budget is a degraded signal, not an error; the
    /// caller logs and continues with the other nodes.
    pub async fn resolve(&self, control: &dyn ControlPlane, node: &NodeDescriptor) -> Option<String> {
        for attempt in 1..=self.policy.max_attempts {
            match control.listen_addr(node.port).await {
                Ok(address) => return Some(address),
                Err(err) => {
                    log::debug!(
                        "node {} address attempt {}/{}: {}",
                        node.id,
                        attempt,
                        self.policy.max_attempts,
                        err
                    );
                    if attempt < self.policy.max_attempts {
                        sleep(self.policy.interval).await;
                    }
                }
            }
        }
        None
    }

    /// Attempt every node in order. Nodes that never answer are simply
    /// absent from the returned map.
    pub async fn resolve_all(
        &self,
        control: &dyn ControlPlane,
        topology: &ClusterTopology,
    ) -> PeerAddressMap {
        let mut addresses = PeerAddressMap::new();
        for node in topology.nodes() {
            match self.resolve(control, node).await {
                Some(address) => {
                    log::info!("node {}: {}", node.id, address);
                    addresses.insert(node.id, address);
                }
                None => log::warn!("could not resolve address for node {}", node.id),
            }
        }
        addresses
    }
}

/// Wires the full mesh: every resolved node learns the address of every
/// other resolved node.
pub struct PeerMeshBuilder;

impl PeerMeshBuilder {
    /// Issues one connect call per ordered pair of resolved nodes and
    /// returns how many were issued. A failed connect is logged and skipped,
    /// not retried; a node missing from `addresses` is silently excluded.
    /// Mesh completeness is best-effort.
    pub async fn connect_all(
        control: &dyn ControlPlane,
        topology: &ClusterTopology,
        addresses: &PeerAddressMap,
    ) -> usize {
        let mut issued = 0;
        for node in topology.nodes() {
            if !addresses.contains_key(&node.id) {
                continue;
            }
            for peer in topology.nodes() {
                if peer.id == node.id {
                    continue;
                }
                let Some(peer_addr) = addresses.get(&peer.id) else {
                    continue;
                };
                issued += 1;
                if let Err(err) = control.connect_peer(node.port, peer.id, peer_addr).await {
                    log::warn!("connect node {} -> peer {} failed: {}", node.id, peer.id, err);
                }
            }
        }
        issued
    }
}

/// Tells every node that peer wiring is complete.
pub struct ReadinessSignaler;

impl ReadinessSignaler {
    /// One notification per node, each independently fire-and-forget.
    /// Returns how many nodes acknowledged; a node that misses the signal
    /// falls back to its own internal timers.
    pub async fn signal_ready(control: &dyn ControlPlane, topology: &ClusterTopology) -> usize {
        let mut acked = 0;
        for node in topology.nodes() {
            match control.mark_ready(node.port).await {
                Ok(()) => acked += 1,
                Err(err) => log::warn!("ready signal to node {} failed: {}", node.id, err),
            }
        }
        acked
    }
}

/// Polls the cluster on a fixed interval until some node claims leadership
/// or the tick budget runs out.
pub struct LeaderDiscoverer {
    policy: RetryPolicy,
}

impl LeaderDiscoverer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// One pass over the topology, in order. The first node answering
    /// `is_leader == true` wins and the scan stops; a transient dual-leader
    /// observation during the scan is not detected here - the consensus
    /// engine owns the single-leader invariant.
    pub async fn scan(
        &self,
        control: &dyn ControlPlane,
        topology: &ClusterTopology,
    ) -> Option<ClusterHandle> {
        for node in topology.nodes() {
            match control.is_leader(node.port).await {
                Ok(true) => {
                    return Some(ClusterHandle { leader_id: node.id, leader_port: node.port })
                }
                Ok(false) => {}
                Err(err) => {
                    log::debug!("leadership query to node {} failed: {}", node.id, err)
                }
            }
        }
        None
    }

    /// Ticks until a leader shows up or the budget runs out. Exhaustion is a
    /// degraded-cluster signal to the caller, not a fatal error.
    pub async fn discover(
        &self,
        control: &dyn ControlPlane,
        topology: &ClusterTopology,
    ) -> DiscoveryState {
        let mut state = DiscoveryState::Searching;
        let mut ticks = 0;
        while state == DiscoveryState::Searching {
            if ticks == self.policy.max_attempts {
                state = DiscoveryState::Exhausted;
                break;
            }
            ticks += 1;
            sleep(self.policy.interval).await;
            if let Some(handle) = self.scan(control, topology).await {
                log::info!("leader: node {} on port {}", handle.leader_id, handle.leader_port);
                state = DiscoveryState::Found(handle);
            }
        }
        state
    }
}

/// The full phased bring-up for one topology.
pub struct Bootstrap<'a> {
    topology: &'a ClusterTopology,
    resolve_policy: RetryPolicy,
    discovery_policy: RetryPolicy,
    /// Grace period after killing stale workers before spawning new ones.
    settle: Duration,
}

impl<'a> Bootstrap<'a> {
    pub fn new(topology: &'a ClusterTopology) -> Self {
        Self {
            topology,
            resolve_policy: RetryPolicy::address_resolution(),
            discovery_policy: RetryPolicy::leader_discovery(),
            settle: Duration::from_secs(1),
        }
    }

    pub fn with_policies(mut self, resolve: RetryPolicy, discovery: RetryPolicy) -> Self {
        self.resolve_policy = resolve;
        self.discovery_policy = discovery;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Everything after process launch: address resolution, mesh wiring,
    /// readiness, leader discovery. Split out so the coordination logic can
    /// be driven against a scripted control plane without real processes.
    pub async fn wire(&self, control: &dyn ControlPlane) -> BootstrapOutcome {
        let resolver = AddressResolver::new(self.resolve_policy);
        let addresses = resolver.resolve_all(control, self.topology).await;

        let connects_issued =
            PeerMeshBuilder::connect_all(control, self.topology, &addresses).await;
        log::info!("mesh wiring: {} connect calls issued", connects_issued);

        let ready_acks = ReadinessSignaler::signal_ready(control, self.topology).await;

        let discoverer = LeaderDiscoverer::new(self.discovery_policy);
        let handle = match discoverer.discover(control, self.topology).await {
            DiscoveryState::Found(handle) => Some(handle),
            DiscoveryState::Exhausted => {
                log::warn!("no leader found after {} ticks", self.discovery_policy.max_attempts);
                None
            }
            DiscoveryState::Searching => None,
        };

        BootstrapOutcome { handle, resolved: addresses.len(), connects_issued, ready_acks }
    }

    /// The whole run. Only [`ProcessError`] from the binary check aborts;
    /// a failed spawn is logged and the node is left for address resolution
    /// to give up on.
    pub async fn run(
        &self,
        manager: &mut NodeProcessManager,
        control: &dyn ControlPlane,
        kill_pattern: &str,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        manager.binary().ensure_available().await?;

        manager.terminate_all(kill_pattern).await;
        sleep(self.settle).await;

        for node in self.topology.nodes() {
            if let Err(err) = manager.spawn(node) {
                log::warn!("{}", err);
            }
        }

        Ok(self.wire(control).await)
    }
}
