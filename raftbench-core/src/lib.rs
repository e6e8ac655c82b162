//! Raftbench - Core
//!
//! Bootstrap orchestration and load generation for a multi-process Raft KV
//! cluster. The worker node itself (consensus, log replication, the KV state
//! machine) is an external binary; this crate only drives it through its
//! control-plane HTTP API and benchmarks it through the KV data path.
//!
//! # Overview
//!
//! A bootstrap run is a fixed sequence of phases on one control task:
//!
//! 1. [`process`] - make sure the worker binary exists (the only fatal
//!    failure), clean up stale processes, launch one process per node.
//! 2. [`bootstrap`] - poll every node for its bound transport address, wire
//!    the full peer mesh, signal readiness, then poll for a leader.
//! 3. [`bench`] - drive PUT/GET load against the leader, sequentially or
//!    through a bounded pool of concurrent workers.
//! 4. [`stats`] - turn raw operation outcomes into throughput and latency
//!    reports.
//!
//! Everything past the binary build check degrades gracefully: unresolved
//! addresses, failed peer connects, missed readiness signals and a cluster
//! that never elects a leader are all reported results, not errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use raftbench_core::bootstrap::Bootstrap;
//! use raftbench_core::control::HttpControlPlane;
//! use raftbench_core::process::{NodeProcessManager, WorkerBinary};
//! use raftbench_core::topology::ClusterTopology;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let topology = ClusterTopology::full_mesh(8080, 3);
//!     let binary = WorkerBinary::new("raft-node/raft-node", None);
//!     let pattern = binary.kill_pattern();
//!     let mut manager = NodeProcessManager::new(binary);
//!     let control = HttpControlPlane::localhost(std::time::Duration::from_secs(1));
//!
//!     let outcome = Bootstrap::new(&topology).run(&mut manager, &control, &pattern).await?;
//!     match outcome.handle {
//!         Some(handle) => println!("leader: node {} on port {}", handle.leader_id, handle.leader_port),
//!         None => println!("no leader found yet"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod bench;
pub mod bootstrap;
pub mod config;
pub mod control;
pub mod kv;
pub mod process;
pub mod stats;
pub mod topology;

pub use bootstrap::{Bootstrap, BootstrapOutcome, ClusterHandle, DiscoveryState};
pub use config::RetryPolicy;
pub use topology::{ClusterTopology, NodeDescriptor};
