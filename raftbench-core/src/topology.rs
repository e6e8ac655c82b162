//! Cluster topology: which nodes exist, where they listen, who they peer with.

use std::collections::BTreeSet;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("duplicate node id {0} in topology")]
    DuplicateId(u64),
    #[error("node {0} lists itself as a peer")]
    SelfPeer(u64),
    #[error("node {node} references unknown peer {peer}")]
    UnknownPeer { node: u64, peer: u64 },
}

/// One worker node slot: identity, control port, and the peers it should end
/// up knowing about. Immutable once the topology is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub id: u64,
    pub port: u16,
    pub peer_ids: BTreeSet<u64>,
}

/// Ordered set of node descriptors. Construction enforces unique ids, no
/// self-loops, and that every referenced peer is itself a node here —
/// symmetry of peer knowledge is the orchestrator's job, not the input's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTopology {
    nodes: Vec<NodeDescriptor>,
}

impl ClusterTopology {
    pub fn new(nodes: Vec<NodeDescriptor>) -> Result<Self, TopologyError> {
        let mut ids = BTreeSet::new();
        for node in &nodes {
            if !ids.insert(node.id) {
                return Err(TopologyError::DuplicateId(node.id));
            }
        }
        for node in &nodes {
            if node.peer_ids.contains(&node.id) {
                return Err(TopologyError::SelfPeer(node.id));
            }
            for &peer in &node.peer_ids {
                if !ids.contains(&peer) {
                    return Err(TopologyError::UnknownPeer { node: node.id, peer });
                }
            }
        }
        Ok(Self { nodes })
    }

    /// Default cluster shape: `count` nodes with ids `0..count` on
    /// consecutive ports starting at `base_port`, every node peered with
    /// every other.
    pub fn full_mesh(base_port: u16, count: u64) -> Self {
        let nodes = (0..count)
            .map(|id| NodeDescriptor {
                id,
                port: base_port + id as u16,
                peer_ids: (0..count).filter(|&p| p != id).collect(),
            })
            .collect();
        // full_mesh output satisfies the constructor invariants by shape
        Self { nodes }
    }

    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
