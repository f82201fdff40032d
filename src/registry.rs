//! Node registry: the deduplicated list of node identities that have announced
//! themselves for a handle, kept under the `NODELIST` reserved key.

use crate::error::CabinetError;
use crate::network::ContentNetwork;
use crate::store::HashStore;
use crate::types::{Handle, NodeId, StoreKey};
use std::sync::Arc;
use tracing::{debug, info};

const DELIMITER: char = ',';

/// Split a stored node list into identities, dropping blanks and repeats.
pub fn parse_node_list(raw: &str) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = Vec::new();
    for part in raw.split(DELIMITER) {
        let part = part.trim();
        if part.is_empty() || nodes.iter().any(|n| n.as_str() == part) {
            continue;
        }
        nodes.push(NodeId::new(part));
    }
    nodes
}

/// Compute the node list after announcing `local`.
///
/// Returns `None` when `local` is already listed and nothing must be written.
pub fn merge_node_list(existing: Option<&str>, local: &NodeId) -> Option<String> {
    let nodes = existing.map(parse_node_list).unwrap_or_default();
    if nodes.contains(local) {
        return None;
    }
    let merged: Vec<&str> = std::iter::once(local.as_str())
        .chain(nodes.iter().map(NodeId::as_str))
        .collect();
    Some(merged.join(&DELIMITER.to_string()))
}

/// Result of a registration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The local identity was written into the list.
    Added { node_id: NodeId, nodes: Vec<NodeId> },
    /// The local identity was already listed; nothing was written.
    AlreadyPresent { node_id: NodeId, nodes: Vec<NodeId> },
}

impl Registration {
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Registration::Added { nodes, .. } | Registration::AlreadyPresent { nodes, .. } => {
                nodes
            }
        }
    }
}

/// Node registry bound to a store and a network client.
pub struct NodeRegistry {
    store: Arc<dyn HashStore>,
    network: Arc<dyn ContentNetwork>,
}

impl NodeRegistry {
    pub fn new(store: Arc<dyn HashStore>, network: Arc<dyn ContentNetwork>) -> Self {
        Self { store, network }
    }

    /// Make sure the local node identity is listed for `handle`.
    ///
    /// Failing to learn the local identity is an error the caller treats as
    /// fatal. Re-running with the same identity writes nothing.
    pub fn ensure_self_registered(&self, handle: &Handle) -> Result<Registration, CabinetError> {
        let node_id = self.network.identity()?;
        let existing = self.store.get(handle, &StoreKey::NODE_LIST)?;
        debug!(
            handle = %handle,
            node_id = %node_id,
            nodes = existing.as_deref().unwrap_or(""),
            "Loaded node list"
        );

        match merge_node_list(existing.as_deref(), &node_id) {
            Some(merged) => {
                self.store.put(handle, &StoreKey::NODE_LIST, &merged)?;
                info!(handle = %handle, node_id = %node_id, "Registered node");
                Ok(Registration::Added {
                    node_id,
                    nodes: parse_node_list(&merged),
                })
            }
            None => {
                debug!(handle = %handle, node_id = %node_id, "Node already registered");
                Ok(Registration::AlreadyPresent {
                    nodes: existing.as_deref().map(parse_node_list).unwrap_or_default(),
                    node_id,
                })
            }
        }
    }

    /// Node identities currently listed for `handle`.
    pub fn nodes(&self, handle: &Handle) -> Result<Vec<NodeId>, CabinetError> {
        Ok(self
            .store
            .get(handle, &StoreKey::NODE_LIST)?
            .as_deref()
            .map(parse_node_list)
            .unwrap_or_default())
    }
}
