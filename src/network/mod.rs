//! Content Network
//!
//! The capability surface the agent consumes from the content-addressable
//! network: identity, add, pin, publish, resolve. Every call blocks until the
//! network answers.

pub mod kubo;

use crate::error::NetworkError;
use crate::types::{ContentHash, NodeId};
use std::io::Read;

pub use kubo::KuboClient;

/// Content network client interface
pub trait ContentNetwork: Send + Sync {
    /// Identity of the local node.
    fn identity(&self) -> Result<NodeId, NetworkError>;

    /// Store the bytes read from `content` and return their content hash.
    fn add(&self, content: &mut dyn Read) -> Result<ContentHash, NetworkError>;

    /// Retain `hash` indefinitely.
    fn pin(&self, hash: &ContentHash) -> Result<(), NetworkError>;

    /// Point the mutable name for `key` (the node's own key when `None`) at `hash`.
    fn publish(&self, key: Option<&str>, hash: &ContentHash) -> Result<String, NetworkError>;

    /// Look up what `node` currently publishes.
    fn resolve(&self, node: &NodeId) -> Result<String, NetworkError>;
}
