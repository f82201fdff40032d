//! Cabinet: IPFS Directory Mirroring
//!
//! Keeps a local directory mirrored onto an IPFS node. Every file's content
//! hash is recorded in a handle-partitioned store and pinned; each change
//! republishes a digest of the store under the node's IPNS name.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod registry;
pub mod store;
pub mod sync;
pub mod tooling;
pub mod types;
pub mod watch;
