//! Core types for the cabinet directory mirror.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle: logical namespace; every persisted record is partitioned by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn new(name: impl Into<String>) -> Self {
        Handle(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// NodeId: a peer identity as reported by the content network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ContentHash: opaque content address produced by the content network.
///
/// Identical bytes always produce the same hash; the format belongs to the
/// network and is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        ContentHash(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sentinel keys that share a partition with tracked file paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedKey {
    /// Comma-joined list of node identities announced for the handle.
    NodeList,
    /// Digest of the partition image that was last published.
    StoreDigest,
}

impl ReservedKey {
    pub fn name(&self) -> &'static str {
        match self {
            ReservedKey::NodeList => "NODELIST",
            ReservedKey::StoreDigest => "STORE_DIGEST",
        }
    }

    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"NODELIST" => Some(ReservedKey::NodeList),
            b"STORE_DIGEST" => Some(ReservedKey::StoreDigest),
            _ => None,
        }
    }
}

const PATH_TAG: u8 = 0x00;
const RESERVED_TAG: u8 = 0x01;

/// Key of a record inside a handle's partition.
///
/// The leading tag byte of the encoded form keeps reserved names and file
/// paths in disjoint key spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Path(PathBuf),
    Reserved(ReservedKey),
}

impl StoreKey {
    pub fn path(path: impl AsRef<Path>) -> Self {
        StoreKey::Path(path.as_ref().to_path_buf())
    }

    pub const NODE_LIST: StoreKey = StoreKey::Reserved(ReservedKey::NodeList);
    pub const STORE_DIGEST: StoreKey = StoreKey::Reserved(ReservedKey::StoreDigest);

    pub fn encode(&self) -> Vec<u8> {
        match self {
            StoreKey::Path(path) => {
                let raw = path.as_os_str().as_encoded_bytes();
                let mut out = Vec::with_capacity(raw.len() + 1);
                out.push(PATH_TAG);
                out.extend_from_slice(raw);
                out
            }
            StoreKey::Reserved(reserved) => {
                let name = reserved.name().as_bytes();
                let mut out = Vec::with_capacity(name.len() + 1);
                out.push(RESERVED_TAG);
                out.extend_from_slice(name);
                out
            }
        }
    }

    /// Decode a stored key. Returns `None` for bytes this crate never writes.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        let (tag, rest) = raw.split_first()?;
        match *tag {
            PATH_TAG => Some(StoreKey::Path(path_from_bytes(rest))),
            RESERVED_TAG => ReservedKey::from_name(rest).map(StoreKey::Reserved),
            _ => None,
        }
    }
}

#[cfg(unix)]
fn path_from_bytes(raw: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(raw))
}

// Keys are written from `as_encoded_bytes`; outside Unix only well-formed
// UTF-8 round-trips exactly.
#[cfg(not(unix))]
fn path_from_bytes(raw: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(raw).into_owned())
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::Path(path) => write!(f, "{}", path.display()),
            StoreKey::Reserved(reserved) => f.write_str(reserved.name()),
        }
    }
}
