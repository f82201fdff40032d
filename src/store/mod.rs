//! Hash Store
//!
//! Persisted mapping from a tracked path (or a reserved sentinel) to the
//! content hash last recorded for it, partitioned by handle. One current value
//! per key; writes overwrite.

pub mod persistence;

use crate::error::StoreError;
use crate::types::{Handle, ReservedKey, StoreKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use persistence::SledHashStore;

/// Published form of a partition.
///
/// Reserved records and path records live in separate maps, and paths that
/// are not valid UTF-8 are keyed by the hex of their raw bytes, so every
/// record keeps its own entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionImage {
    pub reserved: BTreeMap<String, String>,
    pub paths: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raw_paths: BTreeMap<String, String>,
}

impl PartitionImage {
    /// Add a record. The StoreDigest record is never part of the image.
    pub fn insert(&mut self, key: &StoreKey, value: &str) {
        let value = value.to_string();
        match key {
            StoreKey::Reserved(ReservedKey::StoreDigest) => {}
            StoreKey::Reserved(reserved) => {
                self.reserved.insert(reserved.name().to_string(), value);
            }
            StoreKey::Path(path) => match path.to_str() {
                Some(utf8) => {
                    self.paths.insert(utf8.to_string(), value);
                }
                None => {
                    let raw = hex::encode(path.as_os_str().as_encoded_bytes());
                    self.raw_paths.insert(raw, value);
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.reserved.len() + self.paths.len() + self.raw_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Hash store interface
pub trait HashStore: Send + Sync {
    /// Write `value` under `key`, creating the partition if needed. Durable on return.
    fn put(&self, handle: &Handle, key: &StoreKey, value: &str) -> Result<(), StoreError>;

    /// Read the value under `key`. A missing partition or key is `Ok(None)`.
    fn get(&self, handle: &Handle, key: &StoreKey) -> Result<Option<String>, StoreError>;

    /// Drop `key` from the partition. Only used to undo a write whose pin failed.
    fn remove(&self, handle: &Handle, key: &StoreKey) -> Result<(), StoreError>;

    /// Visit every record in the store's native key order. Diagnostics only.
    fn for_each(
        &self,
        handle: &Handle,
        visit: &mut dyn FnMut(&StoreKey, &str),
    ) -> Result<(), StoreError>;

    /// Canonical [`PartitionImage`] bytes, excluding the StoreDigest record.
    ///
    /// The image is what gets hashed and published as the StoreDigest.
    fn export(&self, handle: &Handle) -> Result<Vec<u8>, StoreError>;
}

/// Put `value` back to `previous`, or remove the key if there was none.
pub(crate) fn restore(
    store: &dyn HashStore,
    handle: &Handle,
    key: &StoreKey,
    previous: Option<&str>,
) -> Result<(), StoreError> {
    match previous {
        Some(value) => store.put(handle, key, value),
        None => store.remove(handle, key),
    }
}

/// Log every record of the partition at debug level.
pub(crate) fn log_partition(store: &dyn HashStore, handle: &Handle) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let result = store.for_each(handle, &mut |key, value| {
        tracing::debug!(handle = %handle, key = %key, value = %value, "Store record");
    });
    if let Err(e) = result {
        tracing::warn!(handle = %handle, error = %e, "Failed to enumerate store");
    }
}
