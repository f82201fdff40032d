//! Sled-backed hash store: one sled tree per handle, one database per root.

use super::{HashStore, PartitionImage};
use crate::error::StoreError;
use crate::types::{Handle, StoreKey};
use parking_lot::Mutex;
use sled::Db;
use std::path::Path;

/// Hash store on a single long-lived sled handle.
///
/// The mutex serialises whole operations so that a read-modify-write issued
/// by the pipeline never interleaves with the registry's startup write.
pub struct SledHashStore {
    db: Mutex<Db>,
}

impl SledHashStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            db: Mutex::new(db),
        })
    }

    fn existing_tree(db: &Db, handle: &Handle) -> Result<Option<sled::Tree>, StoreError> {
        let name = handle.as_str().as_bytes();
        let exists = db.tree_names().iter().any(|n| n.as_ref() == name);
        if !exists {
            return Ok(None);
        }
        Ok(Some(db.open_tree(name)?))
    }
}

impl HashStore for SledHashStore {
    fn put(&self, handle: &Handle, key: &StoreKey, value: &str) -> Result<(), StoreError> {
        let db = self.db.lock();
        let tree = db.open_tree(handle.as_str().as_bytes())?;
        tree.insert(key.encode(), value.as_bytes())?;
        tree.flush()?;
        Ok(())
    }

    fn get(&self, handle: &Handle, key: &StoreKey) -> Result<Option<String>, StoreError> {
        let db = self.db.lock();
        let Some(tree) = Self::existing_tree(&db, handle)? else {
            return Ok(None);
        };
        Ok(tree
            .get(key.encode())?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    fn remove(&self, handle: &Handle, key: &StoreKey) -> Result<(), StoreError> {
        let db = self.db.lock();
        if let Some(tree) = Self::existing_tree(&db, handle)? {
            tree.remove(key.encode())?;
            tree.flush()?;
        }
        Ok(())
    }

    fn for_each(
        &self,
        handle: &Handle,
        visit: &mut dyn FnMut(&StoreKey, &str),
    ) -> Result<(), StoreError> {
        let db = self.db.lock();
        let Some(tree) = Self::existing_tree(&db, handle)? else {
            return Ok(());
        };
        for item in tree.iter() {
            let (raw_key, raw_value) = item?;
            match StoreKey::decode(&raw_key) {
                Some(key) => visit(&key, &String::from_utf8_lossy(&raw_value)),
                None => tracing::debug!(
                    handle = %handle,
                    "Skipping record with unrecognised key encoding"
                ),
            }
        }
        Ok(())
    }

    fn export(&self, handle: &Handle) -> Result<Vec<u8>, StoreError> {
        let mut image = PartitionImage::default();
        self.for_each(handle, &mut |key, value| image.insert(key, value))?;
        image.to_bytes()
    }
}
