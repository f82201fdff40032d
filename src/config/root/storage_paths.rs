//! StoreConfig and path resolution for the hash store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_store_path() -> PathBuf {
    PathBuf::from("cabinet.db")
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the hash store (relative paths resolve against the root)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl StoreConfig {
    /// Resolve the store location for `root`.
    pub fn resolve_path(&self, root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path)
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}
