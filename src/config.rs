//! Configuration
//!
//! `CabinetConfig` is assembled from built-in defaults, the global config
//! file, an optional explicit file, and `CABINET_*` environment variables, in
//! that order of precedence. The resolved value is passed into every
//! component's constructor.

mod facade;
mod merge;
mod paths;
mod root;
mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use root::storage_paths::StoreConfig;

use crate::error::CabinetError;
use crate::logging::LoggingConfig;
use crate::types::Handle;
use crate::watch::WatchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_HANDLE: &str = "default";
pub(crate) const DEFAULT_API_URL: &str = "http://localhost:5001";
pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

fn default_handle() -> String {
    DEFAULT_HANDLE.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CabinetConfig {
    /// Namespace every record is partitioned by
    #[serde(default = "default_handle")]
    pub handle: String,

    /// Directory to mirror; `None` means `$HOME/cabinet`
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CabinetConfig {
    fn default() -> Self {
        Self {
            handle: default_handle(),
            root: None,
            store: StoreConfig::default(),
            network: NetworkConfig::default(),
            watch: WatchSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Content network endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Base URL of the Kubo RPC API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Key name to publish under; unset publishes under the node's own key
    #[serde(default)]
    pub publish_key: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            publish_key: None,
        }
    }
}

/// Filesystem watch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Watch every directory under the root, adding watches for new ones
    #[serde(default)]
    pub recursive: bool,

    /// Idle loop shutdown check interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            recursive: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl CabinetConfig {
    pub fn handle(&self) -> Result<Handle, CabinetError> {
        let handle = self.handle.trim();
        if handle.is_empty() {
            return Err(CabinetError::Config("handle must not be empty".to_string()));
        }
        Ok(Handle::new(handle))
    }

    /// Canonical root directory; it must already exist.
    pub fn resolve_root(&self) -> Result<PathBuf, CabinetError> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => xdg::default_root()?,
        };
        let canonical = dunce::canonicalize(&root).map_err(|e| CabinetError::io(&root, e))?;
        if !canonical.is_dir() {
            return Err(CabinetError::Config(format!(
                "Root {} is not a directory",
                canonical.display()
            )));
        }
        Ok(canonical)
    }

    /// Watch configuration for a resolved root and store location.
    pub fn watch_config(&self, root: &Path, store_path: &Path) -> Result<WatchConfig, CabinetError> {
        Ok(WatchConfig {
            root: root.to_path_buf(),
            handle: self.handle()?,
            store_path: store_path.to_path_buf(),
            publish_key: self.network.publish_key.clone(),
            recursive: self.watch.recursive,
            poll_interval_ms: self.watch.poll_interval_ms,
        })
    }
}
