//! Directory synchronizer: the initial full pass that hashes, records, and
//! pins every file under the root.

use crate::error::CabinetError;
use crate::network::ContentNetwork;
use crate::store::{self, HashStore};
use crate::types::{ContentHash, Handle, StoreKey};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counts from one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files hashed, recorded, and pinned.
    pub files: usize,
    /// Files whose recorded hash changed (or was absent).
    pub changed: usize,
    /// Files whose hash matched the recorded one.
    pub unchanged: usize,
    /// Directories passed over.
    pub directories: usize,
}

/// What recording a hash did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Recorded {
    pub previous: Option<String>,
    pub hash: ContentHash,
}

impl Recorded {
    pub fn changed(&self) -> bool {
        self.previous.as_deref() != Some(self.hash.as_str())
    }
}

/// Stream the file at `path` to the network and return its content hash.
pub(crate) fn hash_file(
    network: &dyn ContentNetwork,
    path: &Path,
) -> Result<ContentHash, CabinetError> {
    let mut file = File::open(path).map_err(|e| CabinetError::io(path, e))?;
    Ok(network.add(&mut file)?)
}

/// Write `(path, hash)` and pin `hash`.
///
/// If the pin fails the key is put back the way it was, so no path stays
/// recorded without its content pinned.
pub(crate) fn record_pinned(
    store: &dyn HashStore,
    network: &dyn ContentNetwork,
    handle: &Handle,
    path: &Path,
    hash: ContentHash,
    previous: Option<String>,
) -> Result<Recorded, CabinetError> {
    let key = StoreKey::path(path);
    store.put(handle, &key, hash.as_str())?;
    if let Err(e) = network.pin(&hash) {
        if let Err(undo) = store::restore(store, handle, &key, previous.as_deref()) {
            warn!(
                path = %path.display(),
                error = %undo,
                "Failed to roll back record after pin failure"
            );
        }
        return Err(e.into());
    }
    Ok(Recorded { previous, hash })
}

/// Performs the initial synchronization pass.
pub struct DirectorySynchronizer {
    store: Arc<dyn HashStore>,
    network: Arc<dyn ContentNetwork>,
    store_path: Option<PathBuf>,
}

impl DirectorySynchronizer {
    pub fn new(store: Arc<dyn HashStore>, network: Arc<dyn ContentNetwork>) -> Self {
        Self {
            store,
            network,
            store_path: None,
        }
    }

    /// Leave the hash store's own files out of the walk.
    ///
    /// Needed whenever the store lives under the root: its files change on
    /// every write, so recording them would make each pass rewrite them.
    pub fn excluding_store(mut self, store_path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(store_path.into());
        self
    }

    fn is_store_path(&self, path: &Path) -> bool {
        self.store_path
            .as_deref()
            .is_some_and(|store| path.starts_with(store))
    }

    /// Hash, record, and pin every file under `root`, depth first.
    ///
    /// The first failure aborts the walk and is returned. Records written
    /// before it are kept.
    pub fn sync(&self, handle: &Handle, root: &Path) -> Result<SyncReport, CabinetError> {
        info!(handle = %handle, root = %root.display(), "Starting directory sync");
        let mut report = SyncReport::default();

        let walk = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.is_store_path(e.path()));
        for entry in walk {
            let entry = entry.map_err(|e| walk_error(root, e))?;
            let path = entry.path();

            // Follow symlinks for the type check: a link to a directory is
            // skipped, a link to a file is hashed.
            let metadata = std::fs::metadata(path).map_err(|e| CabinetError::io(path, e))?;
            if metadata.is_dir() {
                report.directories += 1;
                continue;
            }

            let recorded = self.sync_file(handle, path)?;
            report.files += 1;
            if recorded.changed() {
                report.changed += 1;
            } else {
                report.unchanged += 1;
            }
        }

        info!(
            handle = %handle,
            files = report.files,
            changed = report.changed,
            unchanged = report.unchanged,
            "Directory sync complete"
        );
        Ok(report)
    }

    fn sync_file(&self, handle: &Handle, path: &Path) -> Result<Recorded, CabinetError> {
        let hash = hash_file(self.network.as_ref(), path)?;
        let previous = self.store.get(handle, &StoreKey::path(path))?;
        let recorded = record_pinned(
            self.store.as_ref(),
            self.network.as_ref(),
            handle,
            path,
            hash,
            previous,
        )?;
        debug!(
            path = %path.display(),
            hash = %recorded.hash,
            changed = recorded.changed(),
            "Synced file"
        );
        Ok(recorded)
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> CabinetError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(root));
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
    CabinetError::io(path, source)
}
