//! Shared fixtures: an in-memory content network that records every call.

use cabinet::error::NetworkError;
use cabinet::network::ContentNetwork;
use cabinet::store::{HashStore, SledHashStore};
use cabinet::types::{ContentHash, NodeId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// One call made against the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Identity,
    Add(ContentHash),
    Pin(ContentHash),
    Publish {
        key: Option<String>,
        hash: ContentHash,
    },
    Resolve(NodeId),
}

#[derive(Debug, Default)]
struct Failures {
    identity: bool,
    add: bool,
    publish: bool,
    resolve: bool,
    /// Pins that succeed before every further pin fails.
    pins_before_failure: Option<usize>,
}

/// Content-addressed network held in memory. Hashes are blake3 digests of the
/// bytes added, so equal content always yields equal hashes.
pub struct RecordingNetwork {
    node_id: NodeId,
    calls: Mutex<Vec<Call>>,
    blobs: Mutex<HashMap<ContentHash, Vec<u8>>>,
    pins: Mutex<Vec<ContentHash>>,
    failures: Mutex<Failures>,
}

impl RecordingNetwork {
    pub fn new(node_id: &str) -> Arc<Self> {
        Arc::new(Self {
            node_id: NodeId::new(node_id),
            calls: Mutex::new(Vec::new()),
            blobs: Mutex::new(HashMap::new()),
            pins: Mutex::new(Vec::new()),
            failures: Mutex::new(Failures::default()),
        })
    }

    pub fn hash_of(bytes: &[u8]) -> ContentHash {
        ContentHash::new(format!("b{}", blake3::hash(bytes).to_hex()))
    }

    pub fn fail_identity(&self) {
        self.failures.lock().identity = true;
    }

    pub fn fail_add(&self) {
        self.failures.lock().add = true;
    }

    pub fn fail_pins_after(&self, successes: usize) {
        self.failures.lock().pins_before_failure = Some(successes);
    }

    pub fn fail_publish(&self) {
        self.failures.lock().publish = true;
    }

    pub fn fail_resolve(&self) {
        self.failures.lock().resolve = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn pinned(&self) -> Vec<ContentHash> {
        self.pins.lock().clone()
    }

    pub fn blob(&self, hash: &ContentHash) -> Option<Vec<u8>> {
        self.blobs.lock().get(hash).cloned()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn injected(endpoint: &str) -> NetworkError {
        NetworkError::Api {
            endpoint: endpoint.to_string(),
            status: 500,
            message: "injected failure".to_string(),
        }
    }
}

impl ContentNetwork for RecordingNetwork {
    fn identity(&self) -> Result<NodeId, NetworkError> {
        self.record(Call::Identity);
        if self.failures.lock().identity {
            return Err(Self::injected("/api/v0/id"));
        }
        Ok(self.node_id.clone())
    }

    fn add(&self, content: &mut dyn Read) -> Result<ContentHash, NetworkError> {
        if self.failures.lock().add {
            return Err(Self::injected("/api/v0/add"));
        }
        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .map_err(NetworkError::Body)?;
        let hash = Self::hash_of(&bytes);
        self.blobs.lock().insert(hash.clone(), bytes);
        self.record(Call::Add(hash.clone()));
        Ok(hash)
    }

    fn pin(&self, hash: &ContentHash) -> Result<(), NetworkError> {
        self.record(Call::Pin(hash.clone()));
        let mut failures = self.failures.lock();
        if let Some(remaining) = failures.pins_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(Self::injected("/api/v0/pin/add"));
            }
            *remaining -= 1;
        }
        self.pins.lock().push(hash.clone());
        Ok(())
    }

    fn publish(&self, key: Option<&str>, hash: &ContentHash) -> Result<String, NetworkError> {
        self.record(Call::Publish {
            key: key.map(str::to_string),
            hash: hash.clone(),
        });
        if self.failures.lock().publish {
            return Err(Self::injected("/api/v0/name/publish"));
        }
        Ok(self.node_id.to_string())
    }

    fn resolve(&self, node: &NodeId) -> Result<String, NetworkError> {
        self.record(Call::Resolve(node.clone()));
        if self.failures.lock().resolve {
            return Err(Self::injected("/api/v0/name/resolve"));
        }
        Ok(format!("/ipfs/{}", node))
    }
}

/// A canonical root directory plus its hash store.
pub struct Workspace {
    _temp: TempDir,
    pub root: PathBuf,
    pub store_path: PathBuf,
    pub store: Arc<SledHashStore>,
}

impl Workspace {
    /// Store kept beside the root.
    pub fn new() -> Self {
        Self::build(|base, _root| base.join("store.db"))
    }

    /// Default layout: the store is `<root>/cabinet.db`.
    pub fn with_store_in_root() -> Self {
        Self::build(|_base, root| root.join("cabinet.db"))
    }

    fn build(store_location: impl FnOnce(&Path, &Path) -> PathBuf) -> Self {
        let temp = TempDir::new().unwrap();
        let base = dunce::canonicalize(temp.path()).unwrap();
        let root = base.join("root");
        std::fs::create_dir(&root).unwrap();
        let store_path = store_location(&base, &root);
        let store = Arc::new(SledHashStore::open(&store_path).unwrap());
        Self {
            _temp: temp,
            root,
            store_path,
            store,
        }
    }

    /// Keys of every path record under the handle.
    pub fn recorded_paths(&self, handle: &cabinet::types::Handle) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        self.store
            .for_each(handle, &mut |key, _| {
                if let cabinet::types::StoreKey::Path(path) = key {
                    paths.push(path.clone());
                }
            })
            .unwrap();
        paths
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn store(&self) -> Arc<dyn HashStore> {
        self.store.clone()
    }
}

pub fn network(network: &Arc<RecordingNetwork>) -> Arc<dyn ContentNetwork> {
    network.clone()
}

pub fn path_key(path: &Path) -> cabinet::types::StoreKey {
    cabinet::types::StoreKey::path(path)
}
