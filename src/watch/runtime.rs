//! Watch daemon and runtime logic.

use super::events::{signals_from, WatchConfig};
use super::pipeline::{DirectoryWatcher, PublishPipeline, RunSummary};
use crate::concurrency::ShutdownSignal;
use crate::error::CabinetError;
use crate::network::ContentNetwork;
use crate::store::HashStore;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};
use walkdir::WalkDir;

type SharedWatcher = Arc<Mutex<RecommendedWatcher>>;

/// Adds a non-recursive notify watch per directory.
struct NotifyDirectories {
    watcher: SharedWatcher,
}

impl DirectoryWatcher for NotifyDirectories {
    fn watch_directory(&mut self, dir: &Path) -> Result<(), CabinetError> {
        self.watcher
            .lock()
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(CabinetError::from)
    }
}

/// Watch mode daemon
pub struct WatchDaemon {
    config: WatchConfig,
    store: Arc<dyn HashStore>,
    network: Arc<dyn ContentNetwork>,
}

impl WatchDaemon {
    pub fn new(
        config: WatchConfig,
        store: Arc<dyn HashStore>,
        network: Arc<dyn ContentNetwork>,
    ) -> Self {
        Self {
            config,
            store,
            network,
        }
    }

    /// Register watches and start the event loop on its own thread.
    ///
    /// Fails if the node identity cannot be learned or the root cannot be
    /// watched.
    pub fn start(self) -> Result<DaemonHandle, CabinetError> {
        let node_id = self.network.identity()?;
        info!(node_id = %node_id, "Resolved local node identity");

        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            for signal in signals_from(res) {
                if let Err(e) = tx.send(signal) {
                    error!("Error sending watch event: {}", e);
                }
            }
        })?;
        let watcher: SharedWatcher = Arc::new(Mutex::new(watcher));

        self.register_watches(&watcher)?;

        let mut pipeline = PublishPipeline::new(
            self.config.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.network),
            node_id,
        );
        if self.config.recursive {
            pipeline = pipeline.with_directory_watcher(Box::new(NotifyDirectories {
                watcher: Arc::clone(&watcher),
            }));
        }

        let shutdown = ShutdownSignal::new();
        let loop_shutdown = shutdown.clone();
        let thread = std::thread::Builder::new()
            .name("cabinet-watch".to_string())
            .spawn(move || pipeline.run(&rx, &loop_shutdown))
            .map_err(|e| CabinetError::Notify(format!("Failed to spawn watch thread: {}", e)))?;

        Ok(DaemonHandle {
            shutdown,
            thread,
            _watcher: watcher,
        })
    }

    fn register_watches(&self, watcher: &SharedWatcher) -> Result<(), CabinetError> {
        let root = &self.config.root;
        let mut guard = watcher.lock();
        guard.watch(root, RecursiveMode::NonRecursive)?;
        info!(root = %root.display(), recursive = self.config.recursive, "Watching root");

        if !self.config.recursive {
            return Ok(());
        }

        let mut count = 0usize;
        let subdirs = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !self.config.is_store_path(e.path()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir());
        for entry in subdirs {
            guard.watch(entry.path(), RecursiveMode::NonRecursive)?;
            count += 1;
        }
        info!(directories = count, "Watching subdirectories");
        Ok(())
    }
}

/// Handle to a running daemon.
pub struct DaemonHandle {
    shutdown: ShutdownSignal,
    thread: JoinHandle<RunSummary>,
    _watcher: SharedWatcher,
}

impl DaemonHandle {
    /// Signal the daemon's loop can be cancelled through.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Cancel the loop and wait for it to finish.
    pub fn stop(self) -> Result<RunSummary, CabinetError> {
        self.shutdown.cancel();
        self.wait()
    }

    /// Block until the loop finishes.
    pub fn wait(self) -> Result<RunSummary, CabinetError> {
        self.thread
            .join()
            .map_err(|_| CabinetError::Notify("Watch thread panicked".to_string()))
    }
}
