//! Publish pipeline: decides, per filesystem event, whether content changed
//! and drives the record, pin, digest, publish sequence when it did.

use super::events::{WatchConfig, WatchEvent, WatchSignal};
use crate::concurrency::ShutdownSignal;
use crate::error::CabinetError;
use crate::network::ContentNetwork;
use crate::store::{self, HashStore};
use crate::sync::{hash_file, record_pinned};
use crate::types::{ContentHash, NodeId, StoreKey};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Registers additional directories with the filesystem watcher.
pub trait DirectoryWatcher: Send {
    fn watch_directory(&mut self, dir: &Path) -> Result<(), CabinetError>;
}

/// Why an event was passed over without touching the store or network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The path is the hash store or inside it.
    StorePath,
    /// The path is a directory.
    Directory,
}

/// Result of processing one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The path was recorded and pinned and a new digest was published.
    Published {
        path: PathBuf,
        hash: ContentHash,
        digest: ContentHash,
    },
    /// The re-hash matched the recorded hash; nothing was written.
    Unchanged { path: PathBuf, hash: ContentHash },
    Skipped { path: PathBuf, reason: SkipReason },
    /// The watcher reported an error; logged only.
    NotifyFailure(String),
}

/// Tallies from a run of the event loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub published: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub notify_errors: usize,
}

impl RunSummary {
    fn tally(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Published { .. } => self.published += 1,
            Outcome::Unchanged { .. } => self.unchanged += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::NotifyFailure(_) => self.notify_errors += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.published + self.unchanged + self.skipped + self.failed + self.notify_errors
    }
}

/// Reactive publish pipeline. Processes one signal at a time, to completion.
pub struct PublishPipeline {
    config: WatchConfig,
    store: Arc<dyn HashStore>,
    network: Arc<dyn ContentNetwork>,
    node_id: NodeId,
    directories: Option<Box<dyn DirectoryWatcher>>,
}

impl PublishPipeline {
    pub fn new(
        config: WatchConfig,
        store: Arc<dyn HashStore>,
        network: Arc<dyn ContentNetwork>,
        node_id: NodeId,
    ) -> Self {
        Self {
            config,
            store,
            network,
            node_id,
            directories: None,
        }
    }

    /// Register newly created directories with `watcher`.
    pub fn with_directory_watcher(mut self, watcher: Box<dyn DirectoryWatcher>) -> Self {
        self.directories = Some(watcher);
        self
    }

    /// Process one signal.
    ///
    /// Errors leave the sequence abandoned where it failed; the caller logs
    /// them and moves on.
    pub fn handle_signal(&mut self, signal: WatchSignal) -> Result<Outcome, CabinetError> {
        match signal {
            WatchSignal::Event(WatchEvent::Created(path)) => self.add_and_publish(path),
            WatchSignal::Event(WatchEvent::Written(path)) => self.check_and_publish(path),
            WatchSignal::Error(message) => {
                warn!(error = %message, "Watcher reported an error");
                Ok(Outcome::NotifyFailure(message))
            }
        }
    }

    /// Create: record, pin, and publish unconditionally.
    fn add_and_publish(&mut self, path: PathBuf) -> Result<Outcome, CabinetError> {
        if let Some(reason) = self.skip_reason(&path)? {
            if reason == SkipReason::Directory {
                self.watch_new_directory(&path);
            }
            return Ok(Outcome::Skipped { path, reason });
        }

        let hash = hash_file(self.network.as_ref(), &path)?;
        let previous = self.store.get(&self.config.handle, &StoreKey::path(&path))?;
        let recorded = record_pinned(
            self.store.as_ref(),
            self.network.as_ref(),
            &self.config.handle,
            &path,
            hash,
            previous,
        )?;
        let digest = self.publish_digest()?;
        Ok(Outcome::Published {
            path,
            hash: recorded.hash,
            digest,
        })
    }

    /// Write: re-hash and publish only when the content hash moved.
    fn check_and_publish(&mut self, path: PathBuf) -> Result<Outcome, CabinetError> {
        if let Some(reason) = self.skip_reason(&path)? {
            return Ok(Outcome::Skipped { path, reason });
        }

        let previous = self.store.get(&self.config.handle, &StoreKey::path(&path))?;
        let hash = hash_file(self.network.as_ref(), &path)?;
        if previous.as_deref() == Some(hash.as_str()) {
            debug!(path = %path.display(), hash = %hash, "Content unchanged");
            return Ok(Outcome::Unchanged { path, hash });
        }

        let recorded = record_pinned(
            self.store.as_ref(),
            self.network.as_ref(),
            &self.config.handle,
            &path,
            hash,
            previous,
        )?;
        let digest = self.publish_digest()?;
        Ok(Outcome::Published {
            path,
            hash: recorded.hash,
            digest,
        })
    }

    fn skip_reason(&self, path: &Path) -> Result<Option<SkipReason>, CabinetError> {
        if self.config.is_store_path(path) {
            return Ok(Some(SkipReason::StorePath));
        }
        let metadata = std::fs::metadata(path).map_err(|e| CabinetError::io(path, e))?;
        if metadata.is_dir() {
            return Ok(Some(SkipReason::Directory));
        }
        Ok(None)
    }

    fn watch_new_directory(&mut self, dir: &Path) {
        let Some(watcher) = self.directories.as_mut() else {
            return;
        };
        match watcher.watch_directory(dir) {
            Ok(()) => info!(path = %dir.display(), "Watching new directory"),
            Err(e) => warn!(path = %dir.display(), error = %e, "Failed to watch new directory"),
        }
    }

    /// Hash the partition image, record it, publish it, and read it back.
    fn publish_digest(&self) -> Result<ContentHash, CabinetError> {
        let handle = &self.config.handle;
        store::log_partition(self.store.as_ref(), handle);

        let image = self.store.export(handle)?;
        let digest = self.network.add(&mut image.as_slice())?;
        self.store.put(handle, &StoreKey::STORE_DIGEST, digest.as_str())?;
        info!(handle = %handle, digest = %digest, "Publishing store digest");

        let name = self
            .network
            .publish(self.config.publish_key.as_deref(), &digest)?;
        match self.network.resolve(&self.node_id) {
            Ok(resolved) => info!(name = %name, resolved = %resolved, "Published store digest"),
            Err(e) => warn!(
                node_id = %self.node_id,
                error = %e,
                "Published store digest but could not resolve it back"
            ),
        }
        Ok(digest)
    }

    /// Consume signals until `shutdown` fires or the sender goes away.
    pub fn run(&mut self, signals: &Receiver<WatchSignal>, shutdown: &ShutdownSignal) -> RunSummary {
        let poll = self.config.poll_interval();
        let mut summary = RunSummary::default();
        info!(root = %self.config.root.display(), "Publish pipeline running");

        while !shutdown.is_cancelled() {
            match signals.recv_timeout(poll) {
                Ok(signal) => {
                    debug!(signal = ?signal, "Received watch signal");
                    let path = match &signal {
                        WatchSignal::Event(event) => event.path().display().to_string(),
                        WatchSignal::Error(_) => String::new(),
                    };
                    match self.handle_signal(signal) {
                        Ok(outcome) => summary.tally(&outcome),
                        Err(e) => {
                            summary.failed += 1;
                            error!(path = %path, error = %e, "Failed to process watch event");
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Watcher channel disconnected");
                    break;
                }
            }
        }

        info!(
            processed = summary.processed(),
            published = summary.published,
            failed = summary.failed,
            "Publish pipeline stopped"
        );
        summary
    }
}
