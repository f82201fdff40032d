//! Watch events and configuration.

use crate::types::Handle;
use notify::event::ModifyKind;
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Watch mode configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Root directory being mirrored
    pub root: PathBuf,
    /// Namespace for every record
    pub handle: Handle,
    /// Location of the hash store; events at or below it are ignored
    pub store_path: PathBuf,
    /// Key to publish under; `None` uses the node's own key
    pub publish_key: Option<String>,
    /// Watch every directory under the root instead of the root alone
    pub recursive: bool,
    /// How often the idle loop re-checks for shutdown, in milliseconds
    pub poll_interval_ms: u64,
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Whether `path` is the store itself or lives inside it.
    pub fn is_store_path(&self, path: &Path) -> bool {
        path.starts_with(&self.store_path)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            handle: Handle::new("default"),
            store_path: PathBuf::from("cabinet.db"),
            publish_key: None,
            recursive: false,
            poll_interval_ms: 250,
        }
    }
}

/// Filesystem change the pipeline acts on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    Created(PathBuf),
    Written(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Written(p) => p,
        }
    }
}

/// One item from the watcher: a change, or a failure report from the
/// notification backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Event(WatchEvent),
    Error(String),
}

/// Map a notify event onto the create/write events the pipeline handles.
///
/// Renames, removals, metadata changes, and accesses produce nothing.
pub fn convert_event(event: Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Created).collect(),
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other) => {
            event.paths.into_iter().map(WatchEvent::Written).collect()
        }
        _ => Vec::new(),
    }
}

/// Turn a watcher callback result into the signals sent to the loop.
pub fn signals_from(result: notify::Result<Event>) -> Vec<WatchSignal> {
    match result {
        Ok(event) => convert_event(event)
            .into_iter()
            .map(WatchSignal::Event)
            .collect(),
        Err(e) => vec![WatchSignal::Error(e.to_string())],
    }
}
