//! Watch runtime: events, publish pipeline, and daemon.

mod events;
mod pipeline;
mod runtime;

pub use events::{convert_event, signals_from, WatchConfig, WatchEvent, WatchSignal};
pub use pipeline::{DirectoryWatcher, Outcome, PublishPipeline, RunSummary, SkipReason};
pub use runtime::{DaemonHandle, WatchDaemon};
