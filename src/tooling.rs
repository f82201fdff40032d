//! Tooling Layer
//!
//! Command-line surface over the sync, registry, and watch components, plus
//! the text renderers its commands share.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
pub use format::RecordEntry;
