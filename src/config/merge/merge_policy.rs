//! Built-in defaults forming the lowest configuration layer.

use crate::config::{DEFAULT_API_URL, DEFAULT_HANDLE, DEFAULT_POLL_INTERVAL_MS};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the scalar defaults every later source may override.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("handle", DEFAULT_HANDLE)?
        .set_default("store.path", "cabinet.db")?
        .set_default("network.api_url", DEFAULT_API_URL)?
        .set_default("watch.recursive", false)?
        .set_default("watch.poll_interval_ms", DEFAULT_POLL_INTERVAL_MS)
}
