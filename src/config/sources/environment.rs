//! Environment variable source: CABINET_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// `CABINET_NETWORK__API_URL` sets `network.api_url`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("CABINET")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    ))
}
