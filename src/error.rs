//! Error types for the store, the content network, and the sync agent.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the persisted hash store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: sled::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Failed to encode partition image: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures talking to the content-addressable network.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Failed to read content: {0}")]
    Body(#[source] std::io::Error),

    #[error("Failed to create network runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Top-level error for sync, registry, and watch operations.
#[derive(Debug, Error)]
pub enum CabinetError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Watch error: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CabinetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CabinetError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for CabinetError {
    fn from(err: config::ConfigError) -> Self {
        CabinetError::Config(err.to_string())
    }
}

impl From<notify::Error> for CabinetError {
    fn from(err: notify::Error) -> Self {
        CabinetError::Notify(err.to_string())
    }
}
