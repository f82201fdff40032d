//! CLI Tooling
//!
//! Command-line interface for the cabinet agent: one-shot sync, node
//! registration, store inspection, and the long-running watch mode.

use crate::config::{CabinetConfig, ConfigLoader};
use crate::error::CabinetError;
use crate::logging::{LogFormat, LogOutput};
use crate::network::{ContentNetwork, KuboClient};
use crate::registry::NodeRegistry;
use crate::store::{HashStore, SledHashStore};
use crate::sync::DirectorySynchronizer;
use crate::tooling::format::{
    format_nodes_text, format_records_text, format_registration_text, format_run_summary_text,
    format_sync_report_text, RecordEntry,
};
use crate::types::Handle;
use crate::watch::WatchDaemon;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Cabinet CLI - mirror a directory onto IPFS
#[derive(Parser)]
#[command(name = "cabinet")]
#[command(about = "Mirror a local directory onto IPFS and publish its hash map")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config file)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory to mirror (default: ~/cabinet)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Namespace the records are stored under
    #[arg(long)]
    pub handle: Option<String>,

    /// Kubo RPC API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log output
    #[arg(long, value_enum)]
    pub log_output: Option<LogOutput>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Sync the root, register this node, then watch and publish changes
    Run,
    /// Hash, record, and pin every file under the root once
    Sync,
    /// Add this node to the handle's node list
    Register,
    /// List the records stored for the handle
    Ls {
        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
    /// Show the node identities registered for the handle
    Nodes,
}

impl Cli {
    /// Load configuration and apply command-line overrides.
    pub fn load_config(&self) -> Result<CabinetConfig, CabinetError> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(path).map_err(|e| {
                CabinetError::Config(format!(
                    "Failed to load config from {}: {}",
                    path.display(),
                    e
                ))
            })?,
            None => ConfigLoader::load()
                .map_err(|e| CabinetError::Config(format!("Failed to load config: {}", e)))?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Command-line flags win over every config layer.
    pub fn apply_overrides(&self, config: &mut CabinetConfig) {
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(handle) = &self.handle {
            config.handle = handle.clone();
        }
        if let Some(api_url) = &self.api_url {
            config.network.api_url = api_url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(output) = self.log_output {
            config.logging.output = output;
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

/// Resolved runtime wiring for one CLI invocation.
pub struct CliContext {
    config: CabinetConfig,
    handle: Handle,
    root: PathBuf,
    store_path: PathBuf,
    store: Arc<dyn HashStore>,
    network: Arc<dyn ContentNetwork>,
}

impl CliContext {
    /// Resolve the root, open the store, and connect the Kubo client.
    pub fn new(config: CabinetConfig) -> Result<Self, CabinetError> {
        let network: Arc<dyn ContentNetwork> = Arc::new(KuboClient::new(&config.network.api_url)?);
        Self::with_network(config, network)
    }

    /// Same as [`CliContext::new`] with a caller-provided network client.
    pub fn with_network(
        config: CabinetConfig,
        network: Arc<dyn ContentNetwork>,
    ) -> Result<Self, CabinetError> {
        let handle = config.handle()?;
        let root = config.resolve_root()?;
        let store_path = config.store.resolve_path(&root);
        let store = SledHashStore::open(&store_path)?;
        let store_path =
            dunce::canonicalize(&store_path).map_err(|e| CabinetError::io(&store_path, e))?;

        Ok(Self {
            config,
            handle,
            root,
            store_path,
            store: Arc::new(store),
            network,
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn store_path(&self) -> &PathBuf {
        &self.store_path
    }

    pub fn store(&self) -> Arc<dyn HashStore> {
        Arc::clone(&self.store)
    }

    /// Execute a command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, CabinetError> {
        match command {
            Commands::Run => self.run(),
            Commands::Sync => {
                let report = self.synchronizer().sync(&self.handle, &self.root)?;
                Ok(format_sync_report_text(&report))
            }
            Commands::Register => {
                let registration = self.registry().ensure_self_registered(&self.handle)?;
                Ok(format_registration_text(self.handle.as_str(), &registration))
            }
            Commands::Ls { format } => {
                let records = self.records()?;
                if format == "json" {
                    serde_json::to_string_pretty(&records).map_err(|e| {
                        CabinetError::Config(format!("Failed to render records: {}", e))
                    })
                } else {
                    Ok(format_records_text(self.handle.as_str(), &records))
                }
            }
            Commands::Nodes => {
                let nodes = self.registry().nodes(&self.handle)?;
                Ok(format_nodes_text(self.handle.as_str(), &nodes))
            }
        }
    }

    /// Bootstrap then watch until the daemon stops.
    fn run(&self) -> Result<String, CabinetError> {
        let report = self.synchronizer().sync(&self.handle, &self.root)?;
        info!("{}", format_sync_report_text(&report));

        let registration = self.registry().ensure_self_registered(&self.handle)?;
        info!(nodes = registration.nodes().len(), "Node registry ready");

        let watch_config = self.config.watch_config(&self.root, &self.store_path)?;
        let daemon = WatchDaemon::new(watch_config, self.store(), Arc::clone(&self.network));

        info!("Starting watch mode daemon");
        let summary = daemon.start()?.wait()?;
        Ok(format_run_summary_text(&summary))
    }

    fn synchronizer(&self) -> DirectorySynchronizer {
        DirectorySynchronizer::new(self.store(), Arc::clone(&self.network))
            .excluding_store(&self.store_path)
    }

    fn registry(&self) -> NodeRegistry {
        NodeRegistry::new(self.store(), Arc::clone(&self.network))
    }

    fn records(&self) -> Result<Vec<RecordEntry>, CabinetError> {
        let mut records = Vec::new();
        self.store.for_each(&self.handle, &mut |key, value| {
            records.push(RecordEntry {
                key: key.to_string(),
                value: value.to_string(),
            })
        })?;
        Ok(records)
    }
}
