//! Logging System
//!
//! Structured logging through `tracing`. Level, format, and destination come
//! from `LoggingConfig`, with `CABINET_LOG*` environment variables taking
//! precedence.

use crate::error::CabinetError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "CABINET_LOG";
const ENV_FORMAT: &str = "CABINET_LOG_FORMAT";
const ENV_OUTPUT: &str = "CABINET_LOG_OUTPUT";
const ENV_FILE: &str = "CABINET_LOG_FILE";
const ENV_MODULES: &str = "CABINET_LOG_MODULES";

/// Line format of emitted events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(CabinetError::Config(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                other
            ))),
        }
    }
}

/// Where events are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    #[value(name = "stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr")]
    #[value(name = "stderr")]
    Stderr,
    #[serde(rename = "file")]
    #[value(name = "file")]
    File,
    #[serde(rename = "file+stderr")]
    #[value(name = "file+stderr")]
    FileAndStderr,
    /// stdout and stderr
    #[serde(rename = "both")]
    #[value(name = "both")]
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }
}

impl FromStr for LogOutput {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "file+stderr" => Ok(LogOutput::FileAndStderr),
            "both" => Ok(LogOutput::Both),
            other => Err(CabinetError::Config(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,

    /// trace, debug, info, warn, error, or off
    pub level: String,

    pub format: LogFormat,

    pub output: LogOutput,

    /// Log file when `output` includes a file; `None` uses the state directory
    pub file: Option<PathBuf>,

    /// ANSI colors for text written to a terminal stream
    pub color: bool,

    /// Per-module level overrides, e.g. `cabinet::watch = "debug"`
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

/// Log file location: `CABINET_LOG_FILE`, then `configured`, then
/// `<state dir>/cabinet.log`.
pub fn resolve_log_file_path(configured: Option<PathBuf>) -> Result<PathBuf, CabinetError> {
    let from_env = std::env::var(ENV_FILE).ok().filter(|p| !p.is_empty());
    if let Some(path) = from_env {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }

    let dirs = directories::ProjectDirs::from("", "cabinet", "cabinet").ok_or_else(|| {
        CabinetError::Config("Could not determine platform state directory for log file".to_string())
    })?;
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(base.join("cabinet.log"))
}

/// Install the global subscriber.
///
/// Environment variables win over `config`, which already carries any CLI
/// overrides.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), CabinetError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    if !config.enabled {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .init();
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let format = env_override(ENV_FORMAT)?.unwrap_or(config.format);
    let output = env_override(ENV_OUTPUT)?.unwrap_or(config.output);
    let ansi = config.color && !output.writes_file();

    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(make_writer(output, config.file.clone())?);

    let subscriber = Registry::default().with(filter);
    match format {
        LogFormat::Json => subscriber.with(layer.json()).init(),
        LogFormat::Text => subscriber.with(layer.with_ansi(ansi)).init(),
    }
    Ok(())
}

fn env_override<T: FromStr<Err = CabinetError>>(var: &str) -> Result<Option<T>, CabinetError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
        _ => Ok(None),
    }
}

fn make_writer(output: LogOutput, file: Option<PathBuf>) -> Result<BoxMakeWriter, CabinetError> {
    let writer = match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Both => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        LogOutput::File => BoxMakeWriter::new(open_log_file(resolve_log_file_path(file)?)?),
        LogOutput::FileAndStderr => BoxMakeWriter::new(
            open_log_file(resolve_log_file_path(file)?)?.and(std::io::stderr),
        ),
    };
    Ok(writer)
}

fn open_log_file(path: PathBuf) -> Result<Arc<File>, CabinetError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CabinetError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| CabinetError::io(&path, e))?;
    Ok(Arc::new(file))
}

/// `CABINET_LOG` replaces the whole filter; otherwise the configured level
/// plus module overrides from config and `CABINET_LOG_MODULES`.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, CabinetError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        filter = filter.add_directive(parse_directive(module, level)?);
    }
    if let Ok(raw) = std::env::var(ENV_MODULES) {
        for (module, level) in raw.split(',').filter_map(|spec| spec.split_once('=')) {
            filter = filter.add_directive(parse_directive(module, level)?);
        }
    }
    Ok(filter)
}

fn parse_directive(module: &str, level: &str) -> Result<Directive, CabinetError> {
    format!("{}={}", module.trim(), level.trim())
        .parse()
        .map_err(|e| CabinetError::Config(format!("Invalid log directive: {}", e)))
}
