//! Session configuration loading with provenance.
//!
//! Wraps `dpgmm-config`: resolves the file location, parses it, validates it
//! and records a [`ConfigSnapshot`] (path, source, SHA-256) so persisted
//! draws can be traced back to the exact configuration.

pub use dpgmm_config::{
    resolve_config, validate_session, ConfigPath, ConfigSnapshot, ConfigSource, SessionConfig,
    ValidationError, CONFIG_SCHEMA_VERSION,
};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::logging::event_names;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::NotFound { .. } => 60,
            ConfigError::IoError { .. } => 60,
            ConfigError::ParseError { source, .. } => source.code(),
            ConfigError::ValidationError(e) => e.code(),
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default, Clone)]
pub struct ConfigOptions {
    /// Explicit session file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// A validated session with its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub session: SessionConfig,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, read, parse and validate the session configuration.
///
/// An explicit path that does not exist is an error; a missing file at any
/// implicit location falls back to built-in defaults.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let location = resolve_config(options.config_path.as_deref());
    let path = match &location.path {
        Some(path) => path.clone(),
        None => {
            debug!(event = event_names::CONFIG_DEFAULT_USED, "no session file found; using defaults");
            return Ok(ResolvedConfig {
                session: SessionConfig::default(),
                snapshot: ConfigSnapshot::defaults_only(),
            });
        }
    };
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::IoError {
        path: path.clone(),
        source,
    })?;
    let session = parse_session(&content, &path)?;
    validate_session(&session)?;
    let snapshot = ConfigSnapshot::new(&session, &location, Some(&content));
    info!(
        event = event_names::CONFIG_LOADED,
        path = %path.display(),
        source = %location.source,
        hash = snapshot.short_id(),
        "session config loaded"
    );
    Ok(ResolvedConfig { session, snapshot })
}

fn parse_session(content: &str, path: &Path) -> Result<SessionConfig, ConfigError> {
    SessionConfig::from_str_for_path(content, path).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}
