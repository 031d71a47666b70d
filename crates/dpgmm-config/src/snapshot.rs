//! Configuration snapshots for reproducibility.
//!
//! A snapshot captures the exact configuration a fit ran with, so persisted
//! draws can be tied back to the file (and seed) that produced them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::{ConfigPath, ConfigSource};
use crate::SessionConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the session file was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the session configuration.
    pub source: String,

    /// SHA-256 of the file content, or of `"none"` for built-in defaults.
    pub hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub alpha0: f64,
    pub mh_steps: usize,
    pub mc_draws: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub prior_k: Option<f64>,
    #[serde(default)]
    pub prior_df: Option<f64>,
}

impl ConfigSnapshot {
    /// Create a snapshot from a loaded configuration and its raw content.
    pub fn new(config: &SessionConfig, location: &ConfigPath, content: Option<&str>) -> Self {
        ConfigSnapshot {
            schema_version: config.schema_version.clone(),
            path: location.path.as_ref().map(|p| p.display().to_string()),
            source: location.source.to_string(),
            hash: hash_content(content.unwrap_or("none")),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Create a snapshot with only defaults (no config file loaded).
    pub fn defaults_only() -> Self {
        let config = SessionConfig::default();
        ConfigSnapshot {
            schema_version: config.schema_version.clone(),
            path: None,
            source: ConfigSource::BuiltinDefault.to_string(),
            hash: hash_content("none"),
            summary: ConfigSummary::from_config(&config),
        }
    }

    /// Check if this snapshot matches another (same config content).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.hash == other.hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.hash[..12.min(self.hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(config: &SessionConfig) -> Self {
        ConfigSummary {
            alpha0: config.sampler.alpha0,
            mh_steps: config.sampler.mh_steps,
            mc_draws: config.hierarchical.mc_draws,
            seed: config.sampler.seed,
            prior_k: config.prior.k,
            prior_df: config.prior.df,
        }
    }
}

/// Hash content with SHA-256 and return hex string.
pub fn hash_content(content: &str) -> String {
    hash_bytes(content.as_bytes())
}

/// Hash raw bytes with SHA-256 and return hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
