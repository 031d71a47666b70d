//! Session configuration types.
//!
//! A session file carries the natural-space prior recipe, the concentration
//! sampler settings and the hierarchical Monte Carlo budget. Every section is
//! optional; missing sections take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::ValidationError;

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub prior: PriorSection,

    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub hierarchical: HierarchicalSection,
}

/// Natural-space prior recipe.
///
/// Values left unset are derived at fit time: `df` becomes `D + 2`, the mean
/// and expected covariance come from the samples when `from_samples` is set,
/// and otherwise from the built-in default prior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorSection {
    /// Mean-precision scaling `k0`.
    pub k: Option<f64>,
    /// Degrees of freedom `ν0`.
    pub df: Option<f64>,
    /// Prior mean in natural coordinates.
    pub mean: Option<Vec<f64>>,
    /// Expected spread in natural coordinates.
    pub std: Option<StdSpec>,
    /// Expected covariance in natural coordinates.
    pub cov: Option<Vec<Vec<f64>>>,
    /// Derive mean and spread from the samples when nothing explicit is given.
    pub from_samples: bool,
}

impl Default for PriorSection {
    fn default() -> Self {
        Self {
            k: None,
            df: None,
            mean: None,
            std: None,
            cov: None,
            from_samples: true,
        }
    }
}

/// Standard deviation given either once for all dimensions or per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StdSpec {
    Scalar(f64),
    PerDim(Vec<f64>),
}

impl StdSpec {
    /// Expand to one value per dimension.
    pub fn expand(&self, dim: usize) -> Vec<f64> {
        match self {
            StdSpec::Scalar(s) => vec![*s; dim],
            StdSpec::PerDim(v) => v.clone(),
        }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            StdSpec::Scalar(s) => std::slice::from_ref(s),
            StdSpec::PerDim(v) => v,
        }
    }
}

/// Concentration parameter sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSection {
    /// Initial concentration `α`.
    pub alpha0: f64,
    /// Metropolis-Hastings proposals per α update.
    pub mh_steps: usize,
    /// Width of the uniform random-walk proposal.
    pub mh_step_width: f64,
    /// Seed for the session generator; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            alpha0: 1.0,
            mh_steps: 1000,
            mh_step_width: 1.0,
            seed: None,
        }
    }
}

/// Hierarchical aggregator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalSection {
    /// Monte Carlo draws from the NIW prior used to integrate each
    /// cluster's population-level parameters.
    pub mc_draws: usize,
}

impl Default for HierarchicalSection {
    fn default() -> Self {
        Self { mc_draws: 2000 }
    }
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            description: None,
            prior: PriorSection::default(),
            sampler: SamplerSection::default(),
            hierarchical: HierarchicalSection::default(),
        }
    }
}

impl SessionConfig {
    /// Load a session file. `.json` files are parsed as JSON, everything
    /// else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str_for_path(&content, path)
    }

    /// Parse already-read content, choosing the format from `path`'s extension.
    pub fn from_str_for_path(content: &str, path: &Path) -> Result<Self, ValidationError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(content),
            _ => Self::from_toml_str(content),
        }
    }

    /// Parse a TOML session.
    pub fn from_toml_str(toml_src: &str) -> Result<Self, ValidationError> {
        toml::from_str(toml_src)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Parse a JSON session.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ValidationError> {
        toml::to_string_pretty(self)
            .map_err(|e| ValidationError::ParseError(format!("Cannot render TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let cfg = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.sampler.mh_steps, 1000);
        assert_eq!(cfg.hierarchical.mc_draws, 2000);
        assert!(cfg.prior.from_samples);
    }

    #[test]
    fn test_parse_full_toml() {
        let src = r#"
schema_version = "1.0.0"
description = "two-dimensional run"

[prior]
k = 0.05
df = 6.0
mean = [1.0, 2.0]
std = [0.5, 0.7]

[sampler]
alpha0 = 2.5
mh_steps = 200
seed = 42

[hierarchical]
mc_draws = 500
"#;
        let cfg = SessionConfig::from_toml_str(src).unwrap();
        assert_eq!(cfg.prior.k, Some(0.05));
        assert_eq!(cfg.prior.std, Some(StdSpec::PerDim(vec![0.5, 0.7])));
        assert_eq!(cfg.sampler.seed, Some(42));
        assert_eq!(cfg.sampler.mh_step_width, 1.0);
        assert_eq!(cfg.hierarchical.mc_draws, 500);
    }

    #[test]
    fn test_scalar_std_in_json() {
        let cfg = SessionConfig::from_json_str(r#"{"prior": {"std": 3.0}}"#).unwrap();
        assert_eq!(cfg.prior.std, Some(StdSpec::Scalar(3.0)));
        assert_eq!(cfg.prior.std.unwrap().expand(3), vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = SessionConfig::from_toml_str("[sampler\nalpha0 = ").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn test_toml_render_parses_back() {
        let mut cfg = SessionConfig::default();
        cfg.sampler.seed = Some(7);
        cfg.prior.cov = Some(vec![vec![1.0, 0.1], vec![0.1, 2.0]]);
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(SessionConfig::from_toml_str(&text).unwrap(), cfg);
    }
}
