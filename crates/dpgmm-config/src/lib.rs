//! DPGMM session configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the session file (`dpgmm.toml` or JSON)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation with coded errors
//! - Config snapshots recording where a configuration came from

pub mod resolve;
pub mod session;
pub mod snapshot;
pub mod validate;

pub use resolve::{resolve_config, ConfigPath, ConfigSource};
pub use session::{HierarchicalSection, PriorSection, SamplerSection, SessionConfig, StdSpec};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_session, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
