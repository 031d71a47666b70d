//! Logging configuration.
//!
//! Sources, lowest to highest precedence:
//! - `RUST_LOG` (only the coarsest level is read)
//! - `DPGMM_LOG` (level) and `DPGMM_LOG_FORMAT` (`human` / `jsonl`)
//! - CLI flags (`--log-level`, `--log-format`)

use serde::{Deserialize, Serialize};

pub const ENV_LOG_LEVEL: &str = "DPGMM_LOG";
pub const ENV_LOG_FORMAT: &str = "DPGMM_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines on stderr.
    #[default]
    Human,
    /// One JSON object per line on stderr.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Human => write!(f, "human"),
            LogFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Minimum level emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every cluster assignment.
    Trace,
    /// One line per completed draw.
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "quiet" => Ok(LogLevel::Off),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        };
        write!(f, "{}", s)
    }
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        use tracing_subscriber::filter::LevelFilter;
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Include timestamps in human output.
    pub timestamps: bool,
    /// Raw `RUST_LOG` directives, kept only when nothing more specific set
    /// the level.
    pub rust_log: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            timestamps: true,
            rust_log: None,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment, then CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Resolve from an arbitrary variable lookup, then CLI overrides.
    pub fn from_lookup<F>(lookup: F, cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LogConfig::default();

        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(|v| v.parse().ok()) {
            config.level = level;
        } else if let Some(directives) = lookup("RUST_LOG") {
            if let Some(level) = most_verbose_directive(&directives) {
                config.level = level;
                config.rust_log = Some(directives);
            }
        }

        if let Some(format) = lookup(ENV_LOG_FORMAT).and_then(|v| v.parse().ok()) {
            config.format = format;
        }

        if let Some(level) = cli_level {
            config.level = level;
            config.rust_log = None;
        }
        if let Some(format) = cli_format {
            config.format = format;
        }
        config
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self.rust_log = None;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Filter directives for the subscriber: `RUST_LOG` verbatim when it
    /// decided the level, otherwise `level` applied to both targets.
    pub fn directives(&self) -> String {
        match &self.rust_log {
            Some(directives) => directives.clone(),
            None => default_directive(self.level),
        }
    }
}

/// Directive applying `level` to the library and the binary.
pub(crate) fn default_directive(level: LogLevel) -> String {
    format!("dpgmm_core={level},dpgmm={level}", level = level)
}

/// Most verbose level named anywhere in a `RUST_LOG` directive list.
fn most_verbose_directive(directives: &str) -> Option<LogLevel> {
    directives.split(',')
        .filter_map(|d| d.rsplit('=').next())
        .filter_map(|l| l.trim().parse::<LogLevel>().ok())
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn parse_format_and_level() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert_eq!("HUMAN".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("quiet".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn dpgmm_log_beats_rust_log() {
        let cfg = LogConfig::from_lookup(
            env(&[("DPGMM_LOG", "warn"), ("RUST_LOG", "trace")]),
            None,
            None,
        );
        assert_eq!(cfg.level, LogLevel::Warn);
        assert_eq!(cfg.directives(), "dpgmm_core=warn,dpgmm=warn");
    }

    #[test]
    fn rust_log_is_used_verbatim_when_alone() {
        let cfg = LogConfig::from_lookup(env(&[("RUST_LOG", "info,dpgmm_core=debug")]), None, None);
        assert_eq!(cfg.directives(), "info,dpgmm_core=debug");
    }

    #[test]
    fn cli_level_discards_rust_log() {
        let cfg = LogConfig::from_lookup(env(&[("RUST_LOG", "debug")]), Some(LogLevel::Off), None);
        assert_eq!(cfg.level, LogLevel::Off);
        assert_eq!(cfg.rust_log, None);
        assert_eq!(cfg.directives(), "dpgmm_core=off,dpgmm=off");
    }

    #[test]
    fn rust_log_directives() {
        let cfg = LogConfig::from_lookup(env(&[("RUST_LOG", "info,dpgmm_core=debug")]), None, None);
        assert_eq!(cfg.level, LogLevel::Debug);
        let cfg = LogConfig::from_lookup(env(&[("RUST_LOG", "nonsense")]), None, None);
        assert_eq!(cfg.level, LogLevel::Info);
    }

    #[test]
    fn cli_overrides_env() {
        let cfg = LogConfig::from_lookup(
            env(&[("DPGMM_LOG", "trace"), ("DPGMM_LOG_FORMAT", "jsonl")]),
            Some(LogLevel::Error),
            Some(LogFormat::Human),
        );
        assert_eq!(cfg.level, LogLevel::Error);
        assert_eq!(cfg.format, LogFormat::Human);
    }

    #[test]
    fn builder() {
        let cfg = LogConfig::default()
            .with_format(LogFormat::Jsonl)
            .with_level(LogLevel::Trace)
            .with_timestamps(false);
        assert_eq!(cfg.format, LogFormat::Jsonl);
        assert_eq!(cfg.level, LogLevel::Trace);
        assert!(!cfg.timestamps);
    }
}
