//! Structured logging for the engine and the `dpgmm` binary.
//!
//! - stdout is reserved for command payloads (JSON)
//! - stderr receives all log output, human-readable or JSONL
//!
//! ```ignore
//! use dpgmm_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter from the resolved configuration. `RUST_LOG` only reaches here
/// through [`LogConfig::directives`], after the CLI and `DPGMM_LOG`.
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_new(config.directives())
        .unwrap_or_else(|_| EnvFilter::new(config::default_directive(config.level)))
}

/// Install the global subscriber.
///
/// Call once at startup; later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = build_filter(config);

    let result = match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                tracing_subscriber::registry().with(filter).with(layer).try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => {
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).try_init()
        }
    };
    // A subscriber installed earlier (tests, embedding applications) wins.
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_names_both_targets() {
        let d = config::default_directive(LogLevel::Debug);
        assert_eq!(d, "dpgmm_core=debug,dpgmm=debug");
    }

    #[test]
    fn filter_follows_dpgmm_log_over_rust_log() {
        let cfg = LogConfig::from_lookup(
            |k| match k {
                "DPGMM_LOG" => Some("error".to_string()),
                "RUST_LOG" => Some("debug".to_string()),
                _ => None,
            },
            None,
            None,
        );
        let filter = build_filter(&cfg);
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::ERROR)
        );
    }

    #[test]
    fn filter_is_off_when_cli_says_off() {
        let cfg = LogConfig::from_lookup(
            |k| (k == "RUST_LOG").then(|| "debug".to_string()),
            Some(LogLevel::Off),
            None,
        );
        assert_eq!(
            build_filter(&cfg).max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::OFF)
        );
    }

    #[test]
    fn init_twice_is_harmless() {
        let cfg = LogConfig::default().with_level(LogLevel::Off);
        init_logging(&cfg);
        init_logging(&cfg.with_format(LogFormat::Jsonl));
    }
}
