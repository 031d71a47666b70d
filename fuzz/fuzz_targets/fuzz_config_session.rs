//! Fuzz target for session file parsing and validation.
//!
//! Both the TOML and JSON readers must return an error, never panic.

#![no_main]

use dpgmm_config::{validate_session, SessionConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(cfg) = SessionConfig::from_toml_str(data) {
        let _ = validate_session(&cfg);
    }
    if let Ok(cfg) = SessionConfig::from_json_str(data) {
        let _ = validate_session(&cfg);
    }
});
