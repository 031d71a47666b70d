//! No-mock configuration validation + resolution tests.
//!
//! Covers:
//! - Session validation against real TOML/JSON fixtures
//! - Resolution order (CLI > env > config dir > XDG)
//! - Snapshot hashing of loaded content

use dpgmm_config::resolve::{resolve_config, ConfigSource, CONFIG_FILENAME};
use dpgmm_config::snapshot::ConfigSnapshot;
use dpgmm_config::validate::{validate_session, ValidationError};
use dpgmm_config::{SessionConfig, StdSpec};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const ENV_KEYS: &[&str] = &["DPGMM_CONFIG", "DPGMM_CONFIG_DIR", "XDG_CONFIG_HOME"];

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("test")
        .join("fixtures")
        .join("config")
}

fn load_fixture(name: &str) -> SessionConfig {
    let path = fixtures_dir().join(name);
    SessionConfig::from_file(&path).expect("read session fixture")
}

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
            env::remove_var(key);
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_fixture(src_name: &str, dest: &Path) {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).expect("create fixture parent");
    }
    fs::copy(fixtures_dir().join(src_name), dest).expect("copy fixture");
}

#[test]
fn test_validate_toml_fixture_ok() {
    let cfg = load_fixture("valid_session.toml");
    validate_session(&cfg).expect("valid session should pass validation");
    assert_eq!(cfg.prior.std, Some(StdSpec::Scalar(3.0)));
    assert_eq!(cfg.sampler.seed, Some(1234));
    assert_eq!(cfg.hierarchical.mc_draws, 1000);
}

#[test]
fn test_validate_json_fixture_ok() {
    let cfg = load_fixture("valid_session.json");
    validate_session(&cfg).expect("valid session should pass validation");
    assert_eq!(cfg.prior.cov.as_ref().map(|c| c.len()), Some(2));
    // unspecified sampler fields keep their defaults
    assert_eq!(cfg.sampler.mh_steps, 1000);
}

#[test]
fn test_validate_rejects_bad_alpha() {
    let cfg = load_fixture("invalid_session_bad_alpha.toml");
    let err = validate_session(&cfg).expect_err("negative alpha0 should fail validation");
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "sampler.alpha0"));
}

#[test]
fn test_validate_rejects_std_with_cov() {
    let cfg = load_fixture("invalid_session_std_and_cov.toml");
    let err = validate_session(&cfg).expect_err("std + cov should fail validation");
    assert!(matches!(err, ValidationError::SemanticError(_)));
}

#[test]
fn test_validate_rejects_version() {
    let cfg = load_fixture("invalid_session_version.toml");
    let err = validate_session(&cfg).expect_err("future schema should fail validation");
    assert_eq!(err.code(), 66);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = SessionConfig::from_file(Path::new("/nonexistent/dpgmm.toml")).unwrap_err();
    assert_eq!(err.code(), 60);
}

#[test]
fn test_resolve_config_cli_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);

        let temp = TempDir::new().expect("temp dir");
        let cli_path = temp.path().join("cli").join(CONFIG_FILENAME);
        let env_path = temp.path().join("env").join(CONFIG_FILENAME);
        write_fixture("valid_session.toml", &cli_path);
        write_fixture("valid_session.toml", &env_path);

        env::set_var("DPGMM_CONFIG", env_path.display().to_string());

        let resolved = resolve_config(Some(&cli_path));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path.unwrap(), cli_path);
    });
}

#[test]
fn test_resolve_config_env_over_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);

        let temp = TempDir::new().expect("temp dir");
        let env_path = temp.path().join("env").join("session.json");
        let config_dir = temp.path().join("config_dir");
        write_fixture("valid_session.json", &env_path);
        write_fixture("valid_session.toml", &config_dir.join(CONFIG_FILENAME));

        env::set_var("DPGMM_CONFIG", env_path.display().to_string());
        env::set_var("DPGMM_CONFIG_DIR", config_dir.display().to_string());

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path.unwrap(), env_path);
    });
}

#[test]
fn test_resolve_config_dir_when_env_path_missing() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);

        let temp = TempDir::new().expect("temp dir");
        let config_dir = temp.path().join("config_dir");
        write_fixture("valid_session.toml", &config_dir.join(CONFIG_FILENAME));

        env::set_var("DPGMM_CONFIG", temp.path().join("absent.toml").display().to_string());
        env::set_var("DPGMM_CONFIG_DIR", config_dir.display().to_string());

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path.unwrap(), config_dir.join(CONFIG_FILENAME));
    });
}

#[test]
fn test_resolve_config_xdg_fallback() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);

        let temp = TempDir::new().expect("temp dir");
        let xdg_dir = temp.path().join("xdg");
        let app_file = xdg_dir.join("dpgmm").join(CONFIG_FILENAME);
        write_fixture("valid_session.toml", &app_file);

        env::set_var("XDG_CONFIG_HOME", xdg_dir.display().to_string());

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::XdgConfig);
        assert_eq!(resolved.path.unwrap(), app_file);
    });
}

#[test]
fn test_snapshot_tracks_content() {
    let path = fixtures_dir().join("valid_session.toml");
    let content = fs::read_to_string(&path).expect("read fixture");
    let cfg = SessionConfig::from_str_for_path(&content, &path).expect("parse fixture");
    let location = resolve_config(Some(&path));

    let first = ConfigSnapshot::new(&cfg, &location, Some(&content));
    let second = ConfigSnapshot::new(&cfg, &location, Some(&content));
    assert!(first.matches(&second));
    assert_eq!(first.summary.seed, Some(1234));
    assert!(!first.matches(&ConfigSnapshot::defaults_only()));
}
