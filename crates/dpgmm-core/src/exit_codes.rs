//! Exit codes for the `dpgmm` CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/input errors (fixable by changing arguments or files)
//! - 20-29: internal and environment errors

use crate::config::ConfigError;
use crate::error::MixtureError;

/// Exit codes for `dpgmm` commands.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Clean = 0,

    /// Invalid arguments.
    ArgsError = 10,

    /// Malformed samples, bounds, draws or events.
    InputError = 11,

    /// Session configuration missing or invalid.
    ConfigError = 12,

    /// Numerical failure while fitting (e.g. a covariance failed to factor).
    ModelError = 13,

    /// Internal error (bug - please report).
    InternalError = 20,

    /// I/O error.
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Codes 20 and above.
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Stable name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::ModelError => "ERR_MODEL",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

impl From<&MixtureError> for ExitCode {
    fn from(err: &MixtureError) -> Self {
        match err {
            MixtureError::Io { .. } => ExitCode::IoError,
            MixtureError::UseAfterBuild => ExitCode::InternalError,
            MixtureError::NotPositiveDefinite(_) => ExitCode::ModelError,
            MixtureError::UnsupportedOperation(_) => ExitCode::ArgsError,
            e if e.is_input_error() => ExitCode::InputError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::IoError { .. } => ExitCode::IoError,
            _ => ExitCode::ConfigError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::InputError.is_user_error());
        assert!(!ExitCode::IoError.is_user_error());
        assert!(ExitCode::IoError.is_internal_error());
        assert_eq!(i32::from(ExitCode::ConfigError), 12);
    }

    #[test]
    fn display() {
        assert_eq!(ExitCode::ArgsError.to_string(), "ERR_ARGS (10)");
    }

    #[test]
    fn mixture_errors_map() {
        let e = MixtureError::InvalidBounds("x".into());
        assert_eq!(ExitCode::from(&e), ExitCode::InputError);
        let e = MixtureError::NotPositiveDefinite("x".into());
        assert_eq!(ExitCode::from(&e), ExitCode::ModelError);
        let e = MixtureError::UnsupportedOperation("cdf".into());
        assert_eq!(ExitCode::from(&e), ExitCode::ArgsError);
        let e = MixtureError::io("/x", std::io::Error::other("boom"));
        assert_eq!(ExitCode::from(&e), ExitCode::IoError);
    }
}
