//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::session::{HierarchicalSection, PriorSection, SamplerSection, SessionConfig};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a session configuration semantically.
pub fn validate_session(config: &SessionConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_prior(&config.prior)?;
    validate_sampler(&config.sampler)?;
    validate_hierarchical(&config.hierarchical)?;
    Ok(())
}

fn validate_prior(prior: &PriorSection) -> ValidationResult<()> {
    if let Some(k) = prior.k {
        positive("prior.k", k)?;
    }
    if let Some(df) = prior.df {
        if !df.is_finite() {
            return Err(invalid("prior.df", format!("Must be finite, got {}", df)));
        }
    }
    if let Some(mean) = &prior.mean {
        if mean.is_empty() || mean.iter().any(|m| !m.is_finite()) {
            return Err(invalid("prior.mean", "Must be a non-empty list of finite values"));
        }
    }
    if let Some(std) = &prior.std {
        let values = std.values();
        if values.is_empty() {
            return Err(invalid("prior.std", "Must not be empty"));
        }
        for (i, s) in values.iter().enumerate() {
            positive(&format!("prior.std[{}]", i), *s)?;
        }
    }
    if let Some(cov) = &prior.cov {
        let n = cov.len();
        if n == 0 || cov.iter().any(|row| row.len() != n) {
            return Err(invalid("prior.cov", "Must be a non-empty square matrix"));
        }
        for i in 0..n {
            if !(cov[i][i] > 0.0) {
                return Err(invalid(
                    "prior.cov",
                    format!("Diagonal entry {} must be positive, got {}", i, cov[i][i]),
                ));
            }
            for j in 0..i {
                if (cov[i][j] - cov[j][i]).abs() > 1e-9 * cov[i][j].abs().max(1.0) {
                    return Err(invalid("prior.cov", "Must be symmetric"));
                }
            }
        }
    }
    if prior.std.is_some() && prior.cov.is_some() {
        return Err(ValidationError::SemanticError(
            "prior.std and prior.cov are mutually exclusive".to_string(),
        ));
    }
    if let (Some(mean), Some(cov)) = (&prior.mean, &prior.cov) {
        if mean.len() != cov.len() {
            return Err(ValidationError::SemanticError(format!(
                "prior.mean has {} entries but prior.cov is {}x{}",
                mean.len(),
                cov.len(),
                cov.len()
            )));
        }
    }
    Ok(())
}

fn validate_sampler(sampler: &SamplerSection) -> ValidationResult<()> {
    positive("sampler.alpha0", sampler.alpha0)?;
    positive("sampler.mh_step_width", sampler.mh_step_width)?;
    if sampler.mh_steps == 0 {
        return Err(invalid("sampler.mh_steps", "Must be at least 1"));
    }
    Ok(())
}

fn validate_hierarchical(section: &HierarchicalSection) -> ValidationResult<()> {
    if section.mc_draws == 0 {
        return Err(invalid("hierarchical.mc_draws", "Must be at least 1"));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> ValidationResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("Must be positive, got {}", value)))
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}
