//! Core error types for AutoBug.
//!
//! This module defines the central error type shared by the scope and diff
//! crates. Each subsystem error is represented as a variant for clear error
//! propagation.

use thiserror::Error;

/// Central error type for all AutoBug operations.
#[derive(Error, Debug)]
pub enum AutobugError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// Scope errors (rule compilation, platform lookup)
    #[error("scope error: {0}")]
    Scope(String),

    /// Asset diff errors (snapshot normalization)
    #[error("diff error: {0}")]
    Diff(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `AutobugError`.
pub type Result<T> = std::result::Result<T, AutobugError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutobugError::Validation("empty program handle".to_string());
        assert_eq!(err.to_string(), "validation error: empty program handle");

        let err = ConfigError::InvalidValue {
            field: "general.log_level".to_string(),
            reason: "unknown level".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for general.log_level: unknown level"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: AutobugError = config_err.into();
        assert!(matches!(err, AutobugError::Config(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: AutobugError = io_err.into();
        assert!(matches!(err, AutobugError::Io(_)));
    }
}
