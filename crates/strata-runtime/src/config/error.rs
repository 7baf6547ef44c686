//! Configuration errors.

use std::path::PathBuf;
use strata_types::ErrorCode;
use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid environment variable value.
    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },
}

impl ConfigError {
    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse TOML error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid env var error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ_FILE",
            Self::ParseToml { .. } => "CONFIG_PARSE_TOML",
            Self::Serialize(_) => "CONFIG_SERIALIZE",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV_VAR",
        }
    }

    fn is_recoverable(&self) -> bool {
        // A file may be readable on the next attempt; bad content is not.
        matches!(self, Self::ReadFile { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::assert_error_codes;

    fn all_variants() -> Vec<ConfigError> {
        let parse = toml::from_str::<toml::Table>("= broken").unwrap_err();
        vec![
            ConfigError::read_file(
                "/x",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ),
            ConfigError::parse_toml("/x", parse),
            ConfigError::from(<toml::ser::Error as serde::ser::Error>::custom("unsupported")),
            ConfigError::invalid_env_var("STRATA_MIN_ACTIVE", "expected unsigned integer"),
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "CONFIG_");
    }

    #[test]
    fn error_display() {
        let err = ConfigError::invalid_env_var("STRATA_MIN_ACTIVE", "expected unsigned integer");
        assert!(err.to_string().contains("STRATA_MIN_ACTIVE"));
        assert!(err.to_string().contains("expected unsigned integer"));
        assert!(!err.is_recoverable());
    }
}
