//! Error types for xlog
//!
//! Configuration errors surface to the caller of `new`/`init`; render errors
//! never leave a sink worker (they travel over the shared error channel, see
//! [`crate::sinks::SinkError`]).

use crate::sinks::traits::SinkError;
use thiserror::Error;

/// Main error type for xlog operations
#[derive(Error, Debug)]
pub enum XlogError {
    /// No factory registered under the requested sink type
    #[error("unknown mode '{0}'")]
    UnknownMode(String),

    /// Level outside TRACE..=FATAL
    #[error("input level is not one of: TRACE, INFO, WARN, ERROR or FATAL")]
    InvalidLevel,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigFileMissing(String),

    /// I/O errors
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    /// TOML parsing errors
    #[error("TOML parsing error: {source}")]
    TomlError {
        #[from]
        source: toml::de::Error,
    },

    /// Errors reported by a sink while it is being initialized or torn down
    #[error("Sink error: {source}")]
    SinkError {
        #[from]
        source: SinkError,
    },
}

/// Result type alias for xlog operations
pub type Result<T> = std::result::Result<T, XlogError>;

impl XlogError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new unknown mode error
    pub fn unknown_mode<S: Into<String>>(mode: S) -> Self {
        Self::UnknownMode(mode.into())
    }

    /// Get the error category for logging purposes
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownMode(_)
            | Self::InvalidLevel
            | Self::ConfigError(_)
            | Self::ConfigFileMissing(_) => "config",
            Self::IoError { .. } => "io",
            Self::TomlError { .. } => "toml",
            Self::SinkError { .. } => "sink",
        }
    }
}
