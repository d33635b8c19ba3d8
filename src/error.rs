use std::path::PathBuf;
use thiserror::Error;

use crate::parser::IacFormat;

/// Infragraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HCL error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("No {format} resources parsed from the input files")]
    NoResources { format: IacFormat },

    #[error("No supported IaC format produced resources: {0}")]
    NoFormatMatched(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Infragraph operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a "format parsed but yielded nothing" error
    pub fn no_resources(format: IacFormat) -> Self {
        Error::NoResources { format }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error means "try the next format"
    pub fn is_fallthrough(&self) -> bool {
        matches!(self, Error::NoResources { .. })
    }
}
