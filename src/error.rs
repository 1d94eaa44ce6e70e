//! Unified error types for chipseq-installer.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failed} of {total} recipes failed")]
    RunFailed { failed: usize, total: usize },
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while running an external process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one artifact's fetch, unpack or build cycle
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Download of {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Failed to unpack {archive}: {reason}")]
    Unpack { archive: String, reason: String },

    #[error("Could not resolve extraction directory for {name} ({} candidates)", .candidates.len())]
    AmbiguousDirectory {
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("Build step `{step}` failed in {}: {reason}", .dir.display())]
    Build {
        step: String,
        dir: PathBuf,
        reason: String,
    },

    #[error("Checkout of {url} failed: {reason}")]
    Checkout { url: String, reason: String },

    #[error("Unknown placeholder {{{0}}}")]
    Template(String),

    #[error("Invalid Python module name: {0:?}")]
    InvalidModule(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Stable name of the error kind, used in install reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Network { .. } => "network",
            Self::Unpack { .. } => "unpack",
            Self::AmbiguousDirectory { .. } => "ambiguous_directory",
            Self::Build { .. } => "build",
            Self::Checkout { .. } => "checkout",
            Self::Template(_) => "template",
            Self::InvalidModule(_) => "invalid_module",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for install operations
pub type InstallResult<T> = std::result::Result<T, InstallError>;

/// Result type alias for process execution
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
