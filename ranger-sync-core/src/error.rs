//! Error types for ranger-sync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or saving the connection config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse connection config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No connection config has been written yet.
    #[error("connection config not found at {path}; run `ranger-sync init` first")]
    ConfigNotFound { path: PathBuf },

    /// The config parsed but a field is unusable.
    #[error("invalid connection config: {0}")]
    Invalid(String),
}

/// A resource kind string that is neither `hdfs` nor `hive`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource kind '{0}'; expected: hdfs, hive")]
pub struct ParseKindError(pub String);
