//! Connection settings for the policy engine.
//!
//! # Storage layout
//!
//! ```text
//! ~/.ranger-sync/
//!   connection.yaml   (mode 0600; holds credentials)
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! The loaded [`RangerConnection`] is an immutable value handed to the REST
//! client and the synchronizer at construction time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prefix every generated policy name starts with.
pub const DEFAULT_POLICY_PREFIX: &str = "nifi_";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangerConnection {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Ranger repository (service) holding path policies.
    pub hdfs_repository_name: String,
    /// Ranger repository (service) holding table policies.
    pub hive_repository_name: String,
    #[serde(default = "default_policy_prefix")]
    pub policy_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_policy_prefix() -> String {
    DEFAULT_POLICY_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RangerConnection {
    /// Connection with default scheme, prefix, and timeout.
    pub fn new(
        hostname: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        hdfs_repository_name: impl Into<String>,
        hive_repository_name: impl Into<String>,
    ) -> Self {
        Self {
            scheme: default_scheme(),
            hostname: hostname.into(),
            port,
            username: username.into(),
            password: password.into(),
            hdfs_repository_name: hdfs_repository_name.into(),
            hive_repository_name: hive_repository_name.into(),
            policy_prefix: default_policy_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// `scheme://hostname:port`, no trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.hostname, self.port)
    }

    /// Reject configs that could never produce a working client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::Invalid("hostname is empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "unsupported scheme '{}'; expected http or https",
                self.scheme
            )));
        }
        if self.hdfs_repository_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "hdfs_repository_name is empty".to_string(),
            ));
        }
        if self.hive_repository_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "hive_repository_name is empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.ranger-sync/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".ranger-sync")
}

/// `<home>/.ranger-sync/connection.yaml`: pure, no I/O.
pub fn connection_path_at(home: &Path) -> PathBuf {
    root_at(home).join("connection.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load and validate the connection config.
///
/// Returns `ConfigError::ConfigNotFound` if absent and `ConfigError::Parse`
/// (with path + line context) if malformed.
pub fn load_at(home: &Path) -> Result<RangerConnection, ConfigError> {
    let path = connection_path_at(home);
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    let connection: RangerConnection =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    connection.validate()?;
    Ok(connection)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<RangerConnection, ConfigError> {
    load_at(&home()?)
}

/// Atomically save the connection config.
///
/// Write flow: validate → serialize → `.yaml.tmp` sibling → `chmod 0600` →
/// `rename`.
pub fn save_at(home: &Path, connection: &RangerConnection) -> Result<PathBuf, ConfigError> {
    connection.validate()?;
    let dir = root_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = connection_path_at(home);
    let tmp_path = path.with_file_name("connection.yaml.tmp");

    let yaml = serde_yaml::to_string(connection)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(connection: &RangerConnection) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, connection)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
