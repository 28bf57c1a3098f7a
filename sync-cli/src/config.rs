//! Configuration loading for spendsync.
//!
//! Configuration is loaded from a TOML file (default: `spendsync.toml` in
//! the data directory). Every section and field is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use spendsync_types::AccountId;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `[account] token`.
pub const TOKEN_ENV: &str = "SPENDSYNC_TOKEN";

/// Default config file name inside the data directory.
pub const CONFIG_FILE: &str = "spendsync.toml";

/// Root configuration for spendsync.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Signed-in account.
    #[serde(default)]
    pub account: AccountConfig,
    /// Remote store location.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Connectivity overrides.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Account configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConfig {
    /// Account id. Absent means signed out.
    pub id: Option<String>,
    /// Bearer token for the remote store.
    pub token: Option<String>,
}

/// Remote store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Directory acting as the remote store (default: `<data-dir>/remote`).
    pub dir: Option<PathBuf>,
    /// Deadline for each remote call in seconds (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Connectivity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    /// Report the network as disconnected (default: false).
    #[serde(default)]
    pub offline: bool,
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            dir: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Signed-in account, if configured.
    pub fn account_id(&self) -> Option<AccountId> {
        self.account
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(AccountId::new)
    }

    /// Bearer token, preferring the environment over the file.
    pub fn token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .or_else(|| self.account.token.clone())
            .filter(|token| !token.is_empty())
    }

    /// Remote store directory.
    pub fn remote_dir(&self, data_dir: &Path) -> PathBuf {
        self.remote
            .dir
            .clone()
            .unwrap_or_else(|| data_dir.join("remote"))
    }

    /// Per-call deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_signed_out() {
        let config = Config::default();
        assert!(config.account_id().is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert!(!config.network.offline);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[account]
id = "acct-42"
token = "secret"

[remote]
dir = "/srv/spendsync"
request_timeout_secs = 3

[network]
offline = true
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.account_id(), Some(AccountId::new("acct-42")));
        assert_eq!(config.account.token.as_deref(), Some("secret"));
        assert_eq!(
            config.remote_dir(Path::new("/ignored")),
            PathBuf::from("/srv/spendsync")
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert!(config.network.offline);
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let config: Config = toml::from_str("[remote]\n").unwrap();
        assert_eq!(config.remote.request_timeout_secs, 15);
        assert_eq!(
            config.remote_dir(Path::new("/data")),
            PathBuf::from("/data/remote")
        );
    }

    #[test]
    fn empty_account_id_is_signed_out() {
        let config: Config = toml::from_str("[account]\nid = \"\"\n").unwrap();
        assert!(config.account_id().is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(config.account_id().is_none());
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[account\nid = 1").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn data_dir_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("test-data");
        tokio::fs::create_dir_all(&data_dir).await.unwrap();
        set_dir_permissions_0700(&data_dir).await.unwrap();

        let perms = tokio::fs::metadata(&data_dir).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o700, "dir should be 0700");
    }
}
