//! Configuration management for mftf
//!
//! Suite-level settings: where the application lives, how long page waits
//! may take, how to reach the backend CLI bridge, and the admin account.
//! Values come from `.mftf/config.toml` (all fields optional) and are then
//! overridden by the environment variables a suite `.env` usually exports.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{MftfError, Result};

/// Suite configuration
///
/// Loaded from `.mftf/config.toml` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MftfConfig {
    /// Base URL of the storefront, e.g. `http://magento.local/`
    #[serde(default)]
    pub url: String,

    /// Admin area path segment
    #[serde(default = "default_backend_name")]
    pub backend_name: String,

    /// Upper bound for each page-load wait phase, in seconds
    #[serde(default = "default_pageload_timeout")]
    pub pageload_timeout_secs: f64,

    /// Minimum seconds between two cron runs touching the same group
    #[serde(default = "default_cron_interval")]
    pub cron_interval_secs: u64,

    /// Backend CLI bridge
    #[serde(default)]
    pub cli: CliBridgeConfig,

    /// Admin account used to obtain API tokens
    #[serde(default)]
    pub admin: AdminCredentials,
}

/// Location of the backend CLI bridge script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliBridgeConfig {
    /// Path of the bridge script relative to the base URL
    #[serde(default = "default_command_path")]
    pub command_path: String,

    /// Name of the form field carrying the command
    #[serde(default = "default_command_parameter")]
    pub command_parameter: String,
}

/// Admin credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminCredentials {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

// Default value providers
fn default_backend_name() -> String {
    "admin".to_string()
}

fn default_pageload_timeout() -> f64 {
    30.0
}

fn default_cron_interval() -> u64 {
    60
}

fn default_command_path() -> String {
    "dev/tests/acceptance/utils/command.php".to_string()
}

fn default_command_parameter() -> String {
    "command".to_string()
}

const CONFIG_FILE: &str = ".mftf/config.toml";

impl MftfConfig {
    /// Load configuration from `.mftf/config.toml` or use defaults, then apply env overrides
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse a config file without applying env overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            MftfError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Write default configuration to `.mftf/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".mftf");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| MftfError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Override fields from the environment
    ///
    /// Recognised: `MAGENTO_BASE_URL`, `MAGENTO_BACKEND_NAME`, `WAIT_TIMEOUT`,
    /// `MAGENTO_CLI_COMMAND_PATH`, `MAGENTO_CLI_COMMAND_PARAMETER`,
    /// `MAGENTO_ADMIN_USERNAME`, `MAGENTO_ADMIN_PASSWORD`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(url) = env_value("MAGENTO_BASE_URL") {
            self.url = url;
        }
        if let Some(backend) = env_value("MAGENTO_BACKEND_NAME") {
            self.backend_name = backend;
        }
        if let Some(timeout) = env_value("WAIT_TIMEOUT") {
            self.pageload_timeout_secs = timeout.parse().map_err(|_| {
                MftfError::Config(format!("WAIT_TIMEOUT is not a number: {}", timeout))
            })?;
        }
        if let Some(path) = env_value("MAGENTO_CLI_COMMAND_PATH") {
            self.cli.command_path = path;
        }
        if let Some(param) = env_value("MAGENTO_CLI_COMMAND_PARAMETER") {
            self.cli.command_parameter = param;
        }
        if let Some(username) = env_value("MAGENTO_ADMIN_USERNAME") {
            self.admin.username = Some(username);
        }
        if let Some(password) = env_value("MAGENTO_ADMIN_PASSWORD") {
            self.admin.password = Some(password);
        }
        Ok(())
    }

    /// Reject settings nothing downstream can work with
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(MftfError::Config(
                "No base url configured. Set `url` in .mftf/config.toml or MAGENTO_BASE_URL"
                    .to_string(),
            ));
        }
        timeout_from_secs(self.pageload_timeout_secs)?;
        if self.backend_name.trim().trim_matches('/').is_empty() {
            return Err(MftfError::Config("backend_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Default timeout for page-load waits
    ///
    /// Out-of-range values (rejected by [`MftfConfig::validate`]) saturate
    /// instead of panicking.
    pub fn pageload_timeout(&self) -> Duration {
        match timeout_from_secs(self.pageload_timeout_secs) {
            Ok(timeout) => timeout,
            Err(_) if self.pageload_timeout_secs > 0.0 => Duration::MAX,
            Err(_) => Duration::ZERO,
        }
    }

    /// Admin area root, `<url>/<backend_name>/`
    pub fn backend_url(&self) -> String {
        format!(
            "{}/{}/",
            self.url.trim().trim_end_matches('/'),
            self.backend_name.trim().trim_matches('/')
        )
    }

    /// Minimum interval between cron runs
    pub fn cron_interval(&self) -> Duration {
        Duration::from_secs(self.cron_interval_secs)
    }
}

/// Convert a timeout in seconds, rejecting values that are not positive or
/// do not fit in a `Duration`
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(MftfError::Config(format!(
            "timeout must be a positive number of seconds, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| {
        MftfError::Config(format!("timeout of {} seconds is out of range: {}", secs, e))
    })
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for MftfConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            backend_name: default_backend_name(),
            pageload_timeout_secs: default_pageload_timeout(),
            cron_interval_secs: default_cron_interval(),
            cli: CliBridgeConfig::default(),
            admin: AdminCredentials::default(),
        }
    }
}

impl Default for CliBridgeConfig {
    fn default() -> Self {
        Self {
            command_path: default_command_path(),
            command_parameter: default_command_parameter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to prevent concurrent env var modifications
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const KEYS: &[&str] = &[
        "MAGENTO_BASE_URL",
        "MAGENTO_BACKEND_NAME",
        "WAIT_TIMEOUT",
        "MAGENTO_CLI_COMMAND_PATH",
        "MAGENTO_CLI_COMMAND_PARAMETER",
        "MAGENTO_ADMIN_USERNAME",
        "MAGENTO_ADMIN_PASSWORD",
    ];

    fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let originals: Vec<_> = KEYS.iter().map(|k| (*k, std::env::var(k).ok())).collect();
        for key in KEYS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let result = f();

        for (key, original) in originals {
            match original {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }

        result
    }

    #[test]
    fn test_defaults() {
        let config = MftfConfig::default();
        assert_eq!(config.backend_name, "admin");
        assert_eq!(config.pageload_timeout(), Duration::from_secs(30));
        assert_eq!(config.cron_interval(), Duration::from_secs(60));
        assert_eq!(config.cli.command_parameter, "command");
        assert!(config.validate().is_err(), "empty url must not validate");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        with_env_vars(&[], || {
            let dir = TempDir::new().unwrap();
            let config = MftfConfig::load_or_default(dir.path()).unwrap();
            assert!(config.url.is_empty());
            assert_eq!(config.cron_interval_secs, 60);
        });
    }

    #[test]
    fn test_partial_file_and_env_override() {
        with_env_vars(
            &[("MAGENTO_BASE_URL", "http://shop.test/"), ("WAIT_TIMEOUT", "45")],
            || {
                let dir = TempDir::new().unwrap();
                std::fs::create_dir_all(dir.path().join(".mftf")).unwrap();
                std::fs::write(
                    dir.path().join(CONFIG_FILE),
                    "url = \"http://from-file/\"\ncron_interval_secs = 90\n\n[cli]\ncommand_parameter = \"cmd\"\n",
                )
                .unwrap();

                let config = MftfConfig::load_or_default(dir.path()).unwrap();
                assert_eq!(config.url, "http://shop.test/");
                assert_eq!(config.pageload_timeout_secs, 45.0);
                assert_eq!(config.cron_interval_secs, 90);
                assert_eq!(config.cli.command_parameter, "cmd");
                assert_eq!(
                    config.cli.command_path,
                    "dev/tests/acceptance/utils/command.php"
                );
                assert!(config.validate().is_ok());
            },
        );
    }

    #[test]
    fn test_bad_wait_timeout_is_config_error() {
        with_env_vars(&[("WAIT_TIMEOUT", "soon")], || {
            let mut config = MftfConfig::default();
            let err = config.apply_env_overrides().unwrap_err();
            assert!(matches!(err, MftfError::Config(_)));
        });
    }

    #[test]
    fn test_write_default_round_trips() {
        with_env_vars(&[], || {
            let dir = TempDir::new().unwrap();
            MftfConfig::write_default(dir.path()).unwrap();
            assert!(dir.path().join(CONFIG_FILE).exists());

            let config = MftfConfig::load_or_default(dir.path()).unwrap();
            assert_eq!(config.backend_name, "admin");
        });
    }

    #[test]
    fn test_validate_rejects_non_positive_timeout() {
        let config = MftfConfig {
            url: "http://shop.test/".to_string(),
            pageload_timeout_secs: 0.0,
            ..MftfConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_timeout_is_rejected_without_panicking() {
        let config = MftfConfig {
            url: "http://shop.test/".to_string(),
            pageload_timeout_secs: 1e20,
            ..MftfConfig::default()
        };
        assert!(matches!(config.validate(), Err(MftfError::Config(_))));
        assert_eq!(config.pageload_timeout(), Duration::MAX);

        assert!(timeout_from_secs(f64::NAN).is_err());
        assert!(timeout_from_secs(-1.0).is_err());
        assert_eq!(timeout_from_secs(2.5).unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_oversized_wait_timeout_from_env_fails_validation() {
        with_env_vars(
            &[("MAGENTO_BASE_URL", "http://shop.test/"), ("WAIT_TIMEOUT", "1e20")],
            || {
                let mut config = MftfConfig::default();
                config.apply_env_overrides().unwrap();
                assert!(config.validate().is_err());
            },
        );
    }

    #[test]
    fn test_backend_url() {
        with_env_vars(&[("MAGENTO_BACKEND_NAME", "/backoffice/")], || {
            let mut config = MftfConfig {
                url: "http://shop.test/".to_string(),
                ..MftfConfig::default()
            };
            assert_eq!(config.backend_url(), "http://shop.test/admin/");

            config.apply_env_overrides().unwrap();
            assert_eq!(config.backend_url(), "http://shop.test/backoffice/");
        });
    }

    #[test]
    fn test_validate_rejects_blank_backend_name() {
        let config = MftfConfig {
            url: "http://shop.test/".to_string(),
            backend_name: " / ".to_string(),
            ..MftfConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
