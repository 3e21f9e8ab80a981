//! Configuration Management
//!
//! Connection settings come from three layers, highest precedence first:
//! `ARTIFACTORY_*` environment variables, command-line flags, and the
//! persisted config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Context path used when none is configured
pub const DEFAULT_REDIRECT: &str = "artifactory";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_URL: &str = "ARTIFACTORY_URL";
pub const ENV_USERNAME: &str = "ARTIFACTORY_USERNAME";
pub const ENV_PASSWORD: &str = "ARTIFACTORY_PASSWORD";
pub const ENV_API_KEY: &str = "ARTIFACTORY_API_KEY";
pub const ENV_REDIRECT: &str = "ARTIFACTORY_REDIRECT";

/// Persisted user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Artifactory server URL
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Context path Artifactory is served under
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("artprov").join("config.json"))
    }

    /// Load configuration from the default location
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().context("No configuration directory on this platform")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        tracing::debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Overwrite the fields set in `overrides`
    pub fn merge(&mut self, overrides: &ConnectionOverrides) {
        let set = |slot: &mut Option<String>, value: &Option<String>| {
            if value.is_some() {
                slot.clone_from(value);
            }
        };
        set(&mut self.url, &overrides.url);
        set(&mut self.username, &overrides.username);
        set(&mut self.password, &overrides.password);
        set(&mut self.api_key, &overrides.api_key);
        set(&mut self.redirect, &overrides.redirect);
    }
}

/// Connection values given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub redirect: Option<String>,
}

/// Effective connection settings after layering
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub redirect: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("redirect", &self.redirect)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionSettings {
    /// Resolve settings from the process environment, CLI and config file
    pub fn from_env(config: &Config, cli: &ConnectionOverrides) -> Result<Self> {
        Self::resolve(config, cli, |name| std::env::var(name).ok())
    }

    /// Layer `env` over `cli` over `config`
    ///
    /// Empty environment values count as unset.
    pub fn resolve<F>(config: &Config, cli: &ConnectionOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |var: &str, flag: &Option<String>, file: &Option<String>| {
            env(var)
                .filter(|v| !v.is_empty())
                .or_else(|| flag.clone())
                .or_else(|| file.clone())
        };

        let url = pick(ENV_URL, &cli.url, &config.url).with_context(|| {
            format!("No Artifactory URL: set {}, pass --artifactory-url or add url to the config file", ENV_URL)
        })?;
        let redirect = pick(ENV_REDIRECT, &cli.redirect, &config.redirect)
            .unwrap_or_else(|| DEFAULT_REDIRECT.to_string());

        let settings = Self {
            url,
            username: pick(ENV_USERNAME, &cli.username, &config.username),
            password: pick(ENV_PASSWORD, &cli.password, &config.password),
            api_key: pick(ENV_API_KEY, &cli.api_key, &config.api_key),
            redirect,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        };

        tracing::debug!("Resolved connection: {:?}", settings);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn file_config() -> Config {
        Config {
            url: Some("http://file:8081".to_string()),
            username: Some("file-user".to_string()),
            password: Some("file-pass".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_env_beats_cli_beats_file() {
        let cli = ConnectionOverrides {
            url: Some("http://cli:8081".to_string()),
            username: Some("cli-user".to_string()),
            ..ConnectionOverrides::default()
        };
        let settings = ConnectionSettings::resolve(
            &file_config(),
            &cli,
            env(&[(ENV_URL, "http://env:8081")]),
        )
        .unwrap();

        assert_eq!(settings.url, "http://env:8081");
        assert_eq!(settings.username.as_deref(), Some("cli-user"));
        assert_eq!(settings.password.as_deref(), Some("file-pass"));
    }

    #[test]
    fn test_redirect_defaults_to_artifactory() {
        let settings =
            ConnectionSettings::resolve(&file_config(), &ConnectionOverrides::default(), env(&[]))
                .unwrap();
        assert_eq!(settings.redirect, DEFAULT_REDIRECT);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let settings = ConnectionSettings::resolve(
            &file_config(),
            &ConnectionOverrides::default(),
            env(&[(ENV_URL, ""), (ENV_REDIRECT, "")]),
        )
        .unwrap();
        assert_eq!(settings.url, "http://file:8081");
        assert_eq!(settings.redirect, DEFAULT_REDIRECT);
    }

    #[test]
    fn test_missing_url_is_an_error() {
        let err = ConnectionSettings::resolve(&Config::default(), &ConnectionOverrides::default(), env(&[]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_URL));
        assert!(err.to_string().contains("--artifactory-url"));
    }

    #[test]
    fn test_debug_masks_secrets() {
        let settings =
            ConnectionSettings::resolve(&file_config(), &ConnectionOverrides::default(), env(&[]))
                .unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("file-pass"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = file_config();
        config.merge(&ConnectionOverrides {
            redirect: Some("".to_string()),
            ..ConnectionOverrides::default()
        });
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.redirect.as_deref(), Some(""));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_load_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
