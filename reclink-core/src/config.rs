use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::retry::RetryPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Settings for the suggestion engine and its MusicBrainz client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Root of the MusicBrainz web service, without trailing slash.
    pub base_url: String,
    pub user_agent: String,
    /// Minimum spacing between two backend requests.
    pub rate_limit_ms: u64,
    /// Page size used while loading a release group's recordings.
    pub pool_page_size: u32,
    /// Number of results requested by the per-track fallback search.
    pub search_limit: u32,
    /// Fixed wait before retrying a failed request.
    pub retry_delay_ms: u64,
    /// Give up after this many attempts. None = retry forever.
    pub retry_max_attempts: Option<u32>,
    /// Quiet period after the last track edit before suggestions refresh.
    pub debounce_ms: u64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://musicbrainz.org/ws/2".to_string(),
            user_agent: concat!("reclink/", env!("CARGO_PKG_VERSION")).to_string(),
            rate_limit_ms: 1000,
            pool_page_size: 100,
            search_limit: 10,
            retry_delay_ms: 5000,
            retry_max_attempts: None,
            debounce_ms: 500,
        }
    }
}

impl SuggestConfig {
    /// Load from the environment in dev mode, otherwise from config.yaml.
    pub fn load() -> Result<Self, ConfigError> {
        let dev_mode = std::env::var("RECLINK_DEV_MODE").is_ok() || dotenvy::dotenv().is_ok();
        if dev_mode {
            info!("Dev mode activated - loading from environment");
            Self::from_lookup(|key| std::env::var(key).ok())
        } else {
            match Self::config_path() {
                Some(path) if path.exists() => {
                    info!("Loading config from {}", path.display());
                    Self::from_yaml_file(&path)
                }
                _ => {
                    info!("No config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// `<config dir>/reclink/config.yaml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reclink").join("config.yaml"))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    pub fn save_to_yaml_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Build a config from `RECLINK_*` variables, starting from the defaults.
    /// Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config = Self::default();
        if let Some(base_url) = get("RECLINK_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(user_agent) = get("RECLINK_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(v) = parse_var(&get, "RECLINK_RATE_LIMIT_MS")? {
            config.rate_limit_ms = v;
        }
        if let Some(v) = parse_var(&get, "RECLINK_POOL_PAGE_SIZE")? {
            config.pool_page_size = v;
        }
        if let Some(v) = parse_var(&get, "RECLINK_SEARCH_LIMIT")? {
            config.search_limit = v;
        }
        if let Some(v) = parse_var(&get, "RECLINK_RETRY_DELAY_MS")? {
            config.retry_delay_ms = v;
        }
        if let Some(v) = parse_var(&get, "RECLINK_RETRY_MAX_ATTEMPTS")? {
            config.retry_max_attempts = Some(v);
        }
        if let Some(v) = parse_var(&get, "RECLINK_DEBOUNCE_MS")? {
            config.debounce_ms = v;
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::fixed(Duration::from_millis(self.retry_delay_ms));
        match self.retry_max_attempts {
            Some(max) => policy.with_max_attempts(max),
            None => policy,
        }
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SuggestConfig::default();
        assert_eq!(config.pool_page_size, 100);
        assert_eq!(config.retry_delay_ms, 5000);
        assert_eq!(config.retry_policy(), RetryPolicy::fixed(Duration::from_secs(5)));
    }

    #[test]
    fn test_env_overrides() {
        let config = SuggestConfig::from_lookup(lookup_from(&[
            ("RECLINK_BASE_URL", "http://localhost:5000/ws/2/"),
            ("RECLINK_POOL_PAGE_SIZE", "25"),
            ("RECLINK_RETRY_MAX_ATTEMPTS", "3"),
            ("RECLINK_DEBOUNCE_MS", ""),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:5000/ws/2");
        assert_eq!(config.pool_page_size, 25);
        assert_eq!(config.retry_max_attempts, Some(3));
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::fixed(Duration::from_secs(5)).with_max_attempts(3)
        );
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let err = SuggestConfig::from_lookup(lookup_from(&[("RECLINK_SEARCH_LIMIT", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref key, ref value }
                if key == "RECLINK_SEARCH_LIMIT" && value == "lots"
        ));
    }

    #[test]
    fn test_yaml_round_trip_with_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "search_limit: 25\nretry_delay_ms: 100\n").unwrap();

        let config = SuggestConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.search_limit, 25);
        assert_eq!(config.retry_delay_ms, 100);
        assert_eq!(config.base_url, SuggestConfig::default().base_url);

        let saved = dir.path().join("nested").join("config.yaml");
        config.save_to_yaml_file(&saved).unwrap();
        assert_eq!(SuggestConfig::from_yaml_file(&saved).unwrap(), config);
    }
}
