//! Configuration — TOML file plus environment overrides
//!
//! Search order:
//! 1. `PORTWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `portwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Secrets come from the environment on top of whatever the file says:
//! `FEED_API_KEY` and `REASONING_API_TOKEN`. Missing credentials are the
//! only fatal configuration error, caught once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Upstream position feed connection and subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_host")]
    pub host: String,
    #[serde(default = "default_feed_port")]
    pub port: u16,
    /// Credential for the subscription handshake. Usually supplied via
    /// the `FEED_API_KEY` environment variable rather than the file.
    #[serde(default)]
    pub api_key: String,
    /// Pairs of [lat, lon] corners; default subscribes worldwide.
    #[serde(default = "default_bounding_boxes")]
    pub bounding_boxes: Vec<Vec<[f64; 2]>>,
    /// Optional MMSI allow-list for the subscription.
    #[serde(default)]
    pub filter_mmsi: Option<Vec<String>>,
}

fn default_feed_host() -> String {
    "127.0.0.1".to_string()
}

fn default_feed_port() -> u16 {
    4001
}

fn default_bounding_boxes() -> Vec<Vec<[f64; 2]>> {
    vec![vec![[-90.0, -180.0], [90.0, 180.0]]]
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: default_feed_host(),
            port: default_feed_port(),
            api_key: String::new(),
            bounding_boxes: default_bounding_boxes(),
            filter_mmsi: None,
        }
    }
}

/// Backing store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "./data/portwatch.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Reasoning endpoint connection and generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    /// Bearer token. Usually supplied via `REASONING_API_TOKEN`.
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_endpoint_url() -> String {
    "https://api-inference.huggingface.co/models/mistralai/Mixtral-8x7B-v0.1".to_string()
}

fn default_max_new_tokens() -> u32 {
    512
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            api_token: String::new(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Prediction worker scheduling and analysis windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between batch passes over the queue.
    #[serde(default = "default_worker_interval_secs")]
    pub interval_secs: u64,
    /// Traffic bounding-box radius (nautical miles).
    #[serde(default = "default_traffic_radius_nm")]
    pub traffic_radius_nm: f64,
    /// Worker passes before an unprocessable item expires.
    #[serde(default = "default_attempt_budget")]
    pub attempt_budget: u32,
}

fn default_worker_interval_secs() -> u64 {
    300
}

fn default_traffic_radius_nm() -> f64 {
    10.0
}

fn default_attempt_budget() -> u32 {
    12
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_worker_interval_secs(),
            traffic_radius_nm: default_traffic_radius_nm(),
            attempt_budget: default_attempt_budget(),
        }
    }
}

impl Config {
    /// Load configuration using the standard search order, then apply
    /// environment overrides for secrets.
    pub fn load() -> Self {
        let mut config = Self::load_file_or_default();
        config.apply_env_overrides();
        config
    }

    fn load_file_or_default() -> Self {
        if let Ok(path) = std::env::var("PORTWATCH_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from PORTWATCH_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PORTWATCH_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PORTWATCH_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("portwatch.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./portwatch.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./portwatch.toml, using defaults");
                }
            }
        }

        info!("No portwatch.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Environment wins over the file for credentials.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("FEED_API_KEY") {
            self.feed.api_key = key;
        }
        if let Ok(token) = std::env::var("REASONING_API_TOKEN") {
            self.reasoning.api_token = token;
        }
    }

    /// Startup validation. Missing credentials are unrecoverable — there
    /// is no point supervising a connector that can never subscribe.
    pub fn validate(&self, need_feed: bool, need_reasoning: bool) -> Result<(), ConfigError> {
        if need_feed && self.feed.api_key.is_empty() {
            return Err(ConfigError::MissingCredential(
                "feed.api_key (or FEED_API_KEY)",
            ));
        }
        if need_reasoning && self.reasoning.api_token.is_empty() {
            return Err(ConfigError::MissingCredential(
                "reasoning.api_token (or REASONING_API_TOKEN)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = Config::default();
        assert_eq!(config.feed.port, 4001);
        assert_eq!(config.feed.bounding_boxes, vec![vec![[-90.0, -180.0], [90.0, 180.0]]]);
        assert_eq!(config.worker.interval_secs, 300);
        assert_eq!(config.worker.attempt_budget, 12);
        assert_eq!(config.reasoning.max_new_tokens, 512);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            host = "feed.example.net"
            api_key = "abc"

            [worker]
            interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.host, "feed.example.net");
        assert_eq!(config.feed.port, 4001);
        assert_eq!(config.worker.interval_secs, 60);
        assert_eq!(config.worker.traffic_radius_nm, 10.0);
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let config = Config::default();
        assert!(config.validate(true, false).is_err());
        assert!(config.validate(false, true).is_err());
        assert!(config.validate(false, false).is_ok());

        let mut config = Config::default();
        config.feed.api_key = "k".to_string();
        config.reasoning.api_token = "t".to_string();
        assert!(config.validate(true, true).is_ok());
    }
}
