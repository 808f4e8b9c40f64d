use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::gate::{Backoff, RetryPolicy};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PoochConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub gate: GateConfig,
    pub cat_facts: CatFactsConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GateConfig {
    pub max_concurrency: usize,
    pub max_backlog: usize,
    pub max_retries: u32,
    pub backoff: String,
    pub backoff_ms: u64,
    pub call_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CatFactsConfig {
    pub provider: String,
    pub url: String,
    pub failures_before_success: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub pickup_delay_days: i64,
}

impl Default for PoochConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            gate: GateConfig::default(),
            cat_facts: CatFactsConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_pooch_dir()
            .join("pooch.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            max_backlog: 100,
            max_retries: 5,
            backoff: "none".into(),
            backoff_ms: 0,
            call_timeout_ms: None,
        }
    }
}

impl Default for CatFactsConfig {
    fn default() -> Self {
        Self {
            provider: "http".into(),
            url: "https://www.catfacts.net/api".into(),
            failures_before_success: 4,
            request_timeout_ms: 5000,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pickup_delay_days: 3,
        }
    }
}

impl GateConfig {
    /// Build the retry policy described by this section.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let step = Duration::from_millis(self.backoff_ms);
        let backoff = match self.backoff.as_str() {
            "none" => Backoff::none(),
            "fixed" => Backoff::fixed(step),
            // Capped at 64x the initial step.
            "exponential" => Backoff::exponential(step, 2.0, step.saturating_mul(64)),
            other => anyhow::bail!(
                "unknown backoff: {other}. Supported: none, fixed, exponential"
            ),
        };
        Ok(RetryPolicy {
            max_retries: self.max_retries,
            backoff,
        })
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

/// Returns `~/.pooch/`
pub fn default_pooch_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pooch")
}

/// Returns the default config file path: `~/.pooch/config.toml`
pub fn default_config_path() -> PathBuf {
    default_pooch_dir().join("config.toml")
}

impl PoochConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PoochConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (POOCH_DB, POOCH_LOG_LEVEL, POOCH_PORT, POOCH_CAT_FACTS_URL).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("POOCH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("POOCH_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("POOCH_PORT") {
            self.server.port = val
                .parse()
                .with_context(|| format!("POOCH_PORT is not a valid port: {val}"))?;
        }
        if let Ok(val) = std::env::var("POOCH_CAT_FACTS_URL") {
            self.cat_facts.url = val;
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
