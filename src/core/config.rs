use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "XRATE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_provider_url() -> String {
    "https://v6.exchangerate-api.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_provider_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            backend_url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    30 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_currency: default_base_currency(),
            refresh_interval_secs: default_refresh_interval_secs(),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads from `path` when given, otherwise from the default location.
    ///
    /// A missing default file is not an error: the built-in defaults apply.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_path(&default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "xrate", "xrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            debug!("Using API key from {}", API_KEY_ENV);
            self.provider.api_key = key.trim().to_string();
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }

    /// Upper bound for one refresh, all retries included.
    pub fn fetch_budget(&self) -> Result<Duration> {
        let retries = u32::try_from(self.provider.retries)
            .context("provider.retries is too large")?;
        let attempts = retries
            .checked_add(1)
            .context("provider.retries is too large")?;
        self.provider_timeout()
            .checked_mul(attempts)
            .and_then(|total| {
                Duration::from_millis(self.provider.retry_delay_ms)
                    .checked_mul(retries)
                    .and_then(|delays| total.checked_add(delays))
            })
            .context("provider timeout and retries overflow the fetch budget")
    }

    /// Checks the settings the server cannot run without.
    pub fn validate_for_server(&self) -> Result<()> {
        let base = self.base_currency.trim();
        if base.len() != 3 || !base.bytes().all(|b| b.is_ascii_alphabetic()) {
            bail!("base_currency must be a 3-letter code, got '{}'", self.base_currency);
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        if self.provider.timeout_secs == 0 {
            bail!("provider.timeout_secs must be greater than zero");
        }
        let budget = self.fetch_budget()?;
        if budget >= self.refresh_interval() {
            bail!(
                "provider timeout and retries ({}s) must fit within refresh_interval_secs ({})",
                budget.as_secs(),
                self.refresh_interval_secs
            );
        }
        if self.provider.api_key.trim().is_empty() {
            bail!("No provider API key configured (set provider.api_key or {API_KEY_ENV})");
        }
        Ok(())
    }
}
