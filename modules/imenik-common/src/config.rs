use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ImenikError, Result};

/// CSS selectors describing the directory's search form and result markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySelectors {
    pub search_input: String,
    pub result_container: String,
    pub full_name: String,
    /// Two-line block: street, then "<postal code> <city>".
    pub address: String,
    pub phone: String,
    pub pagination: String,
}

impl Default for DirectorySelectors {
    fn default() -> Self {
        Self {
            search_input: "form#search input[name='ime']".to_string(),
            result_container: "div.result".to_string(),
            full_name: ".result-name".to_string(),
            address: ".result-address".to_string(),
            phone: ".result-phone".to_string(),
            pagination: ".pagination a[href]".to_string(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Directory
    pub base_url: String,
    pub selectors: DirectorySelectors,

    // Browser
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    /// `None` waits forever.
    pub navigation_timeout: Option<Duration>,
    pub wait_timeout: Option<Duration>,

    // Pipeline
    pub batch_size: usize,
    pub cache_path: PathBuf,
    pub output_path: PathBuf,

    // External sink
    pub database_url: Option<String>,
    pub sink_collection: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://imenik.tportal.hr/".to_string(),
            selectors: DirectorySelectors::default(),
            browserless_url: "http://localhost:3000".to_string(),
            browserless_token: None,
            navigation_timeout: Some(Duration::from_secs(60)),
            wait_timeout: Some(Duration::from_secs(30)),
            batch_size: 10,
            cache_path: PathBuf::from("cache.json"),
            output_path: PathBuf::from("imenik-results.json"),
            database_url: None,
            sink_collection: "entries".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            base_url: env::var("IMENIK_BASE_URL").unwrap_or(defaults.base_url),
            selectors: defaults.selectors,
            browserless_url: env::var("BROWSERLESS_URL").unwrap_or(defaults.browserless_url),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
            navigation_timeout: timeout_env("IMENIK_NAV_TIMEOUT_SECS", defaults.navigation_timeout)?,
            wait_timeout: timeout_env("IMENIK_WAIT_TIMEOUT_SECS", defaults.wait_timeout)?,
            batch_size: parsed_env("IMENIK_BATCH_SIZE", defaults.batch_size)?,
            cache_path: env::var("IMENIK_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            output_path: env::var("IMENIK_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            database_url: optional_env("DATABASE_URL"),
            sink_collection: env::var("IMENIK_SINK_COLLECTION")
                .unwrap_or(defaults.sink_collection),
        };

        if config.batch_size == 0 {
            return Err(ImenikError::Config(
                "IMENIK_BATCH_SIZE must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Log the effective configuration with secrets shortened.
    pub fn log_redacted(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let n = v.chars().count().min(5);
                    let head: String = v.chars().take(n).collect();
                    format!("{head}...({} chars)", v.chars().count())
                }
                _ => "<not set>".to_string(),
            }
        }
        fn secs(val: Option<Duration>) -> String {
            val.map(|d| format!("{}s", d.as_secs()))
                .unwrap_or_else(|| "unbounded".to_string())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  IMENIK_BASE_URL: {}", self.base_url);
        tracing::info!("  BROWSERLESS_URL: {}", self.browserless_url);
        tracing::info!("  BROWSERLESS_TOKEN: {}", preview_opt(&self.browserless_token));
        tracing::info!("  IMENIK_NAV_TIMEOUT_SECS: {}", secs(self.navigation_timeout));
        tracing::info!("  IMENIK_WAIT_TIMEOUT_SECS: {}", secs(self.wait_timeout));
        tracing::info!("  IMENIK_BATCH_SIZE: {}", self.batch_size);
        tracing::info!("  IMENIK_CACHE_PATH: {}", self.cache_path.display());
        tracing::info!("  IMENIK_OUTPUT_PATH: {}", self.output_path.display());
        tracing::info!("  DATABASE_URL: {}", preview_opt(&self.database_url));
        tracing::info!("  IMENIK_SINK_COLLECTION: {}", self.sink_collection);
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ImenikError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

/// Seconds from the environment; `0` disables the timeout.
fn timeout_env(key: &str, default: Option<Duration>) -> Result<Option<Duration>> {
    match optional_env(key) {
        Some(_) => {
            let secs: u64 = parsed_env(key, 0)?;
            Ok((secs > 0).then(|| Duration::from_secs(secs)))
        }
        None => Ok(default),
    }
}
