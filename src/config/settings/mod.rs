
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::database::models::SourceKind;
use crate::scrape::{
    DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT, FetchConfig, has_page_placeholder, page_url,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub fetch: FetchSettings,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file path. `None` falls back to `harvest.db` in the config
    /// directory.
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchSettings {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub page_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Page template for the book catalog; `{}` is the page counter.
    pub books_url: String,
    /// Page template for the quote listing; `{}` is the page counter.
    pub quotes_url: String,
    /// Plain URL of the single-page job board.
    pub jobs_url: String,
    pub default_limit: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid page template: {0} (paginated sources need a '{{}}' placeholder)")]
    MissingPagePlaceholder(String),
    #[error("Invalid page template: {0} (single-page sources take a plain URL)")]
    UnexpectedPagePlaceholder(String),
    #[error("Invalid user agent (cannot be empty)")]
    InvalidUserAgent,
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry budget: {0} (must be between 1 and 10 attempts)")]
    InvalidRetries(u32),
    #[error("Invalid delay: {0}ms (must be 60000 or less)")]
    InvalidDelay(u64),
    #[error("Invalid item limit: {0} (must be between 1 and 10000)")]
    InvalidLimit(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for FetchSettings {
    #[inline]
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: 10,
            max_retries: 3,
            retry_delay_ms: 500,
            page_delay_ms: 500,
        }
    }
}

impl Default for SourcesConfig {
    #[inline]
    fn default() -> Self {
        Self {
            books_url: "http://books.toscrape.com/catalogue/page-{}.html".to_string(),
            quotes_url: "http://quotes.toscrape.com/page/{}/".to_string(),
            jobs_url: "https://realpython.github.io/fake-jobs/".to_string(),
            default_limit: 20,
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("webharvest"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;
        Self::load_from(&config_path)
    }

    /// Loads from an explicit file path; a missing file yields the defaults.
    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;
        self.save_to(&config_path)
    }

    #[inline]
    pub fn save_to<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_path = config_path.as_ref();
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!(
                    "Failed to create config directory: {}",
                    config_dir.display()
                )
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fetch.validate()?;
        self.sources.validate()
    }

    /// Resolves the SQLite file path, defaulting into the config directory.
    #[inline]
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("harvest.db")),
        }
    }

    /// The configured page template or URL for one source.
    #[inline]
    pub fn source_url(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Books => &self.sources.books_url,
            SourceKind::Quotes => &self.sources.quotes_url,
            SourceKind::Jobs => &self.sources.jobs_url,
        }
    }

    #[inline]
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.fetch.user_agent.clone(),
            accept_language: self.fetch.accept_language.clone(),
            timeout: std::time::Duration::from_secs(self.fetch.timeout_seconds),
            max_retries: self.fetch.max_retries,
            retry_delay: std::time::Duration::from_millis(self.fetch.retry_delay_ms),
            page_delay: std::time::Duration::from_millis(self.fetch.page_delay_ms),
        }
    }
}

impl FetchSettings {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidUserAgent);
        }

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.max_retries) {
            return Err(ConfigError::InvalidRetries(self.max_retries));
        }

        if self.retry_delay_ms > 60_000 {
            return Err(ConfigError::InvalidDelay(self.retry_delay_ms));
        }

        if self.page_delay_ms > 60_000 {
            return Err(ConfigError::InvalidDelay(self.page_delay_ms));
        }

        Ok(())
    }
}

impl SourcesConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !has_page_placeholder(&self.books_url) {
            return Err(ConfigError::MissingPagePlaceholder(self.books_url.clone()));
        }
        validate_http_url(&page_url(&self.books_url, 1))?;

        if !has_page_placeholder(&self.quotes_url) {
            return Err(ConfigError::MissingPagePlaceholder(self.quotes_url.clone()));
        }
        validate_http_url(&page_url(&self.quotes_url, 1))?;

        if has_page_placeholder(&self.jobs_url) {
            return Err(ConfigError::UnexpectedPagePlaceholder(
                self.jobs_url.clone(),
            ));
        }
        validate_http_url(&self.jobs_url)?;

        if self.default_limit == 0 || self.default_limit > 10_000 {
            return Err(ConfigError::InvalidLimit(self.default_limit));
        }

        Ok(())
    }
}

fn validate_http_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }
    Ok(())
}
