//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/marquee.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//!
//! [omdb]
//! base_url = "http://www.omdbapi.com"
//! api_key = "..."          # or OMDB_API_KEY
//! timeout_secs = 10
//!
//! [pagination]
//! page_size = 10
//! max_page_size = 100
//!
//! [top]
//! limit = 5
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use marquee_core::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use marquee_core::ranking::TOP_MOVIES_LIMIT;

/// Environment variable consulted when `[omdb].api_key` is not set.
pub const OMDB_API_KEY_ENV: &str = "OMDB_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub omdb: OmdbConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub top: TopConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OmdbConfig {
    #[serde(default = "default_omdb_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_omdb_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OmdbConfig {
    /// The configured key, else `OMDB_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        match std::env::var(OMDB_API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "no OMDb API key: set omdb.api_key or the {} environment variable",
                OMDB_API_KEY_ENV
            ),
        }
    }
}

fn default_omdb_base_url() -> String {
    "http://www.omdbapi.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> usize {
    MAX_PAGE_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct TopConfig {
    #[serde(default = "default_top_limit")]
    pub limit: usize,
}

impl Default for TopConfig {
    fn default() -> Self {
        Self {
            limit: TOP_MOVIES_LIMIT,
        }
    }
}

fn default_top_limit() -> usize {
    TOP_MOVIES_LIMIT
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    validate(&config)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn validate(config: &Config) -> Result<()> {
    // Validate omdb
    let base_url = &config.omdb.base_url;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        bail!("omdb.base_url must start with http:// or https://, got '{}'", base_url);
    }
    if config.omdb.timeout_secs == 0 {
        bail!("omdb.timeout_secs must be > 0");
    }

    // Validate pagination
    if config.pagination.page_size == 0 {
        bail!("pagination.page_size must be > 0");
    }
    if config.pagination.max_page_size < config.pagination.page_size {
        bail!(
            "pagination.max_page_size ({}) must be >= pagination.page_size ({})",
            config.pagination.max_page_size,
            config.pagination.page_size
        );
    }

    // Validate top
    if config.top.limit == 0 {
        bail!("top.limit must be >= 1");
    }

    Ok(())
}
