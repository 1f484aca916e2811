// SPDX-License-Identifier: Apache-2.0

//! Configuration management for ufxray.
//!
//! Provides layered configuration from files and environment variables.
//! Uses XDG-compliant paths with environment variable support.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (prefix: `UFXRAY_`)
//! 2. Config file: `~/.config/ufxray/config.toml`
//! 3. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Override the KEV feed URL via environment variable
//! UFXRAY_KEV__FEED_URL=https://example.test/kev.json cargo run
//! ```

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::XrayError;
use crate::news::FeedSource;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP gateway settings.
    pub server: ServerConfig,
    /// News aggregation settings.
    pub news: NewsConfig,
    /// Known-exploited-vulnerabilities catalog settings.
    pub kev: KevConfig,
    /// Image proxy settings.
    pub proxy: ProxyConfig,
    /// Findings ledger settings.
    pub ledger: LedgerConfig,
    /// Scan collaborator settings.
    pub scan: ScanConfig,
}

/// HTTP gateway settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// News aggregation settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Merged feed cache TTL in hours.
    pub ttl_hours: i64,
    /// Per-source fetch timeout in seconds.
    pub fetch_timeout_seconds: u64,
    /// Item count returned when the caller does not ask for one.
    pub default_limit: usize,
    /// Hard ceiling on the item count a caller may request.
    pub max_limit: usize,
    /// Configured syndication sources, immutable for process lifetime.
    pub sources: Vec<FeedSource>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 4,
            fetch_timeout_seconds: 10,
            default_limit: 12,
            max_limit: 50,
            sources: default_feed_sources(),
        }
    }
}

/// Default syndication sources for the headline list.
#[must_use]
pub fn default_feed_sources() -> Vec<FeedSource> {
    vec![
        FeedSource {
            name: "KrebsOnSecurity".to_string(),
            endpoint: "https://krebsonsecurity.com/feed/".to_string(),
        },
        FeedSource {
            name: "The Hacker News".to_string(),
            endpoint: "https://thehackernews.com/feeds/posts/default?alt=rss".to_string(),
        },
        FeedSource {
            name: "BleepingComputer".to_string(),
            endpoint: "https://www.bleepingcomputer.com/feed/".to_string(),
        },
        FeedSource {
            name: "CISA Advisories".to_string(),
            endpoint: "https://www.cisa.gov/cybersecurity-advisories/all.xml".to_string(),
        },
    ]
}

/// Known-exploited-vulnerabilities catalog settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KevConfig {
    /// Catalog cache TTL in hours.
    pub ttl_hours: i64,
    /// Upstream catalog URL.
    pub feed_url: String,
    /// Fetch timeout in seconds.
    pub fetch_timeout_seconds: u64,
    /// Item count returned when the caller does not ask for one.
    pub default_limit: usize,
    /// Hard ceiling on the item count a caller may request.
    pub max_limit: usize,
}

impl Default for KevConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 12,
            feed_url:
                "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json"
                    .to_string(),
            fetch_timeout_seconds: 10,
            default_limit: 50,
            max_limit: 500,
        }
    }
}

/// Image proxy settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Per-hop fetch timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum number of redirects followed before giving up.
    pub max_redirects: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            max_redirects: 5,
        }
    }
}

/// Findings ledger settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Hard capacity; the oldest record is evicted past this.
    pub capacity: usize,
    /// Item count returned when the caller does not ask for one.
    pub default_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            default_limit: 100,
        }
    }
}

/// Scan collaborator settings.
///
/// The analyzers themselves are external scripts; only their invocation is
/// configured here.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Interpreter used to run the collaborator scripts.
    pub python_bin: String,
    /// Directory holding the collaborator scripts.
    pub scripts_dir: PathBuf,
    /// Per-scan time budget in seconds.
    pub timeout_seconds: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            python_bin: "python".to_string(),
            scripts_dir: PathBuf::from("scripts"),
            timeout_seconds: 120,
        }
    }
}

/// Returns the ufxray configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to `~/.config/ufxray`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join("ufxray");
    }
    dirs::home_dir()
        .expect("Could not determine home directory - is HOME set?")
        .join(".config")
        .join("ufxray")
}

/// Returns the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load application configuration.
///
/// Loads from config file (if exists) and environment variables.
/// Environment variables use the prefix `UFXRAY_` and double underscore
/// for nested keys (e.g., `UFXRAY_NEWS__TTL_HOURS`).
///
/// # Errors
///
/// Returns `XrayError::Config` if the config file exists but is invalid.
pub fn load_config() -> Result<AppConfig, XrayError> {
    let config_path = config_file_path();

    let config = Config::builder()
        // Load from config file (optional - may not exist)
        .add_source(File::with_name(config_path.to_string_lossy().as_ref()).required(false))
        // Override with environment variables
        .add_source(
            Environment::with_prefix("UFXRAY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    Ok(app_config)
}
