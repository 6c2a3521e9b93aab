//! Configuration file parser for ~/.config/pullfeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
//!
//! These settings belong to the caller. The feed core never reads them; the
//! front end resolves them into a [`FetchConfig`] and [`ParseOptions`] and
//! decides from [`NetworkPreference`] whether to fetch at all.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::feed::{FetchConfig, ParseOptions};

pub const DEFAULT_FEED_URL: &str = "http://news.ycombinator.com/rss";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Network gate
// ============================================================================

/// Which network links the user allows feed downloads on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum NetworkPreference {
    /// Only download over Wi-Fi
    #[default]
    #[serde(rename = "wifi", alias = "wi-fi")]
    #[value(name = "wifi", alias = "wi-fi")]
    WifiOnly,
    /// Download over any available link
    #[serde(rename = "any")]
    #[value(name = "any")]
    Any,
}

/// The link the device currently has, as reported by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Connectivity {
    Wifi,
    Mobile,
    Offline,
}

impl NetworkPreference {
    /// Whether a fetch may be attempted on the given link.
    pub fn permits(self, connectivity: Connectivity) -> bool {
        match (self, connectivity) {
            (_, Connectivity::Offline) => false,
            (NetworkPreference::Any, _) => true,
            (NetworkPreference::WifiOnly, link) => link == Connectivity::Wifi,
        }
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed to load.
    pub feed_url: String,

    /// Links on which downloads are allowed.
    pub network: NetworkPreference,

    /// Whether entries carry (and display) their description.
    pub include_description: bool,

    /// TCP/TLS connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-read timeout in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            network: NetworkPreference::WifiOnly,
            include_description: false,
            connect_timeout_ms: 15_000,
            read_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "feed_url",
        "network",
        "include_description",
        "connect_timeout_ms",
        "read_timeout_ms",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text, applying the same rules as [`Config::load`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            feed = %config.feed_url,
            network = ?config.network,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            include_description: self.include_description,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
