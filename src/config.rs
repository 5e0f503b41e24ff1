//! Configuration file parser for ~/.config/dealfeed/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; missing keys fall back to the production defaults below.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WordPress posts endpoint.
    pub base_posts: String,

    /// Posts requested per page.
    pub per_page: usize,

    /// Hard cap on posts per fetch cycle.
    pub max_posts: usize,

    /// ISO-8601 lower bound forwarded as the `after` query parameter.
    /// `None` fetches the source's full history.
    pub after: Option<String>,

    /// Per-page-request timeout for feed fetches, in seconds.
    pub request_timeout_secs: u64,

    /// Timeout for image-resolution page fetches, in seconds.
    pub resolve_timeout_secs: u64,

    /// IANA timezone id used for timestamp display and no-zone date parsing.
    pub timezone: String,

    /// Directory holding the image-resolution cache file. Defaults to the
    /// platform cache directory.
    pub cache_dir: Option<PathBuf>,

    /// User agent sent with image-resolution page fetches.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_posts: "https://dealingindeals.com/wp-json/wp/v2/posts".to_string(),
            per_page: 100,
            max_posts: 7500,
            after: Some("2025-01-01T00:00:00Z".to_string()),
            request_timeout_secs: 20,
            resolve_timeout_secs: 15,
            timezone: "America/New_York".to_string(),
            cache_dir: None,
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS like Mac OS X) \
                         AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile"
                .to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as a warning
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
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "base_posts",
                "per_page",
                "max_posts",
                "after",
                "request_timeout_secs",
                "resolve_timeout_secs",
                "timezone",
                "cache_dir",
                "user_agent",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), endpoint = %config.base_posts, "Loaded configuration");
        Ok(config)
    }

    /// The configured timezone, falling back to UTC (with a warning) when
    /// the id is not a known IANA zone.
    pub fn timezone(&self) -> Tz {
        match self.timezone.parse() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(timezone = %self.timezone, "Unknown timezone id, falling back to UTC");
                chrono_tz::UTC
            }
        }
    }

    /// Path of the image-resolution cache file.
    pub fn image_cache_file(&self) -> PathBuf {
        let dir = self
            .cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("dealfeed")))
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join("image-resolutions.json")
    }
}
