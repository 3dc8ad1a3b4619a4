//! Scrape options and their merge rules.
//!
//! Defaults are an immutable [`ScrapeOptions`] value. Each call layers a
//! [`ScrapeOverrides`] on top with [`ScrapeOptions::merged`], a pure
//! function: caller values win per key, and the nested [`FetchOptions`]
//! merge entry by entry instead of being replaced wholesale.
//!
//! Persistent defaults can be kept in `~/.config/vimeo-scraper/config.toml`:
//!
//! ```toml
//! [defaults]
//! auto_open_stream = false
//! containment = "propagate"
//!
//! [defaults.fetch]
//! timeout_secs = 20
//! headers = { Referer = "https://example.com/" }
//!
//! [diagnostics]
//! max_bytes = 250000
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::containment::Containment;

/// Options forwarded to the HTTP transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Extra query parameters appended to the URL.
    pub query: BTreeMap<String, String>,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Whole-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Request body, sent with POST.
    pub body: Option<String>,
}

impl FetchOptions {
    /// Layer `other` over `self`, key by key.
    #[must_use]
    pub fn merged(&self, other: &FetchOptions) -> FetchOptions {
        let mut headers = self.headers.clone();
        headers.extend(other.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut query = self.query.clone();
        query.extend(other.query.iter().map(|(k, v)| (k.clone(), v.clone())));

        FetchOptions {
            headers,
            query,
            user_agent: other.user_agent.clone().or_else(|| self.user_agent.clone()),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            body: other.body.clone().or_else(|| self.body.clone()),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Fully-populated per-call options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeOptions {
    /// Options for the player page request (and the media request).
    pub fetch: FetchOptions,
    /// Open the media stream as part of `resolve`.
    pub auto_open_stream: bool,
    /// What to do with failures.
    pub containment: Containment,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            auto_open_stream: true,
            containment: Containment::Suppress,
        }
    }
}

impl ScrapeOptions {
    /// Apply caller overrides. `self` is left untouched.
    #[must_use]
    pub fn merged(&self, overrides: &ScrapeOverrides) -> ScrapeOptions {
        ScrapeOptions {
            fetch: self.fetch.merged(&overrides.fetch),
            auto_open_stream: overrides.auto_open_stream.unwrap_or(self.auto_open_stream),
            containment: overrides.containment.unwrap_or(self.containment),
        }
    }
}

/// Caller-supplied partial options; unset fields inherit the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeOverrides {
    pub fetch: FetchOptions,
    pub auto_open_stream: Option<bool>,
    pub containment: Option<Containment>,
}

impl ScrapeOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    #[must_use]
    pub fn auto_open_stream(mut self, open: bool) -> Self {
        self.auto_open_stream = Some(open);
        self
    }

    #[must_use]
    pub fn containment(mut self, containment: Containment) -> Self {
        self.containment = Some(containment);
        self
    }
}

/// Where and how much the diagnostic log may write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Size at which the log is truncated and restarted.
    pub max_bytes: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vimeo-scraper")
                .join("error-log.txt"),
            max_bytes: 500_000,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub defaults: ScrapeOptions,
    pub diagnostics: DiagnosticsConfig,
}

impl ScraperConfig {
    /// Load from `~/.config/vimeo-scraper/config.toml`.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Return the path to the config file.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vimeo-scraper")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = ScrapeOptions::default();
        assert!(options.auto_open_stream);
        assert_eq!(options.containment, Containment::Suppress);
        assert_eq!(options.fetch, FetchOptions::default());
    }

    #[test]
    fn overrides_win_per_key() {
        let defaults = ScrapeOptions::default();
        let merged = defaults.merged(&ScrapeOverrides::new().auto_open_stream(false));
        assert!(!merged.auto_open_stream);
        assert_eq!(merged.containment, Containment::Suppress);

        let merged = defaults.merged(&ScrapeOverrides::new().containment(Containment::Propagate));
        assert!(merged.auto_open_stream);
        assert_eq!(merged.containment, Containment::Propagate);
    }

    #[test]
    fn fetch_options_merge_entry_by_entry() {
        let defaults = ScrapeOptions {
            fetch: FetchOptions::default()
                .with_header("Referer", "https://a.example/")
                .with_header("Accept-Language", "en")
                .with_timeout_secs(10),
            ..ScrapeOptions::default()
        };
        let overrides = ScrapeOverrides::new()
            .fetch(FetchOptions::default().with_header("Referer", "https://b.example/"));

        let merged = defaults.merged(&overrides);
        assert_eq!(merged.fetch.headers["Referer"], "https://b.example/");
        assert_eq!(merged.fetch.headers["Accept-Language"], "en");
        assert_eq!(merged.fetch.timeout_secs, Some(10));
    }

    #[test]
    fn merging_leaves_defaults_untouched() {
        let defaults = ScrapeOptions::default();
        let _ = defaults.merged(&ScrapeOverrides::new().auto_open_stream(false));
        assert_eq!(defaults, ScrapeOptions::default());
    }

    #[test]
    fn parse_empty_config() {
        let config = ScraperConfig::from_toml("").unwrap();
        assert_eq!(config.defaults, ScrapeOptions::default());
        assert!(config.diagnostics.enabled);
        assert_eq!(config.diagnostics.max_bytes, 500_000);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[defaults]
auto_open_stream = false
containment = "propagate"

[defaults.fetch]
timeout_secs = 20
headers = { Referer = "https://example.com/" }

[diagnostics]
enabled = false
path = "/tmp/vimeo-errors.txt"
max_bytes = 1000
"#;
        let config = ScraperConfig::from_toml(toml_str).unwrap();
        assert!(!config.defaults.auto_open_stream);
        assert_eq!(config.defaults.containment, Containment::Propagate);
        assert_eq!(config.defaults.fetch.timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.defaults.fetch.headers["Referer"], "https://example.com/");
        assert!(!config.diagnostics.enabled);
        assert_eq!(config.diagnostics.path, PathBuf::from("/tmp/vimeo-errors.txt"));
    }

    #[test]
    fn rejects_unknown_containment() {
        assert!(ScraperConfig::from_toml("[defaults]\ncontainment = \"sometimes\"").is_err());
    }
}
