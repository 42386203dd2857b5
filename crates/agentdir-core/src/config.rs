//! Configuration types for agentdir components.
//!
//! Values are layered: built-in defaults, then the TOML file at
//! [`default_config_path`] (or an explicit path), then CLI flags and
//! environment variables applied by the binary.
//!
//! ```toml
//! api_url = "https://backend-1-sval.onrender.com/api"
//! cms_url = "https://strapi-jrm5.onrender.com"
//! related_limit = 3
//! preview_per_category = 6
//!
//! [http]
//! timeout_secs = 30
//! max_attempts = 3
//! retry_base_delay_ms = 500
//! ```

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::related::DEFAULT_RELATED_LIMIT;

/// Default base URL of the directory REST API.
pub const DEFAULT_API_URL: &str = "https://backend-1-sval.onrender.com/api";

/// Default base URL of the blog CMS.
pub const DEFAULT_CMS_URL: &str = "https://strapi-jrm5.onrender.com";

/// HTTP client configuration for external API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout: Duration,
    /// Total tries for a replayable request, the first one included.
    /// Zero is treated as one.
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Resolved configuration for the directory and CMS clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub api_url: String,
    pub cms_url: String,
    /// Bearer token forwarded on admin requests. Issued elsewhere.
    pub api_token: Option<String>,
    /// How many related articles to show under an article.
    pub related_limit: usize,
    /// How many listings the browse view shows per category.
    pub preview_per_category: usize,
    pub http: HttpConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            cms_url: DEFAULT_CMS_URL.to_string(),
            api_token: None,
            related_limit: DEFAULT_RELATED_LIMIT,
            preview_per_category: 6,
            http: HttpConfig::default(),
        }
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_url: Option<String>,
    cms_url: Option<String>,
    api_token: Option<String>,
    related_limit: Option<usize>,
    preview_per_category: Option<usize>,
    #[serde(default)]
    http: HttpSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpSection {
    timeout_secs: Option<u64>,
    max_attempts: Option<NonZeroU32>,
    retry_base_delay_ms: Option<u64>,
}

impl ConfigFile {
    fn apply(self, mut config: DirectoryConfig) -> DirectoryConfig {
        if let Some(url) = self.api_url {
            config.api_url = url;
        }
        if let Some(url) = self.cms_url {
            config.cms_url = url;
        }
        if self.api_token.is_some() {
            config.api_token = self.api_token;
        }
        if let Some(limit) = self.related_limit {
            config.related_limit = limit;
        }
        if let Some(n) = self.preview_per_category {
            config.preview_per_category = n;
        }
        if let Some(secs) = self.http.timeout_secs {
            config.http.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.http.max_attempts {
            config.http.max_attempts = attempts.get();
        }
        if let Some(ms) = self.http.retry_base_delay_ms {
            config.http.retry_base_delay = Duration::from_millis(ms);
        }
        config
    }
}

/// Returns `<config dir>/agentdir/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("agentdir").join("config.toml"))
}

/// Loads configuration from `path`, or from [`default_config_path`] when `None`.
///
/// A missing default file yields [`DirectoryConfig::default`]. A missing
/// explicit file is an error.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if the file cannot be read or is not
/// valid TOML for this schema.
pub fn load_config(path: Option<&Path>) -> Result<DirectoryConfig, AppError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(DirectoryConfig::default()),
        },
    };

    if !path.exists() {
        if explicit {
            return Err(AppError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        debug!("No config file at {}, using defaults", path.display());
        return Ok(DirectoryConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| AppError::ConfigError(format!("{}: {}", path.display(), e)))?;
    parse_config(&contents)
        .map_err(|e| AppError::ConfigError(format!("{}: {}", path.display(), e)))
}

/// Parses a TOML document on top of the defaults.
pub fn parse_config(contents: &str) -> Result<DirectoryConfig, toml::de::Error> {
    let file: ConfigFile = toml::from_str(contents)?;
    Ok(file.apply(DirectoryConfig::default()))
}
