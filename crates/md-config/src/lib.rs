//! Configuration for md-block.
//!
//! Two layers:
//!
//! - [`Config`]: process-wide settings parsed from `md-block.toml` with serde,
//!   discovered in the current directory or its parents.
//! - [`ElementConfig`]: per-element attributes (`src`, `hmin`, `hlinks`,
//!   `untrusted`) with a single [`ElementConfig::apply_change`] entry point.
//!
//! ## Environment Variable Expansion
//!
//! `fetch.base_url` supports `${VAR}` (error if unset) and `${VAR:-default}`.

mod element;
mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use md_renderer::ParserOptions;
use serde::Deserialize;
use url::Url;

pub use element::{Attribute, ConfigChange, ElementConfig};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "md-block.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global parser output options.
    pub parser: ParserConfig,
    /// Remote content fetching.
    fetch: FetchConfigRaw,
    /// Syntax highlighting.
    pub highlight: HighlightConfig,

    /// Resolved fetch configuration (set after loading).
    #[serde(skip)]
    pub fetch_resolved: FetchConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(&FetchConfig::default().base_url)
    }
}

/// `[parser]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// GitHub Flavored Markdown extensions.
    pub gfm: bool,
    /// Typographic punctuation.
    pub smartypants: bool,
    /// Class prefix for code block languages.
    pub lang_prefix: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let options = ParserOptions::default();
        Self {
            gfm: options.gfm,
            smartypants: options.smartypants,
            lang_prefix: options.lang_prefix,
        }
    }
}

impl ParserConfig {
    /// Parser options for these settings.
    #[must_use]
    pub fn options(&self) -> ParserOptions {
        ParserOptions {
            gfm: self.gfm,
            smartypants: self.smartypants,
            lang_prefix: self.lang_prefix.clone(),
        }
    }
}

/// Raw `[fetch]` section as parsed from TOML.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct FetchConfigRaw {
    base_url: Option<String>,
    timeout_secs: u64,
}

impl Default for FetchConfigRaw {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolved fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Document location relative `src` values are resolved against.
    pub base_url: Url,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(Path::new("/")),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// `[highlight]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Whether a highlighter capability is configured.
    pub enabled: bool,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g. "`fetch.base_url`").
        field: String,
        /// Error message (e.g. "${`DOCS_HOST`} not set").
        message: String,
    },
}

/// `file://` URL of `dir`, with a trailing slash so relative paths land inside it.
///
/// Relative directories fall back to the filesystem root.
fn default_base_url(dir: &Path) -> Url {
    Url::from_directory_path(dir)
        .unwrap_or_else(|()| Url::parse("file:///").expect("valid root file URL"))
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `md-block.toml` in the current directory and parents, falling back
    /// to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or if reading,
    /// parsing, expansion or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }
        match Self::discover_config() {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default_with_cwd()),
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&default_base_url(&cwd))
    }

    fn default_with_base(base_url: &Url) -> Self {
        Self {
            parser: ParserConfig::default(),
            fetch: FetchConfigRaw::default(),
            highlight: HighlightConfig::default(),
            fetch_resolved: FetchConfig {
                base_url: base_url.clone(),
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse, expand, resolve and validate configuration text.
    ///
    /// Without `fetch.base_url`, relative sources resolve against the
    /// current directory.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;

        let cwd = std::env::current_dir().unwrap_or_default();
        config.resolve(&default_base_url(&cwd))?;
        config.validate()?;
        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.fetch.base_url {
            self.fetch.base_url = Some(expand::expand_env(url, "fetch.base_url")?);
        }
        Ok(())
    }

    /// Resolve raw sections, using `default_base` when no base URL is set.
    fn resolve(&mut self, default_base: &Url) -> Result<(), ConfigError> {
        let base_url = match self.fetch.base_url.as_deref() {
            Some(raw) => Url::parse(raw).map_err(|e| {
                ConfigError::Validation(format!("fetch.base_url is not a valid URL: {e}"))
            })?,
            None => default_base.clone(),
        };

        self.fetch_resolved = FetchConfig {
            base_url,
            timeout: Duration::from_secs(self.fetch.timeout_secs),
        };
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_resolved.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if self.fetch_resolved.base_url.cannot_be_a_base() {
            return Err(ConfigError::Validation(
                "fetch.base_url cannot be used as a base for relative URLs".to_owned(),
            ));
        }
        if self.parser.lang_prefix.contains('"') {
            return Err(ConfigError::Validation(
                "parser.lang_prefix cannot contain quotes".to_owned(),
            ));
        }
        Ok(())
    }
}
