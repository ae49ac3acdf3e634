//! Build configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a `config.toml` in the project root overrides just the keys
//! it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! cache_dir = ".docsite-cache"   # Content cache and model.json
//! output_dir = "dist"            # Published site
//!
//! [processing]
//! concurrency = 20               # Pages transformed at the same time
//!
//! [markdown]
//! tables = true
//! footnotes = true
//! strikethrough = true
//! tasklists = true
//! heading_anchors = true         # id + self-link on every heading
//!
//! [links]
//! rewrite = true                 # Point links to source docs at site pages
//!
//! [sitemap]
//! enabled = true
//! hosts = ["https://example.com"]
//! changefreq = "weekly"
//! priority = 0.5
//!
//! [publish]
//! exclude = ["*.meta.json", "model.json", "*.md", ".render-cache.json"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site build configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Where intermediate and final files go.
    pub paths: PathsConfig,
    /// Parallel page processing settings.
    pub processing: ProcessingConfig,
    /// Markdown extensions and heading anchors.
    pub markdown: MarkdownConfig,
    /// Link override resolution.
    pub links: LinksConfig,
    /// `sitemap.xml` generation.
    pub sitemap: SitemapConfig,
    /// Cache → output copy.
    pub publish: PublishConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.concurrency == 0 {
            return Err(ConfigError::Validation(
                "processing.concurrency must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sitemap.priority) {
            return Err(ConfigError::Validation(
                "sitemap.priority must be between 0.0 and 1.0".into(),
            ));
        }
        if !CHANGE_FREQUENCIES.contains(&self.sitemap.changefreq.as_str()) {
            return Err(ConfigError::Validation(format!(
                "sitemap.changefreq must be one of {}",
                CHANGE_FREQUENCIES.join(", ")
            )));
        }
        if self.sitemap.enabled && self.sitemap.hosts.is_empty() {
            return Err(ConfigError::Validation(
                "sitemap.hosts must not be empty when the sitemap is enabled".into(),
            ));
        }
        if self.paths.cache_dir == self.paths.output_dir {
            return Err(ConfigError::Validation(
                "paths.cache_dir and paths.output_dir must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Values accepted by `<changefreq>` in the sitemap protocol.
pub const CHANGE_FREQUENCIES: &[&str] = &[
    "always", "hourly", "daily", "weekly", "monthly", "yearly", "never",
];

/// Cache and output locations, relative to the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".docsite-cache"),
            output_dir: PathBuf::from("dist"),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of pages transformed at the same time.
    ///
    /// Page tasks are mostly file reads and writes, so this is not clamped
    /// to the core count.
    pub concurrency: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { concurrency: 20 }
    }
}

/// Markdown rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    /// Give every heading a slug id and a self-link anchor.
    pub heading_anchors: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: true,
            heading_anchors: true,
        }
    }
}

/// Link override resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// Rewrite links that point at another page's source document.
    pub rewrite: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self { rewrite: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    pub enabled: bool,
    /// Base URLs the site is served from; every page is listed once per host.
    pub hosts: Vec<String>,
    pub changefreq: String,
    pub priority: f64,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hosts: vec!["https://example.com".to_string()],
            changefreq: "weekly".to_string(),
            priority: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// File name patterns left out of the published tree.
    ///
    /// `*.md` matches by suffix, `draft*` by prefix, anything else exactly.
    pub exclude: Vec<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "*.meta.json".to_string(),
                "model.json".to_string(),
                "*.md".to_string(),
                ".render-cache.json".to_string(),
            ],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(root = %root.display(), "loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# docsite configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
# Content cache: page sources, rendered HTML and the persisted model.json.
cache_dir = ".docsite-cache"

# Published site.
output_dir = "dist"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Number of pages transformed at the same time.
concurrency = 20

# ---------------------------------------------------------------------------
# Markdown
# ---------------------------------------------------------------------------
[markdown]
tables = true
footnotes = true
strikethrough = true
tasklists = true

# Give every heading an id (GitHub-style slug) and a self-link anchor.
heading_anchors = true

# ---------------------------------------------------------------------------
# Links
# ---------------------------------------------------------------------------
[links]
# Rewrite links that point at another page's source document (sourceUrl)
# so they point at that page on the site instead.
rewrite = true

# ---------------------------------------------------------------------------
# Sitemap
# ---------------------------------------------------------------------------
[sitemap]
enabled = true

# Base URLs the site is served from. Every published page is listed once
# per host.
hosts = ["https://example.com"]

# always | hourly | daily | weekly | monthly | yearly | never
changefreq = "weekly"

# 0.0 - 1.0
priority = 0.5

# ---------------------------------------------------------------------------
# Publish
# ---------------------------------------------------------------------------
[publish]
# File name patterns not copied from the cache to the output directory.
# "*.md" matches by suffix, "draft*" by prefix, anything else exactly.
exclude = ["*.meta.json", "model.json", "*.md", ".render-cache.json"]
"##
}
