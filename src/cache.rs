//! Content cache and render cache.
//!
//! Every page's content lives in the cache directory under the path stored
//! in its `contentFile` field. Tasks read the current file and write a new
//! one next to it (e.g. `docs/intro/index.md` → `docs/intro/index.html`),
//! so [`ContentCache`] is just path resolution plus reads and writes that
//! create parent directories as needed.
//!
//! # Render cache
//!
//! Markdown rendering is the only per-page step with real cost, and most
//! pages don't change between builds. [`RenderCache`] lets the markdown task
//! skip rendering when neither the source nor the render options changed.
//!
//! The cache is **content-addressed** by the pair:
//!
//! - **`source_hash`**: SHA-256 of the markdown source.
//! - **`params_hash`**: SHA-256 of everything else that shapes the HTML:
//!   markdown options, link rewriting, and the model's url/sourceUrl table
//!   when link rewriting is on.
//!
//! A hit requires a matching entry for the output path **and** the output
//! file still existing. The manifest is `<cache_dir>/.render-cache.json`.
//! Pass `--no-cache` to ignore it for one build.

use crate::config::MarkdownConfig;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the render cache manifest within the cache directory.
const MANIFEST_FILENAME: &str = ".render-cache.json";

/// Bump to invalidate every existing render cache.
const MANIFEST_VERSION: u32 = 1;

/// Read/write access to files under the cache directory.
#[derive(Debug, Clone)]
pub struct ContentCache {
    root: PathBuf,
}

impl ContentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a cache-relative file.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).is_file()
    }

    pub fn read(&self, relative: &str) -> io::Result<String> {
        fs::read_to_string(self.path(relative))
    }

    pub fn write(&self, relative: &str, contents: &str) -> io::Result<()> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    /// Copy an external file into the cache.
    pub fn import(&self, source: &Path, relative: &str) -> io::Result<()> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, path).map(|_| ())
    }
}

/// Cache-relative path of the HTML rendered from a content file:
/// an `index.html` sibling.
pub fn html_sibling(content_file: &str) -> String {
    match content_file.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/index.html"),
        None => "index.html".to_string(),
    }
}

/// A single cached render.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk manifest mapping rendered output paths to the hashes they were
/// rendered from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RenderCache {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl RenderCache {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the cache directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(cache_dir: &Path) -> Self {
        let path = cache_dir.join(MANIFEST_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "discarding unreadable render cache");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(cache_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(MANIFEST_FILENAME), json)
    }

    /// True when `output_path` was rendered from these exact inputs and the
    /// file is still on disk.
    pub fn is_fresh(
        &self,
        output_path: &str,
        source_hash: &str,
        params_hash: &str,
        cache: &ContentCache,
    ) -> bool {
        self.entries.get(output_path).is_some_and(|entry| {
            entry.source_hash == source_hash && entry.params_hash == params_hash
        }) && cache.exists(output_path)
    }

    /// Drop entries whose output is not in `live`. Returns how many went.
    pub fn prune<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) -> usize {
        let live: HashSet<&str> = live.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|output, _| live.contains(output.as_str()));
        before - self.entries.len()
    }

    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        self.entries.insert(
            output_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

/// SHA-256 of a string, as hex.
pub fn hash_content(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// SHA-256 of the render parameters.
///
/// `link_table` is the sorted `(sourceUrl, url)` table links are resolved
/// against; pass an empty slice when link rewriting is off.
pub fn hash_render_params(
    markdown: &MarkdownConfig,
    rewrite_links: bool,
    link_table: &[(&str, &str)],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"markdown\0");
    for flag in [
        markdown.tables,
        markdown.footnotes,
        markdown.strikethrough,
        markdown.tasklists,
        markdown.heading_anchors,
        rewrite_links,
    ] {
        hasher.update([u8::from(flag)]);
    }
    for (source, url) in link_table {
        hasher.update(source.as_bytes());
        hasher.update(b"\0");
        hasher.update(url.as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

/// Summary of render cache use for a build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.misses)
        }
    }
}
