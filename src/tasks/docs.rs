//! Tasks that produce page content in the cache: importing local source
//! documents and rendering markdown to HTML.

use super::{Task, TaskError, process_pages};
use crate::cache::{
    CacheStats, ContentCache, RenderCache, hash_content, hash_render_params, html_sibling,
};
use crate::config::MarkdownConfig;
use crate::links::{LinkResolver, has_unsupported_protocol, is_absolute_http_url};
use crate::markdown::{RenderContext, render};
use crate::model::Model;
use crate::page::PageRecord;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

/// Source document formats the pipeline can take content from.
const SOURCE_EXTENSIONS: &[&str] = &["md", "html"];

// ============================================================================
// Load sources from local
// ============================================================================

/// Copy local source documents into the content cache.
///
/// Applies to pages with no `contentFile` yet whose `sourceUrl` is a
/// relative path to a `.md` or `.html` file under the project root. The file
/// lands at `<url>/index.<ext>` in the cache and becomes the page's
/// `contentFile`. Pages whose source file does not exist are dropped from
/// the model with a warning.
#[derive(Debug, Clone)]
pub struct LoadSourcesFromLocal {
    pub source_root: PathBuf,
    pub cache: ContentCache,
    pub concurrency: usize,
}

impl LoadSourcesFromLocal {
    fn source_path(&self, source_url: &str) -> PathBuf {
        self.source_root
            .join(source_url.trim_start_matches("./").trim_start_matches('/'))
    }
}

impl Task for LoadSourcesFromLocal {
    fn name(&self) -> &'static str {
        "load sources from local"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        let missing: Vec<String> = model
            .pages()
            .iter()
            .filter(|page| {
                local_source(page).is_some_and(|(src, _)| !self.source_path(src).is_file())
            })
            .map(|page| page.url().to_string())
            .collect();
        for url in missing {
            tracing::warn!(url = %url, "local source not found, dropping page");
            model.remove_page(&url);
        }

        let loaded = process_pages(
            model,
            self.concurrency,
            |page| local_source(page).is_some(),
            |page| -> Result<(), std::io::Error> {
                let Some((source_url, ext)) = local_source(page) else {
                    return Ok(());
                };
                let content_file = cache_location(page.url(), ext);
                self.cache
                    .import(&self.source_path(source_url), &content_file)?;
                page.set_content_file(content_file);
                Ok(())
            },
        )?;

        tracing::info!(pages = loaded, "loaded local sources");
        Ok(())
    }
}

/// `(sourceUrl, extension)` when the page still needs its local source.
fn local_source(page: &PageRecord) -> Option<(&str, &'static str)> {
    if page.content_file().is_some() {
        return None;
    }
    let source = page.source_url()?;
    if is_absolute_http_url(source) || has_unsupported_protocol(source) {
        return None;
    }
    let ext = Path::new(source).extension()?.to_str()?;
    SOURCE_EXTENSIONS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(ext))
        .map(|known| (source, *known))
}

/// Cache path for a page's imported source: `docs/intro/index.md`.
fn cache_location(url: &str, ext: &str) -> String {
    let dir = url.trim_matches('/');
    if dir.is_empty() {
        format!("index.{ext}")
    } else {
        format!("{dir}/index.{ext}")
    }
}

// ============================================================================
// Transform md to html
// ============================================================================

/// Render every markdown `contentFile` to a sibling `index.html`.
///
/// Renders are skipped when the render cache shows the same source was
/// already rendered with the same options and the HTML is still on disk.
#[derive(Debug)]
pub struct TransformMdToHtml {
    cache: ContentCache,
    markdown: MarkdownConfig,
    rewrite_links: bool,
    concurrency: usize,
    use_render_cache: bool,
    hits: AtomicU32,
    misses: AtomicU32,
}

impl TransformMdToHtml {
    pub fn new(
        cache: ContentCache,
        markdown: MarkdownConfig,
        rewrite_links: bool,
        concurrency: usize,
        use_render_cache: bool,
    ) -> Self {
        Self {
            cache,
            markdown,
            rewrite_links,
            concurrency,
            use_render_cache,
            hits: AtomicU32::new(0),
            misses: AtomicU32::new(0),
        }
    }

    /// Render cache use during the last run.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn transform(
        &self,
        page: &mut PageRecord,
        resolver: Option<&LinkResolver>,
        params_hash: &str,
        render_cache: &Mutex<RenderCache>,
    ) -> std::io::Result<()> {
        let Some(source_file) = page.content_file().map(str::to_string) else {
            return Ok(());
        };
        let source = self.cache.read(&source_file)?;
        let output_file = html_sibling(&source_file);
        let source_hash = hash_content(&source);

        let fresh = render_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_fresh(&output_file, &source_hash, params_hash, &self.cache);

        if fresh {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            let ctx = RenderContext {
                markdown: &self.markdown,
                links: resolver,
                source_url: page.source_url(),
            };
            let html = render(&source, ctx);
            self.cache.write(&output_file, &html)?;
            render_cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(output_file.clone(), source_hash, params_hash.to_string());
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        page.set_content_file(output_file);
        Ok(())
    }
}

impl Task for TransformMdToHtml {
    fn name(&self) -> &'static str {
        "transform md to html"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);

        let resolver = self.rewrite_links.then(|| LinkResolver::new(model.pages()));
        let params_hash = {
            let table = resolver.as_ref().map(LinkResolver::table).unwrap_or_default();
            hash_render_params(&self.markdown, self.rewrite_links, &table)
        };
        let render_cache = Mutex::new(if self.use_render_cache {
            RenderCache::load(self.cache.root())
        } else {
            RenderCache::empty()
        });

        process_pages(
            model,
            self.concurrency,
            |page| page.content_file().is_some_and(|f| f.ends_with(".md")),
            |page| self.transform(page, resolver.as_ref(), &params_hash, &render_cache),
        )?;

        let mut render_cache = render_cache.into_inner().unwrap_or_else(PoisonError::into_inner);
        let pruned = render_cache.prune(model.pages().iter().filter_map(PageRecord::content_file));
        if pruned > 0 {
            tracing::debug!(pruned, "dropped render cache entries of vanished pages");
        }
        render_cache.save(self.cache.root())?;
        tracing::info!(render = %self.stats(), "rendered markdown");
        Ok(())
    }
}
