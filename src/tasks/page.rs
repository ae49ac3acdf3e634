//! Page decoration tasks: header fields, breadcrumbs and search metadata.
//!
//! These only read and write page fields. The ones that need to know about
//! other pages (titles of ancestors) build a url → title table first, then
//! fan out over the pages.

use super::{Task, TaskError, process_pages};
use crate::model::Model;
use crate::page::PageRecord;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::convert::Infallible;

/// Urls from the site root down to `url` itself.
///
/// `/docs/api/errors` → `/`, `/docs`, `/docs/api`, `/docs/api/errors`.
/// A trailing slash is ignored.
pub fn parent_urls(url: &str) -> Vec<String> {
    let mut urls = vec!["/".to_string()];
    let mut current = String::new();
    for segment in url.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        urls.push(current.clone());
    }
    urls
}

/// `url → title` for every page; pages without a title map to `None`.
fn title_table(model: &Model) -> HashMap<String, Option<String>> {
    model
        .pages()
        .iter()
        .map(|p| (p.url().to_string(), p.title().map(str::to_string)))
        .collect()
}

fn all_pages(_: &PageRecord) -> bool {
    true
}

// ============================================================================
// Header
// ============================================================================

/// `header.title` ← `title` (empty when the page has none).
#[derive(Debug, Clone)]
pub struct HeaderTitle {
    pub concurrency: usize,
}

impl Task for HeaderTitle {
    fn name(&self) -> &'static str {
        "header title"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        process_pages(model, self.concurrency, all_pages, |page| {
            let title = page.title().unwrap_or_default().to_string();
            page.set_header_field("title", Value::String(title));
            Ok::<(), Infallible>(())
        })?;
        Ok(())
    }
}

/// `header.meta` ← Open Graph and keyword tags derived from the page.
#[derive(Debug, Clone)]
pub struct HeaderMeta {
    pub concurrency: usize,
}

impl HeaderMeta {
    fn meta_for(page: &PageRecord) -> Value {
        let title = page.title().unwrap_or_default();
        let keywords = page.tags().join(", ");
        json!({
            "ogUrl": page.url(),
            "ogType": "article",
            "description": title,
            "ogDescription": title,
            "keywords": keywords,
            "ogKeywords": keywords,
        })
    }
}

impl Task for HeaderMeta {
    fn name(&self) -> &'static str {
        "header meta"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        process_pages(model, self.concurrency, all_pages, |page| {
            let meta = Self::meta_for(page);
            page.set_header_field("meta", meta);
            Ok::<(), Infallible>(())
        })?;
        Ok(())
    }
}

// ============================================================================
// Breadcrumbs
// ============================================================================

/// `breadcrumbs` ← `[{url, title}]` for the page and each of its ancestors
/// that is itself a page, root first.
#[derive(Debug, Clone)]
pub struct Breadcrumbs {
    pub concurrency: usize,
}

impl Task for Breadcrumbs {
    fn name(&self) -> &'static str {
        "breadcrumbs"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        let titles = title_table(model);
        process_pages(model, self.concurrency, all_pages, |page| {
            let crumbs: Vec<Value> = parent_urls(page.url())
                .into_iter()
                .filter_map(|url| {
                    let title = titles.get(&url)?.clone().unwrap_or_default();
                    Some(json!({"url": url, "title": title}))
                })
                .collect();
            page.set_breadcrumbs(Value::Array(crumbs));
            Ok::<(), Infallible>(())
        })?;
        Ok(())
    }
}

// ============================================================================
// Search meta
// ============================================================================

/// `meta` ← breadcrumbs and indexed fields for the site search service.
///
/// Unlike [`Breadcrumbs`], every ancestor url is listed; `title` is present
/// only for ancestors that are titled pages.
#[derive(Debug, Clone)]
pub struct SearchMeta {
    pub concurrency: usize,
}

impl Task for SearchMeta {
    fn name(&self) -> &'static str {
        "search meta"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        let titles = title_table(model);
        process_pages(model, self.concurrency, all_pages, |page| {
            let breadcrumbs: Vec<Value> = parent_urls(page.url())
                .into_iter()
                .map(|url| {
                    let title = titles.get(&url).cloned().flatten();
                    let mut crumb = Map::new();
                    crumb.insert("url".to_string(), Value::String(url));
                    if let Some(title) = title {
                        crumb.insert("title".to_string(), Value::String(title));
                    }
                    Value::Object(crumb)
                })
                .collect();
            let keywords: Vec<&str> = page.tags();
            let meta = json!({
                "breadcrumbs": breadcrumbs,
                "fields": {"type": "doc", "keywords": keywords},
            });
            page.set_meta(meta);
            Ok::<(), Infallible>(())
        })?;
        Ok(())
    }
}
