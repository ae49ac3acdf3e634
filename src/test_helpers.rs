//! Shared test utilities for the docsite test suite.
//!
//! Pages are written inline as JSON, the way they appear in a manifest:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut model = model_of(json!([
//!     {"url": "/", "title": "Home"},
//!     {"url": "/docs", "sourceUrl": "docs/README.md"},
//! ]));
//! model.normalize();
//!
//! assert_eq!(page_urls(&model), vec!["/", "/docs"]);
//! assert_eq!(find_page(&model, "/").title(), Some("Home"));
//! ```

use crate::model::Model;
use crate::page::PageRecord;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

// =========================================================================
// Fixture construction
// =========================================================================

/// Build page records from a JSON array. Panics on malformed pages.
pub fn pages(value: Value) -> Vec<PageRecord> {
    let Value::Array(items) = value else {
        panic!("expected a JSON array of pages, got: {value}");
    };
    items
        .into_iter()
        .map(|item| {
            PageRecord::from_value(item.clone())
                .unwrap_or_else(|err| panic!("bad fixture page {item}: {err}"))
        })
        .collect()
}

/// A model holding exactly these pages, with an empty change log.
pub fn model_of(value: Value) -> Model {
    let mut model = Model::new();
    model
        .set_pages(pages(value))
        .unwrap_or_else(|err| panic!("bad fixture model: {err}"));
    model
}

/// Write `value` as pretty JSON to `dir/name` and return the path.
pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

// =========================================================================
// Lookups and extractors
// =========================================================================

/// Find a page by url. Panics if not found.
pub fn find_page<'a>(model: &'a Model, url: &str) -> &'a PageRecord {
    model.find(url).unwrap_or_else(|| {
        let urls = page_urls(model);
        panic!("page '{url}' not found. Available: {urls:?}")
    })
}

/// All page urls in model order.
pub fn page_urls(model: &Model) -> Vec<&str> {
    model.pages().iter().map(|p| p.url()).collect()
}
