//! GitHub-style heading slugs.
//!
//! Heading ids follow the scheme GitHub uses for README anchors, so links
//! written against a document on GitHub (`README.md#getting-started`) keep
//! working once the document is published on the site:
//!
//! - `"Getting Started"` → `"getting-started"`
//! - `"What's new?"` → `"whats-new"`
//! - `"API (v2)"` → `"api-v2"`
//!
//! Repeated headings within one document get numeric suffixes: the second
//! `"Usage"` becomes `"usage-1"`, the third `"usage-2"`.

use std::collections::HashMap;

/// Slug generator for one document. Create a fresh one per page.
#[derive(Debug, Default)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique slug for `text` within this document.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut slug = base.clone();
        while self.occurrences.contains_key(&slug) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            slug = format!("{base}-{count}");
        }
        self.occurrences.insert(slug.clone(), 0);
        slug
    }

    /// Mark `id` as taken, so later generated slugs avoid it.
    pub fn reserve(&mut self, id: &str) {
        self.occurrences.entry(id.to_string()).or_insert(0);
    }

    pub fn reset(&mut self) {
        self.occurrences.clear();
    }
}

/// Slug of `text` without de-duplication.
pub fn slugify(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}
