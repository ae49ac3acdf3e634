//! The page model: an ordered page collection plus its change log.
//!
//! The model is the one piece of state that flows through the whole
//! pipeline. It is populated by [`Model::merge`] (old persisted pages vs. the
//! freshly declared ones), decorated in place by every task, then written
//! back to disk.
//!
//! Decorations are derived fields, so they are never diffed. Next to the
//! decorated pages the model keeps the merged records exactly as declared
//! ([`Model::declared`]); that list is what the next build merges against.
//!
//! ## Merge semantics
//!
//! Pages are keyed by `url`. Given `old` and `new` collections:
//!
//! - url only in `new` → **added**, new record appended
//! - url in both, records deep-equal → unchanged, the **old** record is kept
//! - url in both, records differ → **modified**, new record takes the old slot
//! - url only in `old` → **removed**, record dropped
//!
//! Survivors keep their `old` order; added pages follow in `new` order:
//!
//! ```text
//! old: /url1 /url2 /url3
//! new: /url1 /url3' /url4
//! ───────────────────────
//! out: /url1 /url3' /url4      added [/url4]  modified [/url3]  removed [/url2]
//! ```
//!
//! Each input must be unique by url. A duplicate is reported as
//! [`ModelError::DuplicateUrl`] before anything is committed.
//!
//! ## Persistence
//!
//! The model file is `{"pages": [...], "changes": {...}, "declared": [...]}`.
//! Loading also accepts a bare page array, which is the manifest format; a
//! file without `declared` uses its `pages` in that role.

use crate::changes::ChangeSet;
use crate::page::{PageError, PageRecord};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid page at index {index}: {source}")]
    InvalidPage { index: usize, source: PageError },
    #[error("Duplicate url {url} in {collection} pages")]
    DuplicateUrl {
        url: String,
        collection: &'static str,
    },
    #[error("Model file must be a page array or an object with \"pages\"")]
    NotAPageList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Model {
    pages: Vec<PageRecord>,
    changes: ChangeSet,
    /// Pages as merged, before any task touched them.
    declared: Vec<PageRecord>,
}

impl Model {
    /// An empty model: no pages, no changes.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    /// Mutable access to the pages, without the ability to add or drop any.
    pub fn pages_mut(&mut self) -> &mut [PageRecord] {
        &mut self.pages
    }

    pub fn into_pages(self) -> Vec<PageRecord> {
        self.pages
    }

    /// The merge baseline for the next build.
    pub fn declared(&self) -> &[PageRecord] {
        &self.declared
    }

    pub fn find(&self, url: &str) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.url() == url)
    }

    /// Replace the page collection wholesale.
    ///
    /// The change log is left as is.
    pub fn set_pages(&mut self, pages: Vec<PageRecord>) -> Result<&mut Self, ModelError> {
        index_by_url(&pages, "model")?;
        self.declared = pages.clone();
        self.pages = pages;
        Ok(self)
    }

    /// Drop a page after the fact, from the pages and from the baseline.
    ///
    /// A page added by this build's merge just loses its `added` entry;
    /// any other page is logged as removed.
    pub fn remove_page(&mut self, url: &str) -> Option<PageRecord> {
        let pos = self.pages.iter().position(|p| p.url() == url)?;
        let page = self.pages.remove(pos);
        self.declared.retain(|p| p.url() != url);
        if !self.changes.withdraw_added(url) {
            self.changes.push_change_to_removed_group(url);
        }
        Some(page)
    }

    // =========================================================================
    // Change log
    // =========================================================================

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        self.changes.has_changes()
    }

    pub fn push_change_to_added_group(&mut self, url: impl Into<String>) {
        self.changes.push_change_to_added_group(url);
    }

    pub fn push_change_to_modified_group(&mut self, url: impl Into<String>) {
        self.changes.push_change_to_modified_group(url);
    }

    pub fn push_change_to_removed_group(&mut self, url: impl Into<String>) {
        self.changes.push_change_to_removed_group(url);
    }

    // =========================================================================
    // Merge / normalize
    // =========================================================================

    /// Merge `old_pages` with `new_pages`; see the [module docs](self).
    ///
    /// On success the page collection is replaced by the merge result and
    /// the classification is appended to the change log. On error the model
    /// is unchanged.
    pub fn merge(
        &mut self,
        old_pages: Vec<PageRecord>,
        new_pages: Vec<PageRecord>,
    ) -> Result<&mut Self, ModelError> {
        let (plan, changes) = {
            let old_index = index_by_url(&old_pages, "old")?;
            let new_index = index_by_url(&new_pages, "new")?;

            let mut plan = Vec::with_capacity(old_pages.len().max(new_pages.len()));
            let mut changes = ChangeSet::new();

            for (i, old) in old_pages.iter().enumerate() {
                match new_index.get(old.url()) {
                    None => changes.push_change_to_removed_group(old.url()),
                    Some(&j) if old.deep_eq(&new_pages[j]) => plan.push(Slot::Old(i)),
                    Some(&j) => {
                        changes.push_change_to_modified_group(old.url());
                        plan.push(Slot::New(j));
                    }
                }
            }

            for (j, new) in new_pages.iter().enumerate() {
                if !old_index.contains_key(new.url()) {
                    changes.push_change_to_added_group(new.url());
                    plan.push(Slot::New(j));
                }
            }

            (plan, changes)
        };

        let mut old_slots: Vec<Option<PageRecord>> = old_pages.into_iter().map(Some).collect();
        let mut new_slots: Vec<Option<PageRecord>> = new_pages.into_iter().map(Some).collect();
        let pages: Vec<PageRecord> = plan
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Old(i) => old_slots[i].take(),
                Slot::New(j) => new_slots[j].take(),
            })
            .collect();

        tracing::debug!(
            added = changes.added().len(),
            modified = changes.modified().len(),
            removed = changes.removed().len(),
            "merged page models"
        );

        self.declared = pages.clone();
        self.pages = pages;
        self.changes.extend(changes);
        Ok(self)
    }

    /// Fill default `aliases`, `view` and `published` on every page.
    pub fn normalize(&mut self) -> &mut Self {
        for page in &mut self.pages {
            page.normalize();
        }
        self
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Load a model file (pages and change log).
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ModelError> {
        let doc = parse_model_document(serde_json::from_str(content)?)?;
        index_by_url(&doc.pages, "model")?;
        let declared = match doc.declared {
            Some(declared) => {
                index_by_url(&declared, "declared")?;
                declared
            }
            None => doc.pages.clone(),
        };
        Ok(Self {
            pages: doc.pages,
            changes: doc.changes,
            declared,
        })
    }

    /// Write the model as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Which input a merged page is taken from.
enum Slot {
    Old(usize),
    New(usize),
}

/// Read just the pages of a manifest or model file.
pub fn read_pages(path: &Path) -> Result<Vec<PageRecord>, ModelError> {
    let content = fs::read_to_string(path)?;
    Ok(parse_model_document(serde_json::from_str(&content)?)?.pages)
}

/// The pages a saved model was merged from, for diffing the next build.
///
/// A missing file (first build) is an empty collection. A file without a
/// `declared` list, such as a manifest, yields its `pages`.
pub fn read_declared_pages_or_empty(path: &Path) -> Result<Vec<PageRecord>, ModelError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    let doc = parse_model_document(serde_json::from_str(&content)?)?;
    Ok(doc.declared.unwrap_or(doc.pages))
}

/// A model file, or a manifest read as one.
struct ModelDocument {
    pages: Vec<PageRecord>,
    changes: ChangeSet,
    declared: Option<Vec<PageRecord>>,
}

fn parse_model_document(value: Value) -> Result<ModelDocument, ModelError> {
    match value {
        Value::Array(pages) => Ok(ModelDocument {
            pages: parse_page_list(pages)?,
            changes: ChangeSet::new(),
            declared: None,
        }),
        Value::Object(mut doc) => {
            let pages = match doc.remove("pages") {
                Some(Value::Array(pages)) => parse_page_list(pages)?,
                None => Vec::new(),
                Some(_) => return Err(ModelError::NotAPageList),
            };
            let changes = match doc.remove("changes") {
                Some(changes) => serde_json::from_value(changes)?,
                None => ChangeSet::new(),
            };
            let declared = match doc.remove("declared") {
                Some(Value::Array(declared)) => Some(parse_page_list(declared)?),
                None => None,
                Some(_) => return Err(ModelError::NotAPageList),
            };
            Ok(ModelDocument {
                pages,
                changes,
                declared,
            })
        }
        _ => Err(ModelError::NotAPageList),
    }
}

fn parse_page_list(values: Vec<Value>) -> Result<Vec<PageRecord>, ModelError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            PageRecord::from_value(value).map_err(|source| ModelError::InvalidPage { index, source })
        })
        .collect()
}

/// Index pages by url, rejecting duplicates.
fn index_by_url<'a>(
    pages: &'a [PageRecord],
    collection: &'static str,
) -> Result<HashMap<&'a str, usize>, ModelError> {
    let mut index = HashMap::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        if index.insert(page.url(), i).is_some() {
            return Err(ModelError::DuplicateUrl {
                url: page.url().to_string(),
                collection,
            });
        }
    }
    Ok(index)
}
