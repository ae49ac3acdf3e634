//! Change log produced by a model merge.
//!
//! Each group keeps entries in the order they were recorded. Groups are
//! append-only: the merge pushes into them, and tasks may push more after
//! the fact (e.g. a page dropped because its source disappeared). The one
//! exception is [`ChangeSet::withdraw_added`], for a page added and dropped
//! within the same build.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity a change refers to.
///
/// Only pages are tracked today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Page,
}

/// One change entry, serialized as `{"type": "page", "url": "/x"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub url: String,
}

impl Change {
    pub fn page(url: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Page,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSet {
    added: Vec<Change>,
    modified: Vec<Change>,
    removed: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_change_to_added_group(&mut self, url: impl Into<String>) {
        self.added.push(Change::page(url));
    }

    pub fn push_change_to_modified_group(&mut self, url: impl Into<String>) {
        self.modified.push(Change::page(url));
    }

    pub fn push_change_to_removed_group(&mut self, url: impl Into<String>) {
        self.removed.push(Change::page(url));
    }

    /// Forget an `added` entry for `url`. Returns whether one was there.
    pub fn withdraw_added(&mut self, url: &str) -> bool {
        let before = self.added.len();
        self.added.retain(|c| c.url != url);
        self.added.len() != before
    }

    pub fn added(&self) -> &[Change] {
        &self.added
    }

    pub fn modified(&self) -> &[Change] {
        &self.modified
    }

    pub fn removed(&self) -> &[Change] {
        &self.removed
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.removed.is_empty()
    }

    /// Total number of entries across all groups.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }

    /// Append every entry of `other`, group by group.
    pub fn extend(&mut self, other: ChangeSet) {
        self.added.extend(other.added);
        self.modified.extend(other.modified);
        self.removed.extend(other.removed);
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_changes() {
            return write!(f, "no changes");
        }
        write!(
            f,
            "{} added, {} modified, {} removed",
            self.added.len(),
            self.modified.len(),
            self.removed.len()
        )
    }
}
