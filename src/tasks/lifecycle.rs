//! Tasks that move the model and the cache tree in and out of the build:
//! merging the declared pages into the persisted model, filling defaults,
//! saving the result, and publishing the cache to the output directory.

use super::{Task, TaskError};
use crate::model::{Model, read_declared_pages_or_empty, read_pages};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use walkdir::WalkDir;

/// Merge the page manifest into the previously persisted model.
///
/// The previous side is the saved model's declared pages, so decorations
/// written by the last build never show up as modifications. A missing
/// previous model counts as empty, so a first build reports every page as
/// added.
#[derive(Debug, Clone)]
pub struct MergeModels {
    pub old_model: PathBuf,
    pub manifest: PathBuf,
}

impl Task for MergeModels {
    fn name(&self) -> &'static str {
        "merge models"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        let old = read_declared_pages_or_empty(&self.old_model)?;
        let new = read_pages(&self.manifest)?;
        tracing::debug!(old = old.len(), new = new.len(), "merging page models");
        model.merge(old, new)?;
        tracing::info!(changes = %model.changes(), "merged models");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeModel;

impl Task for NormalizeModel {
    fn name(&self) -> &'static str {
        "normalize model"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        model.normalize();
        Ok(())
    }
}

/// Persist the model so the next build can diff against it.
#[derive(Debug, Clone)]
pub struct SaveModel {
    pub path: PathBuf,
}

impl Task for SaveModel {
    fn name(&self) -> &'static str {
        "save model"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        model.save(&self.path)?;
        tracing::debug!(path = %self.path.display(), pages = model.pages().len(), "saved model");
        Ok(())
    }
}

/// Copy the content cache into the output directory.
///
/// Files whose name matches one of the `exclude` patterns are skipped (see
/// [`matches_pattern`]). Existing files in the output are overwritten;
/// nothing is deleted.
#[derive(Debug)]
pub struct Publish {
    cache_dir: PathBuf,
    output_dir: PathBuf,
    exclude: Vec<String>,
    copied: AtomicUsize,
}

impl Publish {
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        exclude: Vec<String>,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            output_dir: output_dir.into(),
            exclude,
            copied: AtomicUsize::new(0),
        }
    }

    /// Files copied by the last run.
    pub fn copied(&self) -> usize {
        self.copied.load(Ordering::Relaxed)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.exclude.iter().any(|pattern| matches_pattern(name, pattern))
    }
}

impl Task for Publish {
    fn name(&self) -> &'static str {
        "publish"
    }

    fn run(&self, _model: &mut Model) -> Result<(), TaskError> {
        fs::create_dir_all(&self.output_dir)?;
        let mut copied = 0;

        for entry in WalkDir::new(&self.cache_dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() || self.is_excluded(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.cache_dir) else {
                continue;
            };
            let dest = self.output_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
            copied += 1;
        }

        self.copied.store(copied, Ordering::Relaxed);
        tracing::info!(files = copied, output = %self.output_dir.display(), "published site");
        Ok(())
    }
}

/// Match a file name against an exclude pattern.
///
/// `*.md` matches by suffix, `draft*` by prefix, anything else must be equal.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        name.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        name.starts_with(prefix)
    } else {
        name == pattern
    }
}
