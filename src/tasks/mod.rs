//! Pipeline tasks.
//!
//! A task is one step of the build: it takes the model, reads and writes
//! page fields (and files in the content cache), and leaves the merge logic
//! alone. The build runs a fixed list of tasks in order (see
//! [`crate::pipeline`]).
//!
//! Per-page work goes through [`process_pages`], which fans out over a
//! dedicated rayon pool sized by `processing.concurrency`. Each worker gets
//! exclusive `&mut` access to one page, so results are written straight back
//! onto the record and the page list itself never changes shape mid-batch.
//! The first failure stops the batch and names the page it came from.

mod docs;
mod lifecycle;
mod page;
mod sitemap;

pub use docs::{LoadSourcesFromLocal, TransformMdToHtml};
pub use lifecycle::{MergeModels, NormalizeModel, Publish, SaveModel, matches_pattern};
pub use page::{Breadcrumbs, HeaderMeta, HeaderTitle, SearchMeta, parent_urls};
pub use sitemap::{Sitemap, SitemapError, render_sitemap};

use crate::model::{Model, ModelError};
use crate::page::PageRecord;
use rayon::prelude::*;
use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use thiserror::Error;

/// Boxed error from a single page's work.
pub type PageFailure = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("page {url}: {source}")]
    Page { url: String, source: PageFailure },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Sitemap(#[from] SitemapError),
}

pub trait Task {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn run(&self, model: &mut Model) -> Result<(), TaskError>;
}

/// Run one task with timing logs.
pub fn run_task(task: &dyn Task, model: &mut Model) -> Result<(), TaskError> {
    let started = Instant::now();
    tracing::debug!(task = task.name(), "starting");
    task.run(model)?;
    tracing::info!(
        task = task.name(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "finished"
    );
    Ok(())
}

/// Apply `f` to every page matching `predicate`, at most `concurrency` at a
/// time. Returns how many pages were processed.
///
/// Pages are visited in no particular order. On the first error the batch
/// stops scheduling new pages and the error is returned tagged with that
/// page's url; pages already in flight may still finish.
pub fn process_pages<P, F, E>(
    model: &mut Model,
    concurrency: usize,
    predicate: P,
    f: F,
) -> Result<usize, TaskError>
where
    P: Fn(&PageRecord) -> bool + Sync,
    F: Fn(&mut PageRecord) -> Result<(), E> + Sync,
    E: Into<PageFailure>,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()?;
    let processed = AtomicUsize::new(0);

    pool.install(|| {
        model
            .pages_mut()
            .par_iter_mut()
            .filter(|page| predicate(page))
            .try_for_each(|page| {
                f(page).map_err(|err| TaskError::Page {
                    url: page.url().to_string(),
                    source: err.into(),
                })?;
                processed.fetch_add(1, Ordering::Relaxed);
                Ok::<(), TaskError>(())
            })
    })?;

    Ok(processed.into_inner())
}
