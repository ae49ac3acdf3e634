//! The build: a fixed, ordered list of tasks over one model.
//!
//! ```text
//! merge models → normalize → load sources → md→html → header title
//!   → header meta → breadcrumbs → search meta → save model → sitemap → publish
//! ```
//!
//! [`BuildContext`] resolves every path once from the project root and the
//! loaded config; each task gets just the pieces it needs.

use crate::cache::{CacheStats, ContentCache};
use crate::changes::ChangeSet;
use crate::config::SiteConfig;
use crate::model::Model;
use crate::tasks::{
    Breadcrumbs, HeaderMeta, HeaderTitle, LoadSourcesFromLocal, MergeModels, NormalizeModel,
    Publish, SaveModel, SearchMeta, Sitemap, Task, TaskError, TransformMdToHtml, run_task,
};
use std::path::{Path, PathBuf};

/// File name of the persisted model inside the cache directory.
pub const MODEL_FILENAME: &str = "model.json";

/// Resolved locations and settings for one build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Project root; local `sourceUrl`s resolve against it.
    pub root: PathBuf,
    /// Page manifest declaring the site.
    pub manifest: PathBuf,
    pub config: SiteConfig,
    pub cache: ContentCache,
    pub output_dir: PathBuf,
    /// Consult the render cache (`--no-cache` turns this off).
    pub use_render_cache: bool,
}

impl BuildContext {
    /// Relative config paths and `manifest` are taken relative to `root`.
    pub fn new(root: &Path, manifest: &Path, config: SiteConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            manifest: root.join(manifest),
            cache: ContentCache::new(root.join(&config.paths.cache_dir)),
            output_dir: root.join(&config.paths.output_dir),
            config,
            use_render_cache: true,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.cache.root().join(MODEL_FILENAME)
    }

    fn concurrency(&self) -> usize {
        self.config.processing.concurrency
    }
}

/// What a build did, for the CLI summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub changes: ChangeSet,
    pub pages: usize,
    pub published: usize,
    pub render: CacheStats,
    pub sitemap_entries: usize,
    pub files_published: usize,
}

/// Merge the manifest into the persisted model, normalize and save it.
pub fn merge(ctx: &BuildContext) -> Result<Model, TaskError> {
    let mut model = Model::new();
    let tasks: [&dyn Task; 3] = [
        &MergeModels {
            old_model: ctx.model_path(),
            manifest: ctx.manifest.clone(),
        },
        &NormalizeModel,
        &SaveModel {
            path: ctx.model_path(),
        },
    ];
    for task in tasks {
        run_task(task, &mut model)?;
    }
    Ok(model)
}

/// Run the full pipeline.
pub fn build(ctx: &BuildContext) -> Result<BuildReport, TaskError> {
    let concurrency = ctx.concurrency();
    let transform = TransformMdToHtml::new(
        ctx.cache.clone(),
        ctx.config.markdown.clone(),
        ctx.config.links.rewrite,
        concurrency,
        ctx.use_render_cache,
    );
    let sitemap = Sitemap::new(ctx.config.sitemap.clone(), &ctx.output_dir);
    let publish = Publish::new(
        ctx.cache.root(),
        &ctx.output_dir,
        ctx.config.publish.exclude.clone(),
    );

    let tasks: [&dyn Task; 11] = [
        &MergeModels {
            old_model: ctx.model_path(),
            manifest: ctx.manifest.clone(),
        },
        &NormalizeModel,
        &LoadSourcesFromLocal {
            source_root: ctx.root.clone(),
            cache: ctx.cache.clone(),
            concurrency,
        },
        &transform,
        &HeaderTitle { concurrency },
        &HeaderMeta { concurrency },
        &Breadcrumbs { concurrency },
        &SearchMeta { concurrency },
        &SaveModel {
            path: ctx.model_path(),
        },
        &sitemap,
        &publish,
    ];

    let mut model = Model::new();
    for task in tasks {
        run_task(task, &mut model)?;
    }

    Ok(BuildReport {
        changes: model.changes().clone(),
        pages: model.pages().len(),
        published: model.pages().iter().filter(|p| p.is_published()).count(),
        render: transform.stats(),
        sitemap_entries: sitemap.written(),
        files_published: publish.copied(),
    })
}
