//! # docsite
//!
//! A documentation site builder. The site is declared as a page manifest: a
//! JSON list of page descriptors, each with a `url`, a `sourceUrl` pointing
//! at the document it is built from, and whatever metadata the site wants
//! (`title`, `tags`, ...). The build turns that list into a static tree of
//! HTML pages plus a persisted model of what was built.
//!
//! # Architecture: Model + Tasks
//!
//! All state lives in one [`model::Model`]: the ordered page list and a log
//! of what changed since the previous build. A build is a fixed sequence of
//! tasks, each reading and writing page fields in place:
//!
//! ```text
//! pages.json ─┐
//!             ├─ merge ─ normalize ─ load sources ─ md→html ─ header/breadcrumbs/search meta
//! model.json ─┘                                                              │
//!                                              publish ─ sitemap ─ save model.json
//! ```
//!
//! Keeping the previous model around is what makes builds incremental: the
//! merge reports which pages were added, modified or removed, and unchanged
//! pages keep their previous records exactly.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`page`] | `PageRecord`: url + open field map, well-known field accessors, deep equality |
//! | [`changes`] | `ChangeSet`: added / modified / removed page references |
//! | [`model`] | `Model`: ordered pages + change log, merge, normalize, persistence |
//! | [`tasks`] | The pipeline tasks and the bounded per-page fan-out they share |
//! | [`pipeline`] | Path resolution and the fixed task order for `merge` and `build` |
//! | [`markdown`] | pulldown-cmark rendering with heading anchors and link rewriting |
//! | [`links`] | Link classification and source-url → site-url resolution |
//! | [`slug`] | GitHub-style heading slugs |
//! | [`cache`] | Content cache access and the content-addressed render cache |
//! | [`config`] | `config.toml` loading, defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Open Page Records
//!
//! Pages are not a fixed struct. A manifest can carry any fields and they
//! survive the build untouched; only the handful of fields the tasks use get
//! typed accessors. Equality for the merge is structural over the whole
//! record, so adding a field to a page in the manifest marks it modified.
//!
//! ## Bounded Fan-Out Over Disjoint Pages
//!
//! Per-page tasks run on a rayon pool sized by `processing.concurrency`, each
//! worker holding `&mut` to exactly one page. No locks around pages, no
//! result collection step, and the page order is never disturbed.
//!
//! ## Links Follow Sources
//!
//! Documentation links to other documents by repository path. Since every
//! page records its `sourceUrl`, those links can be pointed at the built
//! pages instead, so the published site never links back to raw markdown.

pub mod cache;
pub mod changes;
pub mod config;
pub mod links;
pub mod markdown;
pub mod model;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod slug;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_helpers;
