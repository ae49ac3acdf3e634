//! End-to-end builds of a small documentation project.
//!
//! Each test lays out a project in a temp dir (config, manifest, markdown
//! sources), runs the same pipeline the `build` command runs, and inspects
//! the published tree and the saved model.

use docsite::cache::CacheStats;
use docsite::config::load_config;
use docsite::model::{Model, ModelError};
use docsite::pipeline::{self, BuildContext};
use docsite::tasks::TaskError;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
[processing]
concurrency = 4

[sitemap]
hosts = ["https://docs.acme.dev"]
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn write_manifest(root: &Path, pages: Value) {
    write(root, "pages.json", &serde_json::to_string_pretty(&pages).unwrap());
}

fn manifest() -> Value {
    json!([
        {"url": "/", "title": "Acme Docs", "sourceUrl": "docs/README.md"},
        {"url": "/guide", "title": "Guide", "sourceUrl": "docs/guide.md", "tags": ["intro", "setup"]},
        {"url": "/guide/api", "title": "API", "sourceUrl": "docs/api/README.md"},
        {"url": "/draft", "title": "Draft", "sourceUrl": "docs/draft.md", "published": false}
    ])
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "config.toml", CONFIG);
    write(root, "docs/README.md", "# Acme\n\nRead the [guide](guide.md#setup).\n");
    write(
        root,
        "docs/guide.md",
        "# Guide\n\n## Setup\n\nSee the [API](api/) or go [home](README.md).\n\n\
         Source on [GitHub](https://github.com/acme/docs).\n",
    );
    write(root, "docs/api/README.md", "# API\n\n## Errors\n\n## Errors\n");
    write(root, "docs/draft.md", "# Draft\n");
    write_manifest(root, manifest());
    tmp
}

fn context(root: &Path) -> BuildContext {
    let config = load_config(root).unwrap();
    BuildContext::new(root, Path::new("pages.json"), config)
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path.as_ref())
        .unwrap_or_else(|err| panic!("reading {}: {err}", path.as_ref().display()))
}

// =========================================================================
// First build
// =========================================================================

#[test]
fn first_build_publishes_rendered_pages() {
    let tmp = project();
    let ctx = context(tmp.path());
    let report = pipeline::build(&ctx).unwrap();

    assert_eq!(report.changes.added().len(), 4);
    assert_eq!(report.pages, 4);
    assert_eq!(report.published, 3);
    assert_eq!(report.render, CacheStats { hits: 0, misses: 4 });

    let dist = &ctx.output_dir;
    assert!(dist.join("index.html").exists());
    assert!(dist.join("guide/index.html").exists());
    assert!(dist.join("guide/api/index.html").exists());
    assert!(!dist.join("guide/index.md").exists());
    assert!(!dist.join("model.json").exists());
}

#[test]
fn links_to_sources_point_at_site_pages() {
    let tmp = project();
    let ctx = context(tmp.path());
    pipeline::build(&ctx).unwrap();

    let home = read(ctx.output_dir.join("index.html"));
    assert!(home.contains(r#"href="/guide#setup""#), "{home}");

    let guide = read(ctx.output_dir.join("guide/index.html"));
    assert!(guide.contains(r#"<h2 id="setup">"#), "{guide}");
    assert!(guide.contains(r#"href="/guide/api""#), "{guide}");
    assert!(guide.contains(r#"href="/""#), "{guide}");
    assert!(guide.contains(r#"href="https://github.com/acme/docs""#));

    let api = read(ctx.output_dir.join("guide/api/index.html"));
    assert!(api.contains(r#"id="errors""#));
    assert!(api.contains(r#"id="errors-1""#));
}

#[test]
fn saved_model_carries_decorations() {
    let tmp = project();
    let ctx = context(tmp.path());
    pipeline::build(&ctx).unwrap();

    let model = Model::load(&ctx.model_path()).unwrap();
    let api = model.find("/guide/api").unwrap();
    assert_eq!(api.content_file(), Some("guide/api/index.html"));
    assert_eq!(
        api.get("breadcrumbs"),
        Some(&json!([
            {"url": "/", "title": "Acme Docs"},
            {"url": "/guide", "title": "Guide"},
            {"url": "/guide/api", "title": "API"}
        ]))
    );

    let guide = model.find("/guide").unwrap();
    let header = guide.get("header").unwrap();
    assert_eq!(header["title"], json!("Guide"));
    assert_eq!(header["meta"]["keywords"], json!("intro, setup"));
    assert_eq!(guide.get("meta").unwrap()["fields"]["keywords"], json!(["intro", "setup"]));
    assert_eq!(guide.view(), "index");
    assert_eq!(model.changes().added().len(), 4);
}

#[test]
fn sitemap_lists_published_pages() {
    let tmp = project();
    let ctx = context(tmp.path());
    let report = pipeline::build(&ctx).unwrap();

    assert_eq!(report.sitemap_entries, 3);
    let xml = read(ctx.output_dir.join("sitemap.xml"));
    assert!(xml.contains("<loc>https://docs.acme.dev/</loc>"));
    assert!(xml.contains("<loc>https://docs.acme.dev/guide/api</loc>"));
    assert!(!xml.contains("/draft"));
}

// =========================================================================
// Rebuilds
// =========================================================================

#[test]
fn rebuild_reuses_rendered_html() {
    let tmp = project();
    let ctx = context(tmp.path());
    pipeline::build(&ctx).unwrap();

    let report = pipeline::build(&ctx).unwrap();
    assert!(!report.changes.has_changes(), "{}", report.changes);
    assert_eq!(report.render, CacheStats { hits: 4, misses: 0 });

    let model = Model::load(&ctx.model_path()).unwrap();
    assert!(model.find("/guide").unwrap().get("breadcrumbs").is_some());
}

#[test]
fn no_cache_rebuild_renders_everything() {
    let tmp = project();
    let mut ctx = context(tmp.path());
    pipeline::build(&ctx).unwrap();

    ctx.use_render_cache = false;
    let report = pipeline::build(&ctx).unwrap();
    assert_eq!(report.render, CacheStats { hits: 0, misses: 4 });
}

#[test]
fn manifest_edits_show_up_as_changes() {
    let tmp = project();
    let ctx = context(tmp.path());
    pipeline::build(&ctx).unwrap();

    write(tmp.path(), "docs/faq.md", "# FAQ\n");
    let mut pages = manifest();
    let list = pages.as_array_mut().unwrap();
    list.retain(|p| p["url"] != "/draft");
    list.push(json!({"url": "/faq", "title": "FAQ", "sourceUrl": "docs/faq.md"}));
    write_manifest(tmp.path(), pages);

    let report = pipeline::build(&ctx).unwrap();
    let added: Vec<&str> = report.changes.added().iter().map(|c| c.url.as_str()).collect();
    let removed: Vec<&str> = report.changes.removed().iter().map(|c| c.url.as_str()).collect();
    assert_eq!(added, vec!["/faq"]);
    assert!(report.changes.modified().is_empty());
    assert_eq!(removed, vec!["/draft"]);

    let model = Model::load(&ctx.model_path()).unwrap();
    let urls: Vec<&str> = model.pages().iter().map(|p| p.url()).collect();
    assert_eq!(urls, vec!["/", "/guide", "/guide/api", "/faq"]);
    assert!(ctx.output_dir.join("faq/index.html").exists());
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn duplicate_urls_fail_the_build() {
    let tmp = project();
    write_manifest(tmp.path(), json!([{"url": "/a"}, {"url": "/a"}]));
    let ctx = context(tmp.path());

    let err = pipeline::build(&ctx).unwrap_err();
    assert!(
        matches!(err, TaskError::Model(ModelError::DuplicateUrl { ref url, .. }) if url == "/a"),
        "{err}"
    );
    assert!(!ctx.model_path().exists());
}

#[test]
fn missing_source_drops_the_page() {
    let tmp = project();
    let mut pages = manifest();
    pages
        .as_array_mut()
        .unwrap()
        .push(json!({"url": "/ghost", "sourceUrl": "docs/ghost.md"}));
    write_manifest(tmp.path(), pages);
    let ctx = context(tmp.path());

    let report = pipeline::build(&ctx).unwrap();
    assert_eq!(report.pages, 4);
    let added: Vec<&str> = report.changes.added().iter().map(|c| c.url.as_str()).collect();
    assert_eq!(added, vec!["/", "/guide", "/guide/api", "/draft"]);
    assert!(report.changes.removed().is_empty());

    let again = pipeline::build(&ctx).unwrap();
    assert!(!again.changes.has_changes(), "{}", again.changes);
}

#[test]
fn deleted_source_reports_page_removed() {
    let tmp = project();
    let ctx = context(tmp.path());
    pipeline::build(&ctx).unwrap();

    fs::remove_file(tmp.path().join("docs/draft.md")).unwrap();
    let report = pipeline::build(&ctx).unwrap();
    let removed: Vec<&str> = report.changes.removed().iter().map(|c| c.url.as_str()).collect();
    assert_eq!(removed, vec!["/draft"]);
    assert!(report.changes.added().is_empty());

    let third = pipeline::build(&ctx).unwrap();
    assert!(!third.changes.has_changes(), "{}", third.changes);
}

#[test]
fn merge_only_saves_model_without_publishing() {
    let tmp = project();
    let ctx = context(tmp.path());
    let model = pipeline::merge(&ctx).unwrap();

    assert_eq!(model.pages().len(), 4);
    assert!(ctx.model_path().exists());
    assert!(!ctx.output_dir.exists());
}
