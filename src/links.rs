//! Link override resolution.
//!
//! Documentation is usually written in a repository and links to sibling
//! documents by their repository paths (`../api/README.md`) or by their
//! GitHub URLs. Once published, those targets live at site URLs instead.
//! Pages record where their content came from in `sourceUrl`; this module
//! uses that to map a link target back to the site page built from it.
//!
//! Resolution of one `href` inside a page:
//!
//! 1. Anchors (`#section`) and non-http absolute links (`mailto:`, `git://`)
//!    are left alone.
//! 2. Relative targets are resolved against the page's own `sourceUrl`.
//! 3. The candidates are looked up in the `sourceUrl → url` map, then among
//!    the site's own page urls. The first hit wins; a `#fragment` is kept.

use crate::page::PageRecord;
use std::collections::HashMap;
use url::{ParseError, Url};

const README_SUFFIX: &str = "/readme.md";

/// True for `http://` and `https://` URLs.
pub fn is_absolute_http_url(href: &str) -> bool {
    Url::parse(href).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// True for absolute URLs with any scheme other than http(s).
pub fn has_unsupported_protocol(href: &str) -> bool {
    Url::parse(href).is_ok_and(|u| !matches!(u.scheme(), "http" | "https"))
}

/// True for fragment-only links.
pub fn is_anchor(href: &str) -> bool {
    href.starts_with('#')
}

pub fn is_github_url(href: &str) -> bool {
    Url::parse(href).is_ok_and(|u| u.host_str() == Some("github.com"))
}

/// True when `href` is a relative link to one of the site's own pages.
///
/// A trailing slash is ignored: `/url1/` matches a page at `/url1`.
pub fn is_native_website_url(href: &str, page_urls: &[String]) -> bool {
    if !matches!(Url::parse(href), Err(ParseError::RelativeUrlWithoutBase)) {
        return false;
    }
    let path = strip_query_and_fragment(href);
    let trimmed = trim_trailing_slash(path);
    page_urls.iter().any(|url| url == path || url == trimmed)
}

/// Urls of all pages, in model order.
pub fn create_page_urls(pages: &[PageRecord]) -> Vec<String> {
    pages.iter().map(|p| p.url().to_string()).collect()
}

/// Map every published page's `sourceUrl` to its `url`.
///
/// Sources ending in `/README.md` are also reachable by their directory,
/// since repositories link to folders as often as to their readmes. When
/// two pages share a source, the first one wins.
pub fn create_source_urls_map(pages: &[PageRecord]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for page in pages.iter().filter(|p| p.is_published()) {
        let Some(source) = page.source_url() else {
            continue;
        };
        map.entry(source.to_string())
            .or_insert_with(|| page.url().to_string());
        if let Some(dir) = strip_readme(source) {
            map.entry(dir.to_string())
                .or_insert_with(|| page.url().to_string());
        }
    }
    map
}

/// First variant known as a source, else first variant that is a page url.
pub fn find_replacement(
    variants: &[String],
    source_urls: &HashMap<String, String>,
    page_urls: &[String],
) -> Option<String> {
    variants
        .iter()
        .find_map(|v| source_urls.get(v).cloned())
        .or_else(|| {
            variants
                .iter()
                .find(|v| page_urls.iter().any(|u| u == *v))
                .cloned()
        })
}

/// Resolves link targets for every page of one model.
#[derive(Debug, Clone, Default)]
pub struct LinkResolver {
    source_urls: HashMap<String, String>,
    page_urls: Vec<String>,
}

impl LinkResolver {
    pub fn new(pages: &[PageRecord]) -> Self {
        Self {
            source_urls: create_source_urls_map(pages),
            page_urls: create_page_urls(pages),
        }
    }

    /// Sorted `(sourceUrl, url)` pairs, for cache keys.
    pub fn table(&self) -> Vec<(&str, &str)> {
        let mut table: Vec<(&str, &str)> = self
            .source_urls
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        table.sort_unstable();
        table
    }

    /// Site URL for `href` found in a page whose source is `source_url`,
    /// or `None` when the link should stay as written.
    pub fn resolve(&self, href: &str, source_url: Option<&str>) -> Option<String> {
        if href.is_empty() || is_anchor(href) || has_unsupported_protocol(href) {
            return None;
        }
        let (target, fragment) = match href.split_once('#') {
            Some((target, fragment)) => (target, Some(fragment)),
            None => (href, None),
        };

        let variants = candidate_variants(target, source_url);
        let replacement = find_replacement(&variants, &self.source_urls, &self.page_urls)?;
        match fragment {
            Some(f) if !f.is_empty() => Some(format!("{replacement}#{f}")),
            _ => Some(replacement),
        }
    }
}

/// Candidate spellings of a link target, most specific first.
fn candidate_variants(target: &str, source_url: Option<&str>) -> Vec<String> {
    let mut variants = Vec::new();
    let mut push = |v: String| {
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    };

    let is_relative = matches!(Url::parse(target), Err(ParseError::RelativeUrlWithoutBase));
    if is_relative && let Some(source) = source_url {
        if let Some(resolved) = resolve_against_source(target, source) {
            push(trim_trailing_slash(&resolved).to_string());
            push(resolved);
        }
    }

    let target = strip_query_and_fragment(target);
    push(trim_trailing_slash(target).to_string());
    push(target.to_string());
    variants
}

/// Join a relative target onto the page's source location.
///
/// Absolute http sources resolve to absolute URLs. Repository-relative
/// sources resolve to paths; both the `/`-rooted and bare spellings are
/// tried by the caller's map lookups, so the bare spelling is returned when
/// the source was written bare.
fn resolve_against_source(target: &str, source: &str) -> Option<String> {
    if is_absolute_http_url(source) {
        let joined = Url::parse(source).ok()?.join(target).ok()?;
        return Some(without_fragment(joined).to_string());
    }
    let base = Url::parse("file:///").ok()?.join(source).ok()?;
    let joined = base.join(target).ok()?;
    let path = joined.path();
    if source.starts_with('/') {
        Some(path.to_string())
    } else {
        Some(path.trim_start_matches('/').to_string())
    }
}

fn without_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url.set_query(None);
    url
}

fn strip_readme(source: &str) -> Option<&str> {
    let split = source.len().checked_sub(README_SUFFIX.len())?;
    let (dir, suffix) = (source.get(..split)?, source.get(split..)?);
    suffix.eq_ignore_ascii_case(README_SUFFIX).then_some(dir)
}

fn strip_query_and_fragment(href: &str) -> &str {
    href.split(['?', '#']).next().unwrap_or(href)
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" if path.starts_with('/') => "/",
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::pages;
    use serde_json::json;

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn absolute_http_urls() {
        assert!(is_absolute_http_url("http://some-website.com"));
        assert!(is_absolute_http_url("https://some-website.com"));
        assert!(!is_absolute_http_url("git://some-website.com"));
        assert!(!is_absolute_http_url("../some-website.com"));
    }

    #[test]
    fn unsupported_protocols() {
        assert!(has_unsupported_protocol("git://some-website.com"));
        assert!(has_unsupported_protocol("mailto:team@example.com"));
        assert!(!has_unsupported_protocol("http://some-website.com"));
        assert!(!has_unsupported_protocol("../some-website.com"));
    }

    #[test]
    fn anchors() {
        assert!(is_anchor("#some-anchor"));
        assert!(!is_anchor("http://some-website.com#some-anchor"));
        assert!(!is_anchor("../some-website.com#some-anchor"));
    }

    #[test]
    fn github_urls() {
        assert!(is_github_url("https://github.com/some-org/some-user"));
        assert!(!is_github_url("https://some-website.com/some-org/some-user"));
        assert!(!is_github_url("/some-org"));
    }

    #[test]
    fn native_website_urls() {
        let urls = vec!["/url1".to_string()];
        assert!(is_native_website_url("/url1", &urls));
        assert!(is_native_website_url("/url1/", &urls));
        assert!(is_native_website_url("/url1#part", &urls));
        assert!(!is_native_website_url("http://some-website.com", &urls));
        assert!(!is_native_website_url("/url2", &urls));
    }

    #[test]
    fn root_is_native_when_present() {
        let urls = vec!["/".to_string()];
        assert!(is_native_website_url("/", &urls));
    }

    // =========================================================================
    // Maps
    // =========================================================================

    #[test]
    fn page_urls_in_order() {
        let p = pages(json!([{"url": "/url1"}, {"url": "/url2"}]));
        assert_eq!(create_page_urls(&p), vec!["/url1", "/url2"]);
    }

    #[test]
    fn source_map_keys_sources_to_urls() {
        let p = pages(json!([
            {"url": "/url1", "sourceUrl": "/sourceUrl1", "published": true},
            {"url": "/url2", "sourceUrl": "/sourceUrl2", "published": true}
        ]));
        let map = create_source_urls_map(&p);
        assert_eq!(map.get("/sourceUrl1").map(String::as_str), Some("/url1"));
        assert_eq!(map.get("/sourceUrl2").map(String::as_str), Some("/url2"));
    }

    #[test]
    fn source_map_skips_pages_without_source() {
        let p = pages(json!([
            {"url": "/url1", "sourceUrl": "/sourceUrl1", "published": true},
            {"url": "/url2", "published": true}
        ]));
        assert_eq!(create_source_urls_map(&p).len(), 1);
    }

    #[test]
    fn source_map_skips_unpublished_pages() {
        let p = pages(json!([
            {"url": "/url1", "sourceUrl": "/sourceUrl1", "published": true},
            {"url": "/url2", "sourceUrl": "/sourceUrl2", "published": false}
        ]));
        let map = create_source_urls_map(&p);
        assert!(map.contains_key("/sourceUrl1"));
        assert!(!map.contains_key("/sourceUrl2"));
    }

    #[test]
    fn source_map_indexes_readme_directory() {
        let p = pages(json!([{"url": "/url2", "sourceUrl": "/sourceUrl2/README.md"}]));
        let map = create_source_urls_map(&p);
        assert_eq!(map.get("/sourceUrl2").map(String::as_str), Some("/url2"));
        assert_eq!(
            map.get("/sourceUrl2/README.md").map(String::as_str),
            Some("/url2")
        );
    }

    // =========================================================================
    // find_replacement
    // =========================================================================

    fn fixture() -> (HashMap<String, String>, Vec<String>) {
        let p = pages(json!([
            {"url": "/url1", "sourceUrl": "/sourceUrl1", "published": true},
            {"url": "/url2", "sourceUrl": "/sourceUrl2/README.md", "published": true}
        ]));
        (create_source_urls_map(&p), create_page_urls(&p))
    }

    #[test]
    fn replacement_from_source_map() {
        let (map, urls) = fixture();
        let found = find_replacement(&["/sourceUrl1".to_string()], &map, &urls);
        assert_eq!(found.as_deref(), Some("/url1"));
    }

    #[test]
    fn replacement_from_source_map_by_alternate_key() {
        let (map, urls) = fixture();
        let found = find_replacement(&["/sourceUrl2".to_string()], &map, &urls);
        assert_eq!(found.as_deref(), Some("/url2"));
    }

    #[test]
    fn replacement_from_page_urls() {
        let (map, urls) = fixture();
        let found = find_replacement(&["/url1".to_string()], &map, &urls);
        assert_eq!(found.as_deref(), Some("/url1"));
    }

    #[test]
    fn no_replacement_found() {
        let (map, urls) = fixture();
        assert!(find_replacement(&["/non-existed".to_string()], &map, &urls).is_none());
    }

    // =========================================================================
    // LinkResolver
    // =========================================================================

    fn resolver() -> LinkResolver {
        LinkResolver::new(&pages(json!([
            {
                "url": "/docs/intro",
                "sourceUrl": "https://github.com/acme/lib/blob/master/docs/intro/README.md"
            },
            {
                "url": "/docs/api",
                "sourceUrl": "https://github.com/acme/lib/blob/master/docs/api.md"
            },
            {"url": "/local", "sourceUrl": "guides/local.md"},
            {"url": "/guide", "sourceUrl": "guides/guide/README.md"}
        ])))
    }

    #[test]
    fn resolves_relative_link_against_github_source() {
        let r = resolver();
        let source = Some("https://github.com/acme/lib/blob/master/docs/intro/README.md");
        assert_eq!(r.resolve("../api.md", source).as_deref(), Some("/docs/api"));
    }

    #[test]
    fn keeps_fragment() {
        let r = resolver();
        let source = Some("https://github.com/acme/lib/blob/master/docs/intro/README.md");
        assert_eq!(
            r.resolve("../api.md#methods", source).as_deref(),
            Some("/docs/api#methods")
        );
    }

    #[test]
    fn resolves_absolute_github_link() {
        let r = resolver();
        assert_eq!(
            r.resolve("https://github.com/acme/lib/blob/master/docs/intro/README.md", None)
                .as_deref(),
            Some("/docs/intro")
        );
        assert_eq!(
            r.resolve("https://github.com/acme/lib/blob/master/docs/intro/", None)
                .as_deref(),
            Some("/docs/intro")
        );
    }

    #[test]
    fn resolves_relative_link_against_repository_path() {
        let r = resolver();
        assert_eq!(
            r.resolve("guide/README.md", Some("guides/local.md")).as_deref(),
            Some("/guide")
        );
        assert_eq!(
            r.resolve("./local.md", Some("guides/guide/../x.md")).as_deref(),
            Some("/local")
        );
    }

    #[test]
    fn resolves_site_urls_directly() {
        let r = resolver();
        assert_eq!(r.resolve("/local/", None).as_deref(), Some("/local"));
    }

    #[test]
    fn leaves_anchors_and_foreign_links() {
        let r = resolver();
        assert!(r.resolve("#top", None).is_none());
        assert!(r.resolve("mailto:team@acme.dev", None).is_none());
        assert!(r.resolve("https://example.com/elsewhere", None).is_none());
        assert!(r.resolve("", None).is_none());
    }

    #[test]
    fn table_is_sorted() {
        let r = resolver();
        let table = r.table();
        let mut sorted = table.clone();
        sorted.sort();
        assert_eq!(table, sorted);
        assert!(table.contains(&("guides/guide", "/guide")));
    }
}
