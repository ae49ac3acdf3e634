//! Page records: the unit of data flowing through every pipeline stage.
//!
//! A page is an open record keyed by its `url`. A handful of fields have a
//! meaning to the pipeline and get typed accessors; everything else a
//! manifest carries is passed through untouched, so page descriptors can
//! grow new fields without a schema change here.
//!
//! ## Well-known fields
//!
//! | Field         | Type           | Set by                          |
//! |---------------|----------------|---------------------------------|
//! | `url`         | string         | manifest (required, unique)     |
//! | `contentFile` | string         | manifest, source/markdown tasks |
//! | `sourceUrl`   | string         | manifest                        |
//! | `title`       | string         | manifest                        |
//! | `tags`        | list of string | manifest                        |
//! | `aliases`     | list of string | manifest, defaulted by normalize|
//! | `view`        | string         | manifest, defaulted by normalize|
//! | `published`   | bool           | manifest, defaulted by normalize|
//! | `header`      | object         | header tasks                    |
//! | `breadcrumbs` | list           | breadcrumbs task                |
//! | `meta`        | object         | search meta task                |
//!
//! ## Equality
//!
//! Two records are equal when their urls match and every other field is
//! [`deep_equal`]. This is what the model merge uses to tell a modified page
//! from an unchanged one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

pub const FIELD_URL: &str = "url";
pub const FIELD_CONTENT_FILE: &str = "contentFile";
pub const FIELD_SOURCE_URL: &str = "sourceUrl";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_ALIASES: &str = "aliases";
pub const FIELD_VIEW: &str = "view";
pub const FIELD_PUBLISHED: &str = "published";
pub const FIELD_HEADER: &str = "header";
pub const FIELD_BREADCRUMBS: &str = "breadcrumbs";
pub const FIELD_META: &str = "meta";

/// View assigned to pages that don't name one.
pub const DEFAULT_VIEW: &str = "index";

#[derive(Error, Debug, PartialEq)]
pub enum PageError {
    #[error("page must be a JSON object, got: {0}")]
    NotAnObject(Value),
    #[error("page has no \"url\" field")]
    MissingUrl,
    #[error("page \"url\" must be a string, got: {0}")]
    NonStringUrl(Value),
    #[error("\"url\" is the page key and cannot be set as a field")]
    ReservedField,
}

/// One page descriptor.
///
/// Serializes as a flat JSON object with `url` first, followed by the
/// remaining fields in their original order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PageRecord {
    url: String,
    fields: Map<String, Value>,
}

impl PageRecord {
    /// A page with only a url.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fields: Map::new(),
        }
    }

    /// Build a page from an arbitrary JSON value (one manifest entry).
    pub fn from_value(value: Value) -> Result<Self, PageError> {
        match value {
            Value::Object(map) => Self::try_from(map),
            other => Err(PageError::NotAnObject(other)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// All fields except `url`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Set an arbitrary field, returning the previous value.
    ///
    /// The url is the record's identity and is rejected here.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, PageError> {
        let key = key.into();
        if key == FIELD_URL {
            return Err(PageError::ReservedField);
        }
        Ok(self.fields.insert(key, value.into()))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    // =========================================================================
    // Well-known fields
    // =========================================================================

    pub fn content_file(&self) -> Option<&str> {
        self.str_field(FIELD_CONTENT_FILE)
    }

    pub fn set_content_file(&mut self, path: impl Into<String>) {
        self.fields
            .insert(FIELD_CONTENT_FILE.to_string(), Value::String(path.into()));
    }

    pub fn source_url(&self) -> Option<&str> {
        self.str_field(FIELD_SOURCE_URL)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field(FIELD_TITLE)
    }

    /// Tags as strings; non-string entries are skipped, absent means empty.
    pub fn tags(&self) -> Vec<&str> {
        self.str_list(FIELD_TAGS)
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.str_list(FIELD_ALIASES)
    }

    pub fn view(&self) -> &str {
        self.str_field(FIELD_VIEW).unwrap_or(DEFAULT_VIEW)
    }

    /// Pages are published unless explicitly marked `published: false`.
    pub fn is_published(&self) -> bool {
        self.fields
            .get(FIELD_PUBLISHED)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Set one key of the `header` object, replacing a non-object header.
    pub fn set_header_field(&mut self, key: &str, value: Value) {
        let header = self
            .fields
            .entry(FIELD_HEADER)
            .or_insert_with(|| Value::Object(Map::new()));
        if !header.is_object() {
            *header = Value::Object(Map::new());
        }
        if let Value::Object(map) = header {
            map.insert(key.to_string(), value);
        }
    }

    pub fn set_breadcrumbs(&mut self, breadcrumbs: Value) {
        self.fields.insert(FIELD_BREADCRUMBS.to_string(), breadcrumbs);
    }

    pub fn set_meta(&mut self, meta: Value) {
        self.fields.insert(FIELD_META.to_string(), meta);
    }

    /// Fill defaults for `aliases`, `view` and `published`.
    ///
    /// Only absent fields are filled; explicit values (including
    /// `published: false`) are kept, so applying this twice is a no-op.
    pub fn normalize(&mut self) {
        self.fields
            .entry(FIELD_ALIASES)
            .or_insert_with(|| Value::Array(Vec::new()));
        self.fields
            .entry(FIELD_VIEW)
            .or_insert_with(|| Value::String(DEFAULT_VIEW.to_string()));
        self.fields
            .entry(FIELD_PUBLISHED)
            .or_insert(Value::Bool(true));
    }

    /// Structural comparison used by the model merge.
    pub fn deep_eq(&self, other: &PageRecord) -> bool {
        self.url == other.url && maps_equal(&self.fields, &other.fields)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn str_list(&self, key: &str) -> Vec<&str> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl PartialEq for PageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl TryFrom<Map<String, Value>> for PageRecord {
    type Error = PageError;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        match fields.shift_remove(FIELD_URL) {
            Some(Value::String(url)) => Ok(Self { url, fields }),
            Some(other) => Err(PageError::NonStringUrl(other)),
            None => Err(PageError::MissingUrl),
        }
    }
}

impl From<PageRecord> for Map<String, Value> {
    fn from(page: PageRecord) -> Self {
        let mut map = Map::with_capacity(page.fields.len() + 1);
        map.insert(FIELD_URL.to_string(), Value::String(page.url));
        map.extend(page.fields);
        map
    }
}

// =============================================================================
// Deep equality
// =============================================================================

/// Recursive value equality.
///
/// - objects: same key set, values deep-equal (key order ignored)
/// - arrays: same length, elements deep-equal pairwise in order
/// - numbers: compared by numeric value, so `1` equals `1.0`
/// - everything else: same variant and same scalar value
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => maps_equal(x, y),
        _ => false,
    }
}

/// Key-order-insensitive map comparison with [`deep_equal`] values.
pub fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| deep_equal(value, other)))
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: Value) -> PageRecord {
        PageRecord::from_value(value).unwrap()
    }

    // =========================================================================
    // Construction and serialization
    // =========================================================================

    #[test]
    fn from_value_requires_url() {
        assert_eq!(
            PageRecord::from_value(json!({"title": "x"})).unwrap_err(),
            PageError::MissingUrl
        );
    }

    #[test]
    fn from_value_rejects_non_string_url() {
        assert!(matches!(
            PageRecord::from_value(json!({"url": 5})),
            Err(PageError::NonStringUrl(_))
        ));
    }

    #[test]
    fn from_value_rejects_non_object() {
        assert!(matches!(
            PageRecord::from_value(json!(["/url1"])),
            Err(PageError::NotAnObject(_))
        ));
    }

    #[test]
    fn serializes_url_first_and_keeps_field_order() {
        let p = page(json!({"title": "T", "url": "/a", "zeta": 1, "alpha": 2}));
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"url":"/a","title":"T","zeta":1,"alpha":2}"#);
    }

    #[test]
    fn remove_keeps_order_of_remaining_fields() {
        let mut p = page(json!({"url": "/a", "a": 1, "b": 2, "c": 3}));
        p.remove("a");
        let keys: Vec<&String> = p.fields().keys().collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn deserialize_passes_unknown_fields_through() {
        let p: PageRecord =
            serde_json::from_str(r#"{"url": "/a", "custom": {"deep": [1, 2]}}"#).unwrap();
        assert_eq!(p.url(), "/a");
        assert_eq!(p.get("custom"), Some(&json!({"deep": [1, 2]})));
    }

    #[test]
    fn deserialize_without_url_is_error() {
        let result: Result<PageRecord, _> = serde_json::from_str(r#"{"title": "x"}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("url"));
    }

    #[test]
    fn insert_rejects_url() {
        let mut p = PageRecord::new("/a");
        assert_eq!(p.insert("url", "/b"), Err(PageError::ReservedField));
        assert_eq!(p.url(), "/a");
    }

    #[test]
    fn insert_returns_previous_value() {
        let mut p = PageRecord::new("/a");
        assert_eq!(p.insert("title", "one").unwrap(), None);
        assert_eq!(p.insert("title", "two").unwrap(), Some(json!("one")));
        assert_eq!(p.title(), Some("two"));
    }

    // =========================================================================
    // Well-known field accessors
    // =========================================================================

    #[test]
    fn accessor_defaults_for_bare_page() {
        let p = PageRecord::new("/a");
        assert_eq!(p.content_file(), None);
        assert_eq!(p.source_url(), None);
        assert!(p.tags().is_empty());
        assert!(p.aliases().is_empty());
        assert_eq!(p.view(), "index");
        assert!(p.is_published());
    }

    #[test]
    fn tags_skip_non_string_entries() {
        let p = page(json!({"url": "/a", "tags": ["x", 3, "y"]}));
        assert_eq!(p.tags(), vec!["x", "y"]);
    }

    #[test]
    fn explicit_unpublished() {
        let p = page(json!({"url": "/a", "published": false}));
        assert!(!p.is_published());
    }

    #[test]
    fn set_content_file_overwrites() {
        let mut p = page(json!({"url": "/a", "contentFile": "a/index.md"}));
        p.set_content_file("a/index.html");
        assert_eq!(p.content_file(), Some("a/index.html"));
    }

    #[test]
    fn header_fields_accumulate() {
        let mut p = page(json!({"url": "/a"}));
        p.set_header_field("title", json!("A"));
        p.set_header_field("meta", json!({"ogType": "article"}));
        assert_eq!(
            p.get("header"),
            Some(&json!({"title": "A", "meta": {"ogType": "article"}}))
        );
    }

    #[test]
    fn header_field_replaces_non_object_header() {
        let mut p = page(json!({"url": "/a", "header": "legacy"}));
        p.set_header_field("title", json!("A"));
        assert_eq!(p.get("header"), Some(&json!({"title": "A"})));
    }

    // =========================================================================
    // normalize
    // =========================================================================

    #[test]
    fn normalize_fills_defaults() {
        let mut p = PageRecord::new("/url1");
        p.normalize();
        assert_eq!(p.get("aliases"), Some(&json!([])));
        assert_eq!(p.get("view"), Some(&json!("index")));
        assert_eq!(p.get("published"), Some(&json!(true)));
    }

    #[test]
    fn normalize_keeps_explicit_values() {
        let mut p = page(json!({
            "url": "/url1",
            "aliases": ["/url11", "/url22"],
            "view": "post",
            "published": false
        }));
        p.normalize();
        assert_eq!(p.aliases(), vec!["/url11", "/url22"]);
        assert_eq!(p.view(), "post");
        assert!(!p.is_published());
    }

    #[test]
    fn normalize_touches_nothing_else() {
        let mut p = page(json!({"url": "/url1", "title": "Hello World"}));
        p.normalize();
        assert_eq!(p.fields().len(), 4);
        assert_eq!(p.title(), Some("Hello World"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut once = page(json!({"url": "/u", "tags": ["a"], "published": false}));
        once.normalize();
        let mut twice = once.clone();
        twice.normalize();
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    // =========================================================================
    // Deep equality
    // =========================================================================

    #[test]
    fn nested_objects_equal_regardless_of_key_order() {
        let a = page(json!({"url": "/u", "c": {"c1": "x", "c2": "y"}, "b": 1}));
        let b = page(json!({"url": "/u", "b": 1, "c": {"c2": "y", "c1": "x"}}));
        assert!(a.deep_eq(&b));
    }

    #[test]
    fn nested_value_difference_detected() {
        let a = page(json!({"url": "/u", "c": {"c1": "c13", "c2": "c23"}}));
        let b = page(json!({"url": "/u", "c": {"c1": "c13", "c2": "d23"}}));
        assert!(!a.deep_eq(&b));
    }

    #[test]
    fn array_order_matters() {
        assert!(!deep_equal(&json!(["a", "b"]), &json!(["b", "a"])));
        assert!(deep_equal(&json!(["a", "b"]), &json!(["a", "b"])));
    }

    #[test]
    fn missing_field_is_a_difference() {
        let a = page(json!({"url": "/u", "a": null}));
        let b = page(json!({"url": "/u"}));
        assert!(!a.deep_eq(&b));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(deep_equal(&json!(1), &json!(1.0)));
        assert!(deep_equal(&json!(-3), &json!(-3)));
        assert!(!deep_equal(&json!(1), &json!(2)));
        assert!(!deep_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn different_urls_never_equal() {
        assert!(!PageRecord::new("/a").deep_eq(&PageRecord::new("/b")));
    }
}
