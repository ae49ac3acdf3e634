//! Sitemap generation.
//!
//! Writes `sitemap.xml` to the output directory, listing every published
//! page once per configured host:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/docs/intro</loc>
//!     <changefreq>weekly</changefreq>
//!     <priority>0.5</priority>
//!   </url>
//! </urlset>
//! ```

use super::{Task, TaskError};
use crate::config::SitemapConfig;
use crate::model::Model;
use crate::page::PageRecord;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use url::Url;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const SITEMAP_FILENAME: &str = "sitemap.xml";

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid sitemap url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Write `sitemap.xml` for the published pages.
#[derive(Debug)]
pub struct Sitemap {
    config: SitemapConfig,
    output_dir: PathBuf,
    written: AtomicUsize,
}

impl Sitemap {
    pub fn new(config: SitemapConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            written: AtomicUsize::new(0),
        }
    }

    /// `<url>` entries written by the last run.
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }
}

impl Task for Sitemap {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn run(&self, model: &mut Model) -> Result<(), TaskError> {
        if !self.config.enabled {
            tracing::debug!("sitemap disabled");
            return Ok(());
        }
        let (xml, entries) = render_sitemap(model.pages(), &self.config)?;
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(SITEMAP_FILENAME);
        fs::write(&path, xml)?;
        self.written.store(entries, Ordering::Relaxed);
        tracing::info!(entries, path = %path.display(), "wrote sitemap");
        Ok(())
    }
}

/// Sitemap XML for `pages`, with the number of `<url>` entries.
pub fn render_sitemap(
    pages: &[PageRecord],
    config: &SitemapConfig,
) -> Result<(String, usize), SitemapError> {
    let locations = sitemap_locations(pages, &config.hosts)?;
    let priority = format_priority(config.priority);

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS)]),
    ))?;
    for loc in &locations {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", loc.as_str())?;
        write_text_element(&mut writer, "changefreq", &config.changefreq)?;
        write_text_element(&mut writer, "priority", &priority)?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    let bytes = writer.into_inner().into_inner();
    let mut xml = String::from_utf8(bytes)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    xml.push('\n');
    Ok((xml, locations.len()))
}

/// `0.5` → `"0.5"`, `1` → `"1.0"`, `0.75` → `"0.75"`.
fn format_priority(priority: f64) -> String {
    if priority.fract() == 0.0 {
        format!("{priority:.1}")
    } else {
        format!("{priority}")
    }
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<(), SitemapError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Absolute url of every published page on every host, page-major.
fn sitemap_locations(pages: &[PageRecord], hosts: &[String]) -> Result<Vec<Url>, SitemapError> {
    let mut locations = Vec::new();
    for page in pages.iter().filter(|p| p.is_published()) {
        for host in hosts {
            let raw = format!("{}{}", host.trim_end_matches('/'), page.url());
            let url = Url::parse(&raw).map_err(|source| SitemapError::InvalidUrl {
                url: raw.clone(),
                source,
            })?;
            locations.push(url);
        }
    }
    Ok(locations)
}
