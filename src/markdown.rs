//! Markdown to HTML rendering for page content.
//!
//! Rendering is `pulldown-cmark` with two passes layered over its event
//! stream:
//!
//! - **Heading anchors**: each heading gets a GitHub-style slug id (unique
//!   within the page) and a leading self-link, rendered with maud.
//! - **Link rewriting**: link targets that point at another page's source
//!   document are replaced with that page's site URL (see [`crate::links`]).

use crate::config::MarkdownConfig;
use crate::links::LinkResolver;
use crate::slug::Slugger;
use maud::{Markup, PreEscaped, html};
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};

/// Everything a single page render depends on besides its source text.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub markdown: &'a MarkdownConfig,
    /// `None` disables link rewriting.
    pub links: Option<&'a LinkResolver>,
    /// The page's `sourceUrl`, relative links are resolved against it.
    pub source_url: Option<&'a str>,
}

pub fn parser_options(config: &MarkdownConfig) -> Options {
    let mut options = Options::empty();
    options.set(Options::ENABLE_TABLES, config.tables);
    options.set(Options::ENABLE_FOOTNOTES, config.footnotes);
    options.set(Options::ENABLE_STRIKETHROUGH, config.strikethrough);
    options.set(Options::ENABLE_TASKLISTS, config.tasklists);
    options.set(Options::ENABLE_HEADING_ATTRIBUTES, config.heading_anchors);
    options
}

/// Render one page's markdown to an HTML fragment.
pub fn render(source: &str, ctx: RenderContext<'_>) -> String {
    let mut slugger = Slugger::new();
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut heading: Option<PendingHeading<'_>> = None;

    for event in Parser::new_ext(source, parser_options(ctx.markdown)) {
        let event = match ctx.links {
            Some(resolver) => rewrite_link(event, resolver, ctx.source_url),
            None => event,
        };

        if !ctx.markdown.heading_anchors {
            events.push(event);
            continue;
        }

        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                heading = Some(PendingHeading {
                    level,
                    id,
                    inner: Vec::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(pending) = heading.take() {
                    let markup = pending.finish(&mut slugger);
                    events.push(Event::Html(format!("{}\n", markup.into_string()).into()));
                }
            }
            other => match heading.as_mut() {
                Some(pending) => pending.inner.push(other),
                None => events.push(other),
            },
        }
    }

    let mut out = String::with_capacity(source.len() * 3 / 2);
    md_html::push_html(&mut out, events.into_iter());
    out
}

fn rewrite_link<'a>(
    event: Event<'a>,
    resolver: &LinkResolver,
    source_url: Option<&str>,
) -> Event<'a> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = match resolver.resolve(&dest_url, source_url) {
                Some(resolved) => {
                    tracing::trace!(from = %dest_url, to = %resolved, "rewrote link");
                    CowStr::from(resolved)
                }
                None => dest_url,
            };
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        other => other,
    }
}

/// A heading whose content is still being collected.
struct PendingHeading<'a> {
    level: HeadingLevel,
    /// Explicit `{#id}` attribute, which wins over the slug.
    id: Option<CowStr<'a>>,
    inner: Vec<Event<'a>>,
}

impl PendingHeading<'_> {
    fn finish(self, slugger: &mut Slugger) -> Markup {
        let text: String = self
            .inner
            .iter()
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                _ => None,
            })
            .collect();
        let slug = match self.id {
            Some(id) => {
                slugger.reserve(&id);
                id.to_string()
            }
            None => slugger.slug(&text),
        };

        let mut inner_html = String::new();
        md_html::push_html(&mut inner_html, self.inner.into_iter());
        heading_markup(self.level, &slug, &inner_html)
    }
}

fn heading_markup(level: HeadingLevel, slug: &str, inner_html: &str) -> Markup {
    let body = html! {
        a.anchor href={ "#" (slug) } aria-hidden="true" {}
        (PreEscaped(inner_html))
    };
    match level {
        HeadingLevel::H1 => html! { h1 id=(slug) { (body) } },
        HeadingLevel::H2 => html! { h2 id=(slug) { (body) } },
        HeadingLevel::H3 => html! { h3 id=(slug) { (body) } },
        HeadingLevel::H4 => html! { h4 id=(slug) { (body) } },
        HeadingLevel::H5 => html! { h5 id=(slug) { (body) } },
        HeadingLevel::H6 => html! { h6 id=(slug) { (body) } },
    }
}
