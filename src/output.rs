//! CLI output formatting.
//!
//! Output is **page-centric**: every page is shown by its positional index
//! and url, with its title and source as indented context lines. Change
//! summaries list urls grouped by kind.
//!
//! # Output Format
//!
//! ## Pages (`check`)
//!
//! ```text
//! Pages
//! 001 / Home
//!     Source: docs/README.md
//! 002 /guide Guide
//!     Source: docs/guide.md
//!     Unpublished
//! ```
//!
//! ## Changes (`merge`, `build`)
//!
//! ```text
//! Changes
//!     Added
//!         /guide
//!     Removed
//!         /old
//! 1 added, 0 modified, 1 removed
//! ```
//!
//! ## Build summary
//!
//! ```text
//! Pages: 12 (11 published)
//! Render: 3 cached, 9 rendered (12 total)
//! Sitemap: 11 entries
//! Published 12 files
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::changes::{Change, ChangeSet};
use crate::model::Model;
use crate::page::PageRecord;
use crate::pipeline::BuildReport;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `001 /docs/intro Intro`, or without the title when there is none.
fn page_header(index: usize, page: &PageRecord) -> String {
    match page.title() {
        Some(t) if !t.is_empty() => format!("{} {} {}", format_index(index), page.url(), t),
        _ => format!("{} {}", format_index(index), page.url()),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Format the page inventory of a model.
pub fn format_pages(model: &Model) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (i, page) in model.pages().iter().enumerate() {
        lines.push(page_header(i + 1, page));
        if let Some(source) = page.source_url() {
            lines.push(format!("{}Source: {}", indent(1), source));
        } else if let Some(content) = page.content_file() {
            lines.push(format!("{}Content: {}", indent(1), content));
        }
        if !page.is_published() {
            lines.push(format!("{}Unpublished", indent(1)));
        }
    }
    if model.pages().is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    lines
}

pub fn print_pages(model: &Model) {
    for line in format_pages(model) {
        println!("{}", line);
    }
}

// ============================================================================
// Changes
// ============================================================================

/// Format a change log grouped by kind, followed by the totals line.
pub fn format_changes(changes: &ChangeSet) -> Vec<String> {
    if !changes.has_changes() {
        return vec!["No changes".to_string()];
    }

    let mut lines = vec!["Changes".to_string()];
    let groups: [(&str, &[Change]); 3] = [
        ("Added", changes.added()),
        ("Modified", changes.modified()),
        ("Removed", changes.removed()),
    ];
    for (label, group) in groups {
        if group.is_empty() {
            continue;
        }
        lines.push(format!("{}{}", indent(1), label));
        for change in group {
            lines.push(format!("{}{}", indent(2), change.url));
        }
    }
    lines.push(changes.to_string());
    lines
}

pub fn print_changes(changes: &ChangeSet) {
    for line in format_changes(changes) {
        println!("{}", line);
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Format the closing summary of a build.
pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![
        format!("Pages: {} ({} published)", report.pages, report.published),
        format!("Render: {}", report.render),
    ];
    if report.sitemap_entries > 0 {
        lines.push(format!(
            "Sitemap: {}",
            plural(report.sitemap_entries, "entry", "entries")
        ));
    }
    lines.push(format!(
        "Published {}",
        plural(report.files_published, "file", "files")
    ));
    lines
}

pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}
