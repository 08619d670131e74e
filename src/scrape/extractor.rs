// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML content extraction
//!
//! Selects the main content of a page using CSS selectors and reads the
//! metadata used for the Markdown header.

use scraper::{ElementRef, Html, Selector};

/// Elements removed before content selection
const NOISE_SELECTOR: &str = "script, style, iframe, noscript";

/// Priority order of main-content selectors
const MAIN_CONTENT_SELECTORS: [&str; 8] = [
    "main", "article", "section", ".content", ".post", ".entry", "#main", "#content",
];

/// Page metadata used to build the Markdown header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// Text of `<title>`
    pub title: String,
    /// `content` of `<meta name="description">`
    pub description: String,
    /// Text of the first `<h1>`
    pub h1: String,
}

/// Main content fragment plus page metadata
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// Serialized inner HTML of the selected element
    pub fragment: String,
    pub metadata: PageMetadata,
}

/// Extract main content and metadata from a full HTML document
///
/// Parsing never fails; malformed markup is recovered best-effort.
pub fn extract_page(html: &str) -> ExtractedPage {
    let mut document = Html::parse_document(html);
    remove_noise(&mut document);

    ExtractedPage {
        fragment: select_main(&document),
        metadata: read_metadata(&document),
    }
}

/// Extract the main content fragment of a full HTML document
///
/// Tries `main`, `article`, `section`, `.content`, `.post`, `.entry`,
/// `#main`, `#content` in that order. A match with no visible text falls
/// through to the next selector, and finally to `<body>`.
pub fn extract_main(html: &str) -> String {
    extract_page(html).fragment
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Detach scripts, styles, frames and comments from the tree
fn remove_noise(document: &mut Html) {
    let mut doomed: Vec<_> = match selector(NOISE_SELECTOR) {
        Some(noise) => document.select(&noise).map(|el| el.id()).collect(),
        None => Vec::new(),
    };
    doomed.extend(
        document
            .tree
            .nodes()
            .filter(|node| node.value().is_comment())
            .map(|node| node.id()),
    );

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn select_main(document: &Html) -> String {
    for css in MAIN_CONTENT_SELECTORS {
        let Some(sel) = selector(css) else { continue };
        if let Some(element) = document.select(&sel).next() {
            if has_text(&element) {
                return element.inner_html();
            }
        }
    }

    selector("body")
        .and_then(|body| document.select(&body).next().map(|el| el.inner_html()))
        .unwrap_or_default()
}

fn has_text(element: &ElementRef) -> bool {
    element.text().any(|t| !t.trim().is_empty())
}

fn read_metadata(document: &Html) -> PageMetadata {
    let first_text = |css: &str| {
        selector(css)
            .and_then(|sel| document.select(&sel).next().map(|el| collapse_whitespace(el.text())))
            .unwrap_or_default()
    };

    let description = selector("meta[name][content]")
        .and_then(|sel| {
            document
                .select(&sel)
                .find(|el| {
                    el.value()
                        .attr("name")
                        .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
                })
                .and_then(|el| el.value().attr("content"))
                .map(|content| content.trim().to_string())
        })
        .unwrap_or_default();

    PageMetadata {
        title: first_text("title"),
        description,
        h1: first_text("h1"),
    }
}

/// Join text nodes and normalize whitespace to single spaces
fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined: String = parts.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
