// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Allow-list HTML sanitization
//!
//! Sanitization is a tree filter: the fragment is parsed by `ammonia`
//! (html5ever) and only allow-listed elements and attributes are
//! serialized back. Nothing in the input is ever evaluated.
//!
//! Surviving attributes are `href`, `src` and `alt`, with one exception:
//! `<code>` keeps a `class` holding a single `language-*` token so the
//! converter can annotate fenced code blocks. Re-scanning the output for
//! attributes must allow for that one case.

use ammonia::{Builder, UrlRelative};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Elements kept in the sanitized output
pub const ALLOWED_TAGS: [&str; 24] = [
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "ul", "ol", "li", "a", "code", "pre", "blockquote",
    "em", "strong", "br", "table", "thead", "tbody", "tr", "td", "th", "img",
];

/// Attributes kept on any allowed element
pub const ALLOWED_ATTRIBUTES: [&str; 3] = ["href", "src", "alt"];

/// Elements removed together with everything inside them
const DROPPED_WITH_CONTENT: [&str; 6] = ["script", "style", "iframe", "noscript", "object", "embed"];

/// Reusable sanitizer, built once and shared by every pipeline run
pub struct Sanitizer {
    builder: Builder<'static>,
}

impl Sanitizer {
    pub fn new() -> Self {
        let mut code_attributes = HashMap::new();
        code_attributes.insert("code", HashSet::from(["class"]));

        let mut builder = Builder::default();
        builder
            .tags(HashSet::from(ALLOWED_TAGS))
            .clean_content_tags(HashSet::from(DROPPED_WITH_CONTENT))
            .generic_attributes(HashSet::from(ALLOWED_ATTRIBUTES))
            .tag_attributes(code_attributes)
            .attribute_filter(keep_language_class)
            .url_relative(UrlRelative::PassThrough)
            .link_rel(None)
            .strip_comments(true);

        Self { builder }
    }

    /// Restrict `html` to the allow-listed tags and attributes
    ///
    /// Disallowed wrapper elements are unwrapped (their text survives);
    /// script, style and frame subtrees are dropped entirely.
    pub fn sanitize(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce `class` on `<code>` to its `language-*` token, drop it otherwise
fn keep_language_class<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    if attribute != "class" {
        return Some(Cow::Borrowed(value));
    }
    if element != "code" {
        return None;
    }
    value
        .split_whitespace()
        .find(|token| token.len() > "language-".len() && token.starts_with("language-"))
        .map(Cow::Borrowed)
}
