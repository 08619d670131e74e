// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Final Markdown document assembly

use regex::Regex;
use std::sync::OnceLock;

fn blank_line_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn whitespace_only_lines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]+$").unwrap())
}

/// Collapse 3+ consecutive newlines to one blank line
pub fn collapse_blank_lines(text: &str) -> String {
    blank_line_runs().replace_all(text, "\n\n").into_owned()
}

/// Blank out whitespace-only lines, collapse blank runs and trim
pub fn tidy_markdown(text: &str) -> String {
    let blanked = whitespace_only_lines().replace_all(text, "");
    collapse_blank_lines(&blanked).trim().to_string()
}

/// Prefix the converted body with the page header
///
/// ```text
/// # {title}
///
/// *{description}*        (only when non-empty)
///
/// ## {h1}                (only when non-empty and different from the title)
///
/// {body}
/// ```
pub fn assemble(title: &str, description: &str, h1: &str, body: &str) -> String {
    let mut out = format!("# {}\n\n", title);
    if !description.is_empty() {
        out.push_str(&format!("*{}*\n\n", description));
    }
    if !h1.is_empty() && h1 != title {
        out.push_str(&format!("## {}\n\n", h1));
    }
    out.push_str(body);

    collapse_blank_lines(&out).trim().to_string()
}
