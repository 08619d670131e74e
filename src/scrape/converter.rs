// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML to Markdown conversion
//!
//! Walks the parsed fragment and renders each element:
//! - headings as ATX (`#` x level)
//! - `pre` as fenced code, annotated from a `language-*` class
//! - links as `[text](href)`, bare text when there is no href
//! - images as `![alt](src)`
//! - blockquotes with every line prefixed by `> `
//! - `-` bullets, `_em_`, `**strong**`, `~~strike~~`
//!
//! Block elements emit `\n\n` on both sides; runs of blank lines are
//! collapsed once at the end. Nesting deeper than [`MAX_DEPTH`] is flattened
//! to plain text so hostile markup cannot exhaust the stack.

use scraper::{ElementRef, Html, Node};

use super::assembler::tidy_markdown;

/// Deepest element nesting rendered as Markdown structure
pub const MAX_DEPTH: usize = 128;

/// Convert an HTML fragment to Markdown
///
/// Empty or whitespace-only input yields an empty string.
pub fn to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let raw = render_children(fragment.root_element(), 0);
    tidy_markdown(&raw)
}

fn render_children(element: ElementRef, depth: usize) -> String {
    if depth >= MAX_DEPTH {
        return collapse_spaces(&element.text().collect::<String>());
    }

    let mut out = String::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_chunk(&mut out, &collapse_spaces(text)),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    let rendered = render_element(child, depth + 1);
                    push_chunk(&mut out, &rendered);
                }
            }
            _ => {}
        }
    }
    out
}

fn render_element(element: ElementRef, depth: usize) -> String {
    let name = element.value().name();
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let content = single_line(&render_children(element, depth));
            if content.is_empty() {
                String::new()
            } else {
                format!("\n\n{} {}\n\n", "#".repeat(level), content)
            }
        }
        "p" => block(&render_children(element, depth)),
        "br" => "  \n".to_string(),
        "hr" => "\n\n---\n\n".to_string(),
        "strong" | "b" => wrap_inline(&render_children(element, depth), "**"),
        "em" | "i" => wrap_inline(&render_children(element, depth), "_"),
        "del" | "s" | "strike" => wrap_inline(&render_children(element, depth), "~~"),
        "code" => render_inline_code(element),
        "pre" => render_code_block(element),
        "a" => render_link(element, depth),
        "img" => render_image(element),
        "ul" => render_list(element, false, depth),
        "ol" => render_list(element, true, depth),
        "li" => format!("\n- {}\n", render_children(element, depth).trim()),
        "blockquote" => render_blockquote(element, depth),
        "table" => render_table(element, depth),
        "script" | "style" | "head" | "title" | "noscript" | "template" | "iframe" => String::new(),
        "div" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
        | "figure" | "figcaption" | "address" | "details" | "summary" | "form" | "fieldset"
        | "dl" | "dt" | "dd" => block(&render_children(element, depth)),
        _ => render_children(element, depth),
    }
}

/// Append `chunk`, trimming horizontal whitespace at line boundaries
fn push_chunk(out: &mut String, chunk: &str) {
    if chunk.is_empty() {
        return;
    }
    let mut chunk = chunk;
    if chunk.starts_with('\n') {
        let keep = out.trim_end_matches([' ', '\t']).len();
        out.truncate(keep);
    }
    if out.ends_with('\n') {
        chunk = chunk.trim_start_matches([' ', '\t']);
    }
    out.push_str(chunk);
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn block(content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        String::new()
    } else {
        format!("\n\n{}\n\n", content)
    }
}

/// Wrap inline content in `delimiter`, keeping outer whitespace outside
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let inner = content.trim();
    if inner.is_empty() {
        return content.to_string();
    }
    let leading = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trailing = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{leading}{delimiter}{inner}{delimiter}{trailing}")
}

fn render_inline_code(element: ElementRef) -> String {
    let text = single_line(&element.text().collect::<String>());
    if text.is_empty() {
        return String::new();
    }
    if text.contains('`') {
        format!("`` {} ``", text)
    } else {
        format!("`{}`", text)
    }
}

fn language_of(element: ElementRef) -> Option<String> {
    element
        .value()
        .classes()
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn render_code_block(pre: ElementRef) -> String {
    let language = pre
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "code")
        .and_then(language_of)
        .or_else(|| language_of(pre))
        .unwrap_or_default();

    let text: String = pre.text().collect();
    let body = text.trim_matches('\n').trim_end();
    if body.trim().is_empty() {
        return String::new();
    }

    let mut fence = "```".to_string();
    while body.contains(fence.as_str()) {
        fence.push('`');
    }

    format!("\n\n{fence}{language}\n{body}\n{fence}\n\n")
}

fn render_link(element: ElementRef, depth: usize) -> String {
    let content = render_children(element, depth);
    let text = content.trim();
    let href = element
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty());

    match href {
        Some(href) if !text.is_empty() => format!("[{}]({})", text, href.replace(' ', "%20")),
        _ => content,
    }
}

fn render_image(element: ElementRef) -> String {
    let alt = element.value().attr("alt").unwrap_or("");
    let src = element.value().attr("src").unwrap_or("");
    format!("![{}]({})", single_line(alt), src.trim())
}

fn render_list(list: ElementRef, ordered: bool, depth: usize) -> String {
    let mut number = list
        .value()
        .attr("start")
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1);

    let mut items = Vec::new();
    for child in list.children().filter_map(ElementRef::wrap) {
        let content = render_children(child, depth);
        let content = tidy_markdown(&content);
        if content.is_empty() {
            continue;
        }

        // Stray non-item children are kept as continuation text.
        if child.value().name() != "li" {
            items.push(format!("  {}", indent_continuation(&content, "  ")));
            continue;
        }

        let marker = if ordered {
            let marker = format!("{}. ", number);
            number += 1;
            marker
        } else {
            "- ".to_string()
        };
        let indent = " ".repeat(marker.len());
        items.push(format!("{}{}", marker, indent_continuation(&content, &indent)));
    }

    if items.is_empty() {
        return String::new();
    }
    format!("\n\n{}\n\n", items.join("\n"))
}

/// Indent every line after the first by `indent`, leaving blank lines empty
fn indent_continuation(content: &str, indent: &str) -> String {
    let mut lines = content.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

fn render_blockquote(element: ElementRef, depth: usize) -> String {
    let content = tidy_markdown(&render_children(element, depth));
    if content.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = content
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect();
    format!("\n\n{}\n\n", quoted.join("\n"))
}

fn render_table(table: ElementRef, depth: usize) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => collect_row(child, &mut rows, depth),
            "thead" | "tbody" | "tfoot" => {
                for row in child.children().filter_map(ElementRef::wrap) {
                    if row.value().name() == "tr" {
                        collect_row(row, &mut rows, depth);
                    }
                }
            }
            _ => {}
        }
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let mut out = String::from("\n\n");
    for (idx, row) in rows.iter().enumerate() {
        out.push('|');
        for col in 0..columns {
            out.push(' ');
            out.push_str(row.get(col).map(String::as_str).unwrap_or(""));
            out.push_str(" |");
        }
        out.push('\n');
        if idx == 0 {
            out.push('|');
            for _ in 0..columns {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

fn collect_row(row: ElementRef, rows: &mut Vec<Vec<String>>, depth: usize) {
    let cells: Vec<String> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| single_line(&render_children(cell, depth)).replace('|', "\\|"))
        .collect();
    if !cells.is_empty() {
        rows.push(cells);
    }
}
