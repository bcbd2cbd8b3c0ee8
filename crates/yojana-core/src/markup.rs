//! Safe lightweight markup rendering for backend replies.
//!
//! Assistant text may carry a small subset of markdown: headings, bold,
//! italic, inline code, fenced code blocks and flat unordered lists. The text
//! is untrusted, so it is never passed through as markup. [`parse`] turns it
//! into a typed [`Fragment`]; [`Fragment::to_html`] escapes every text node on
//! the way out, so the only tags in the output are the ones emitted here.
//!
//! The passes run in a fixed order and the order matters:
//!
//! 1. fenced blocks are cut out first, so nothing inside them is formatted;
//! 2. each remaining line is classified as heading, list item, blank or
//!    paragraph text (headings are matched longest marker first);
//! 3. inline code spans are cut out, then `**`/`__` bold, then `*`/`_`
//!    italic. Bold must run before italic or the single-character pattern
//!    would eat one side of every bold pair;
//! 4. consecutive list items collapse into one list, and the remaining lines
//!    group into paragraphs on blank-line boundaries.
//!
//! Rendering is not idempotent: feed it raw backend text exactly once.

use std::collections::VecDeque;

const FENCE: &str = "```";
const MAX_HEADING_LEVEL: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List(Vec<Vec<Inline>>),
    Code { lang: Option<String>, text: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub blocks: Vec<Block>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for block in &self.blocks {
            write_block(&mut html, block);
        }
        html
    }
}

/// Parse and render in one step
pub fn render(text: &str) -> String {
    parse(text).to_html()
}

pub fn parse(text: &str) -> Fragment {
    let mut blocks = Vec::new();
    for segment in split_fences(text) {
        match segment {
            Segment::Text(body) => parse_text_blocks(body, &mut blocks),
            Segment::Fence(body) => blocks.push(code_block(body)),
        }
    }
    Fragment { blocks }
}

/// Replace the three HTML-significant characters
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

enum Segment<'a> {
    Text(&'a str),
    Fence(&'a str),
}

/// Cut the input at fence markers. An opening marker without a closing one is
/// left in the text.
fn split_fences(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let body_start = open + FENCE.len();
        let Some(close) = rest[body_start..].find(FENCE) else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        segments.push(Segment::Fence(&rest[body_start..body_start + close]));
        rest = &rest[body_start + close + FENCE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

fn code_block(body: &str) -> Block {
    // "```rust\n..." carries a language word on the opening line
    let (lang, code) = match body.split_once('\n') {
        Some((first, rest)) if is_language_tag(first.trim_end_matches('\r')) => {
            (Some(first.trim_end_matches('\r').to_string()), rest)
        }
        Some(("", rest)) => (None, rest),
        _ => (None, body),
    };
    let code = code.strip_suffix('\n').unwrap_or(code);
    let code = code.strip_suffix('\r').unwrap_or(code);

    Block::Code {
        lang,
        text: code.to_string(),
    }
}

fn is_language_tag(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.' | '#'))
}

fn parse_text_blocks(body: &str, blocks: &mut Vec<Block>) {
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Vec<&str> = Vec::new();

    for line in body.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, blocks);
            flush_list(&mut list, blocks);
        } else if let Some((level, content)) = heading(line) {
            flush_paragraph(&mut paragraph, blocks);
            flush_list(&mut list, blocks);
            blocks.push(Block::Heading {
                level,
                content: parse_inline(content),
            });
        } else if let Some(item) = list_item(line) {
            flush_paragraph(&mut paragraph, blocks);
            list.push(item);
        } else {
            flush_list(&mut list, blocks);
            paragraph.push(line);
        }
    }

    flush_paragraph(&mut paragraph, blocks);
    flush_list(&mut list, blocks);
}

fn flush_paragraph(lines: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if lines.is_empty() {
        return;
    }
    let mut content = Vec::new();
    for (i, line) in lines.drain(..).enumerate() {
        if i > 0 {
            content.push(Inline::LineBreak);
        }
        content.extend(parse_inline(line));
    }
    blocks.push(Block::Paragraph(content));
}

fn flush_list(items: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if items.is_empty() {
        return;
    }
    blocks.push(Block::List(items.drain(..).map(parse_inline).collect()));
}

/// `#` to `######` at the very start of the line, followed by a space
fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL {
        return None;
    }
    let content = line[hashes..].strip_prefix(' ')?;
    Some((hashes as u8, content))
}

/// `- item` or `* item`, optionally indented
fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let item = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))?;
    if item.is_empty() {
        None
    } else {
        Some(item)
    }
}

fn parse_inline(line: &str) -> Vec<Inline> {
    let nodes = split_code_spans(line);
    let nodes = pair_delimiters(nodes, "**", Inline::Strong);
    let nodes = pair_delimiters(nodes, "__", Inline::Strong);
    let nodes = emphasize(nodes, "*");
    emphasize(nodes, "_")
}

fn split_code_spans(line: &str) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut rest = line;

    while let Some(open) = rest.find('`') {
        let after = &rest[open + 1..];
        match after.find('`') {
            Some(0) => {
                // empty span, the second backtick may still open one
                push_text(&mut nodes, &rest[..open + 1]);
                rest = after;
            }
            Some(close) => {
                push_text(&mut nodes, &rest[..open]);
                nodes.push(Inline::Code(after[..close].to_string()));
                rest = &after[close + 1..];
            }
            None => break,
        }
    }

    push_text(&mut nodes, rest);
    nodes
}

/// Italic runs inside bold as well as around it
fn emphasize(nodes: Vec<Inline>, delim: &str) -> Vec<Inline> {
    let nodes = nodes
        .into_iter()
        .map(|node| match node {
            Inline::Strong(children) => Inline::Strong(emphasize(children, delim)),
            other => other,
        })
        .collect();
    pair_delimiters(nodes, delim, Inline::Emphasis)
}

/// Match `delim ... delim` pairs left to right, shortest match first. Only
/// text nodes can hold a delimiter; code spans and already-wrapped nodes are
/// opaque and end up inside the pair when they fall between the markers.
fn pair_delimiters(
    nodes: Vec<Inline>,
    delim: &str,
    wrap: fn(Vec<Inline>) -> Inline,
) -> Vec<Inline> {
    let mut queue: VecDeque<Inline> = nodes.into();
    let mut out = Vec::new();

    while let Some(node) = queue.pop_front() {
        let text = match node {
            Inline::Text(text) => text,
            other => {
                out.push(other);
                continue;
            }
        };
        let Some(open) = text.find(delim) else {
            push_text(&mut out, &text);
            continue;
        };

        let before = &text[..open];
        let after = &text[open + delim.len()..];

        if let Some(close) = after.find(delim) {
            if close > 0 {
                push_text(&mut out, before);
                out.push(wrap(vec![Inline::Text(after[..close].to_string())]));
                queue.push_front(Inline::Text(after[close + delim.len()..].to_string()));
            } else {
                // empty pair is not formatting; keep the opener and rescan
                push_text(&mut out, &text[..open + delim.len()]);
                queue.push_front(Inline::Text(after.to_string()));
            }
            continue;
        }

        let closing = queue.iter().enumerate().find_map(|(i, node)| match node {
            Inline::Text(t) => t.find(delim).map(|offset| (i, offset)),
            _ => None,
        });

        match closing {
            Some((index, offset)) if !(after.is_empty() && index == 0 && offset == 0) => {
                let mut inner = Vec::new();
                push_text(&mut inner, after);
                inner.extend(queue.drain(..index));
                let tail = match queue.pop_front() {
                    Some(Inline::Text(t)) => t,
                    Some(other) => {
                        inner.push(other);
                        String::new()
                    }
                    None => String::new(),
                };
                push_text(&mut inner, &tail[..offset]);
                queue.push_front(Inline::Text(tail[offset + delim.len()..].to_string()));

                push_text(&mut out, before);
                out.push(wrap(inner));
            }
            _ => {
                push_text(&mut out, &text[..open + delim.len()]);
                queue.push_front(Inline::Text(after.to_string()));
            }
        }
    }

    out
}

/// Append text, merging with a trailing text node and skipping empties
fn push_text(nodes: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Inline::Text(text.to_string()));
    }
}

fn write_block(html: &mut String, block: &Block) {
    match block {
        Block::Heading { level, content } => {
            html.push_str(&format!("<h{}>", level));
            write_inlines(html, content);
            html.push_str(&format!("</h{}>", level));
        }
        Block::Paragraph(content) => {
            html.push_str("<p>");
            write_inlines(html, content);
            html.push_str("</p>");
        }
        Block::List(items) => {
            html.push_str("<ul>");
            for item in items {
                html.push_str("<li>");
                write_inlines(html, item);
                html.push_str("</li>");
            }
            html.push_str("</ul>");
        }
        Block::Code { lang, text } => {
            match lang {
                Some(lang) => {
                    html.push_str(&format!("<pre><code class=\"language-{}\">", lang))
                }
                None => html.push_str("<pre><code>"),
            }
            html.push_str(&escape_html(text));
            html.push_str("</code></pre>");
        }
    }
}

fn write_inlines(html: &mut String, nodes: &[Inline]) {
    for node in nodes {
        match node {
            Inline::Text(text) => html.push_str(&escape_html(text)),
            Inline::Code(code) => {
                html.push_str("<code>");
                html.push_str(&escape_html(code));
                html.push_str("</code>");
            }
            Inline::Strong(children) => {
                html.push_str("<strong>");
                write_inlines(html, children);
                html.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                html.push_str("<em>");
                write_inlines(html, children);
                html.push_str("</em>");
            }
            Inline::LineBreak => html.push_str("<br />"),
        }
    }
}
