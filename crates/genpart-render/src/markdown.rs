//! Minimal markdown to document tree
//!
//! Only two block forms are recognised:
//! - a line of `#`..`######`, whitespace, then a title becomes a heading
//! - every other run of non-blank lines becomes one paragraph, its lines
//!   joined with spaces
//!
//! Text is otherwise kept as written: `>` quotes, `---` underlines, list
//! bullets, backslash escapes and entities stay literal. pulldown-cmark is
//! consulted per block for emphasis, strong and strikethrough spans only;
//! their delimiters become text format bits.
//!
//! Whitespace inside a block collapses to single spaces.

use genpart_doc::node::{format, heading_tag};
use genpart_doc::{DocumentNode, DocumentState, TextNode};
use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Options, Parser as MdParser, Tag};
use regex::Regex;

static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(#{1,6})\s+(.+?)\s*$").expect("valid heading pattern"));

/// Markdown parser
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    /// Create new markdown parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse into top-level heading and paragraph nodes
    #[must_use]
    pub fn parse(&self, markdown: &str) -> Vec<DocumentNode> {
        let text = markdown.replace("\r\n", "\n").replace('\r', "\n");
        let mut out = Vec::new();
        let mut lines: Vec<&str> = Vec::new();

        for line in text.lines() {
            let line = line.trim_end();
            if let Some(caps) = HEADING_LINE.captures(line) {
                flush_paragraph(&mut lines, &mut out);
                let runs = inline_runs(&collapse(&caps[2]));
                if !runs.is_empty() {
                    // at most six `#`, fits in u8
                    let level = caps[1].len() as u8;
                    out.push(DocumentNode::heading(heading_tag(level), runs));
                }
            } else if line.trim().is_empty() {
                flush_paragraph(&mut lines, &mut out);
            } else {
                lines.push(line.trim());
            }
        }
        flush_paragraph(&mut lines, &mut out);
        out
    }

    /// Parse into a normalized editor state
    #[must_use]
    pub fn parse_state(&self, markdown: &str) -> DocumentState {
        DocumentState::new(self.parse(markdown)).normalized()
    }
}

fn flush_paragraph(lines: &mut Vec<&str>, out: &mut Vec<DocumentNode>) {
    if lines.is_empty() {
        return;
    }
    let runs = inline_runs(&collapse(&lines.join(" ")));
    lines.clear();
    if !runs.is_empty() {
        out.push(DocumentNode::paragraph(runs));
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split one block into text runs, turning emphasis spans into format bits
///
/// Only delimiter bytes are removed; everything else is copied from `block`.
fn inline_runs(block: &str) -> Vec<DocumentNode> {
    let mut bits = vec![0u32; block.len()];
    let mut hidden = vec![false; block.len()];

    for (event, range) in MdParser::new_ext(block, Options::ENABLE_STRIKETHROUGH).into_offset_iter() {
        let (flag, width) = match event {
            Event::Start(Tag::Emphasis) => (format::ITALIC, 1),
            Event::Start(Tag::Strong) => (format::BOLD, 2),
            Event::Start(Tag::Strikethrough) => (
                format::STRIKETHROUGH,
                block[range.clone()].bytes().take_while(|b| *b == b'~').count(),
            ),
            _ => continue,
        };
        if width == 0 || range.len() < width * 2 {
            continue;
        }
        for b in &mut bits[range.clone()] {
            *b |= flag;
        }
        for i in (range.start..range.start + width).chain(range.end - width..range.end) {
            hidden[i] = true;
        }
    }

    let mut runs: Vec<(String, u32)> = Vec::new();
    for (i, ch) in block.char_indices() {
        if hidden[i] {
            continue;
        }
        match runs.last_mut() {
            Some((run, last)) if *last == bits[i] => run.push(ch),
            _ => runs.push((ch.to_string(), bits[i])),
        }
    }
    runs.into_iter()
        .map(|(text, bits)| {
            let node = TextNode::new(text);
            DocumentNode::Text(if bits == 0 { node } else { node.with_format(bits) })
        })
        .collect()
}
