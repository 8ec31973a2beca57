//! Generated text to final document tree
//!
//! Steps:
//! 1. Parse the generated markdown into headings and paragraphs
//! 2. Split text runs at every marker whose (type, id) is a known anchor
//! 3. Render each match and splice it in; paragraphs split around the
//!    insertion, headings keep their text and get the insertion as siblings
//! 4. Append anchors reported missing and never seen in the text
//!
//! Unknown markers stay as literal text.

use crate::error::AssembleError;
use crate::markdown::MarkdownParser;
use crate::registry::{RenderContext, RendererRegistry, SnippetLibrary};
use genpart_doc::{
    AnchorKind, AnchorSpec, Answers, DocumentNode, DocumentState, ElementNode, HeadingNode,
    QuestionRecord, TextNode,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

/// Inline marker, optionally wrapped in backticks
pub static INLINE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`?\[\[(CR:TBL|CR:TITLE_PRESET)\|id=([^`\]]+)\]\]`?").expect("inline anchor pattern")
});

/// Assembly inputs
#[derive(Debug, Clone, Copy)]
pub struct AssembleInput<'a> {
    /// Generated markdown
    pub text: &'a str,
    /// Every anchor the text may reference
    pub anchors: &'a [AnchorSpec],
    /// Questions in scope
    pub questions: &'a [QuestionRecord],
    /// Answers in scope
    pub answers: &'a Answers,
    /// Anchor ids reported missing by verification
    pub missing: &'a [String],
    /// Cached fragments for bespoke table layouts
    pub snippets: Option<&'a SnippetLibrary>,
}

impl<'a> AssembleInput<'a> {
    /// Create input with nothing missing and no snippets
    #[must_use]
    pub fn new(
        text: &'a str,
        anchors: &'a [AnchorSpec],
        questions: &'a [QuestionRecord],
        answers: &'a Answers,
    ) -> Self {
        Self {
            text,
            anchors,
            questions,
            answers,
            missing: &[],
            snippets: None,
        }
    }

    /// With missing anchor ids
    #[inline]
    #[must_use]
    pub fn with_missing(mut self, missing: &'a [String]) -> Self {
        self.missing = missing;
        self
    }

    /// With snippet library
    #[inline]
    #[must_use]
    pub fn with_snippets(mut self, snippets: &'a SnippetLibrary) -> Self {
        self.snippets = Some(snippets);
        self
    }
}

/// Assembled document
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Normalized tree
    pub state: DocumentState,
    /// Canonical JSON of `state`
    pub encoded: String,
    /// Anchor ids matched in the text, first-seen order
    pub used: Vec<String>,
    /// Anchor ids appended at the end
    pub auto_inserted: Vec<String>,
}

/// Assembles generated text into a document tree
#[derive(Debug, Default)]
pub struct DocumentAssembler {
    renderers: RendererRegistry,
    parser: MarkdownParser,
}

impl DocumentAssembler {
    /// Create assembler with the built-in renderers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create assembler with custom renderers
    #[inline]
    #[must_use]
    pub fn with_renderers(renderers: RendererRegistry) -> Self {
        Self {
            renderers,
            parser: MarkdownParser::new(),
        }
    }

    /// Assemble generated text
    ///
    /// # Errors
    /// Returns [`AssembleError::Encode`] when the final tree cannot be encoded.
    pub fn assemble(&self, input: &AssembleInput<'_>) -> Result<Assembly, AssembleError> {
        debug!(
            "assembling {} chars with {} anchors ({} missing)",
            input.text.len(),
            input.anchors.len(),
            input.missing.len()
        );
        let empty = SnippetLibrary::new();
        let mut walk = Walk {
            renderers: &self.renderers,
            input,
            snippets: input.snippets.unwrap_or(&empty),
            known: input
                .anchors
                .iter()
                .map(|a| ((a.kind, a.id.trim().to_string()), a))
                .collect(),
            used: Vec::new(),
        };

        let mut children = walk.process_all(self.parser.parse(input.text));
        let auto_inserted = walk.auto_insert(&mut children);
        if !auto_inserted.is_empty() {
            info!("auto-inserted anchors {:?}", auto_inserted);
        }

        let state = DocumentState::new(children).normalized();
        let encoded = state.to_json()?;
        Ok(Assembly {
            state,
            encoded,
            used: walk.used,
            auto_inserted,
        })
    }
}

enum Segment {
    Node(DocumentNode),
    Marker {
        kind: AnchorKind,
        id: String,
        literal: String,
        template: TextNode,
    },
}

struct Walk<'a> {
    renderers: &'a RendererRegistry,
    input: &'a AssembleInput<'a>,
    snippets: &'a SnippetLibrary,
    known: HashMap<(AnchorKind, String), &'a AnchorSpec>,
    used: Vec<String>,
}

impl Walk<'_> {
    fn process_all(&mut self, nodes: Vec<DocumentNode>) -> Vec<DocumentNode> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            out.extend(self.process(node));
        }
        out
    }

    fn process(&mut self, node: DocumentNode) -> Vec<DocumentNode> {
        match node {
            DocumentNode::Paragraph(p) => self.paragraph(p),
            DocumentNode::Heading(h) => self.heading(h),
            mut other => {
                if let Some(element) = other.element_mut() {
                    let children = std::mem::take(&mut element.children);
                    element.children = self.process_all(children);
                }
                vec![other]
            }
        }
    }

    fn segments(&mut self, children: Vec<DocumentNode>) -> Vec<Segment> {
        let mut out = Vec::new();
        for child in children {
            match child {
                DocumentNode::Text(text) => self.split_text(text, &mut out),
                mut other => {
                    if let Some(element) = other.element_mut() {
                        let nested = std::mem::take(&mut element.children);
                        element.children = self.process_all(nested);
                    }
                    out.push(Segment::Node(other));
                }
            }
        }
        out
    }

    fn split_text(&self, run: TextNode, out: &mut Vec<Segment>) {
        let mut last = 0;
        let mut split = false;
        for caps in INLINE_ANCHOR.captures_iter(&run.text) {
            let (Some(whole), Some(kind), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let Some(kind) = AnchorKind::from_marker(kind.as_str()) else {
                continue;
            };
            let id = id.as_str().trim().to_string();
            if !self.known.contains_key(&(kind, id.clone())) {
                continue;
            }
            if whole.start() > last {
                out.push(Segment::Node(DocumentNode::Text(
                    run.with_text(&run.text[last..whole.start()]),
                )));
            }
            out.push(Segment::Marker {
                kind,
                id,
                literal: whole.as_str().to_string(),
                template: run.clone(),
            });
            last = whole.end();
            split = true;
        }
        if !split {
            out.push(Segment::Node(DocumentNode::Text(run)));
        } else if last < run.text.len() {
            out.push(Segment::Node(DocumentNode::Text(run.with_text(&run.text[last..]))));
        }
    }

    fn render(&mut self, kind: AnchorKind, id: &str) -> Vec<DocumentNode> {
        let Some(anchor) = self.known.get(&(kind, id.to_string())).copied() else {
            return Vec::new();
        };
        if !self.used.iter().any(|u| u == id) {
            self.used.push(id.to_string());
        }
        let ctx = RenderContext {
            anchor,
            questions: self.input.questions,
            answers: self.input.answers,
            snippets: self.snippets,
        };
        self.renderers.render(&ctx)
    }

    fn paragraph(&mut self, paragraph: ElementNode) -> Vec<DocumentNode> {
        let mut template = paragraph;
        let children = std::mem::take(&mut template.children);
        let segments = self.segments(children);

        if !segments.iter().any(|s| matches!(s, Segment::Marker { .. })) {
            let nodes = segments
                .into_iter()
                .filter_map(|s| match s {
                    Segment::Node(node) => Some(node),
                    Segment::Marker { .. } => None,
                })
                .collect();
            let nodes = trim_edges(nodes, true, true);
            return if nodes.is_empty() {
                Vec::new()
            } else {
                vec![DocumentNode::Paragraph(template.with_children(nodes))]
            };
        }

        let mut out = Vec::new();
        let mut current: Vec<DocumentNode> = Vec::new();
        let mut inserted = false;
        for segment in segments {
            match segment {
                Segment::Node(node) => current.push(node),
                Segment::Marker {
                    kind,
                    id,
                    literal,
                    template: run,
                } => {
                    let rendered = self.render(kind, &id);
                    if rendered.is_empty() {
                        current.push(DocumentNode::Text(run.with_text(literal)));
                        continue;
                    }
                    let chunk = trim_edges(std::mem::take(&mut current), inserted, true);
                    if !chunk.is_empty() {
                        out.push(DocumentNode::Paragraph(template.with_children(chunk)));
                    }
                    out.extend(rendered);
                    inserted = true;
                }
            }
        }
        let chunk = trim_edges(current, inserted, false);
        if !chunk.is_empty() {
            out.push(DocumentNode::Paragraph(template.with_children(chunk)));
        }
        out
    }

    fn heading(&mut self, heading: HeadingNode) -> Vec<DocumentNode> {
        let HeadingNode { tag, mut element } = heading;
        let children = std::mem::take(&mut element.children);
        let mut kept = Vec::new();
        let mut insertions = Vec::new();
        for segment in self.segments(children) {
            match segment {
                Segment::Node(node) => kept.push(node),
                Segment::Marker {
                    kind,
                    id,
                    literal,
                    template,
                } => {
                    let rendered = self.render(kind, &id);
                    if rendered.is_empty() {
                        kept.push(DocumentNode::Text(template.with_text(literal)));
                    } else {
                        insertions.extend(rendered);
                    }
                }
            }
        }
        element.children = join_heading_runs(kept);
        let heading = DocumentNode::Heading(HeadingNode { tag, element });
        std::iter::once(heading).chain(insertions).collect()
    }

    fn auto_insert(&mut self, children: &mut Vec<DocumentNode>) -> Vec<String> {
        let mut inserted: Vec<String> = Vec::new();
        for id in self.input.missing {
            let id = id.trim();
            if self.used.iter().any(|u| u == id) || inserted.iter().any(|u| u == id) {
                continue;
            }
            let Some(kind) = [AnchorKind::Table, AnchorKind::TitlePreset]
                .into_iter()
                .find(|kind| self.known.contains_key(&(*kind, id.to_string())))
            else {
                continue;
            };
            let rendered = self.render(kind, id);
            if rendered.is_empty() {
                let label = match kind {
                    AnchorKind::Table => "Table",
                    AnchorKind::TitlePreset => "Title",
                };
                children.push(DocumentNode::text_paragraph(format!(
                    "{label} {id} not found in the generated text."
                )));
                continue;
            }
            if kind == AnchorKind::Table {
                children.push(DocumentNode::text_paragraph(format!(
                    "Table {id} inserted automatically (marker missing)."
                )));
            }
            children.extend(rendered);
            inserted.push(id.to_string());
        }
        inserted
    }
}

/// Trim whitespace from the outer text runs, dropping runs left empty
fn trim_edges(mut nodes: Vec<DocumentNode>, start: bool, end: bool) -> Vec<DocumentNode> {
    if start {
        while let Some(DocumentNode::Text(run)) = nodes.first_mut() {
            let trimmed = run.text.trim_start();
            if trimmed.is_empty() {
                nodes.remove(0);
                continue;
            }
            run.text = trimmed.to_string();
            break;
        }
    }
    if end {
        while let Some(DocumentNode::Text(run)) = nodes.last_mut() {
            let trimmed = run.text.trim_end();
            if trimmed.is_empty() {
                nodes.pop();
                continue;
            }
            run.text = trimmed.to_string();
            break;
        }
    }
    nodes
}

/// Recombine all-text heading content into one run
fn join_heading_runs(children: Vec<DocumentNode>) -> Vec<DocumentNode> {
    let runs: Vec<&TextNode> = children
        .iter()
        .filter_map(|c| match c {
            DocumentNode::Text(t) => Some(t),
            _ => None,
        })
        .collect();
    if runs.is_empty() || runs.len() != children.len() {
        return children;
    }
    let joined = runs
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let combined = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if combined.is_empty() {
        return Vec::new();
    }
    vec![DocumentNode::Text(runs[0].with_text(combined))]
}
