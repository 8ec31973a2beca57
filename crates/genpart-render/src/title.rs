//! Styled title renderer
//!
//! Format resolution order: the question's inline override, then the named
//! preset, then a plain bold paragraph.

use crate::error::RenderError;
use crate::registry::{AnchorRenderer, RenderContext};
use genpart_doc::node::{format, heading_tag};
use genpart_doc::schema::{
    DecorFill, FontSize, TitleAlign, TitleCase, TitleDecor, TitleFormatSpec, TitleKind,
};
use genpart_doc::{AnchorKind, DocumentNode, ElementNode, HeadingNode, TextNode};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Named title formats
#[derive(Debug, Clone)]
pub struct TitlePresetRegistry {
    presets: HashMap<String, TitleFormatSpec>,
}

impl Default for TitlePresetRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "title-main",
            TitleFormatSpec {
                kind: TitleKind::Heading,
                level: Some(1),
                align: Some(TitleAlign::Center),
                bold: true,
                case: TitleCase::Uppercase,
                ..TitleFormatSpec::default()
            },
        );
        registry.register(
            "title-section",
            TitleFormatSpec {
                kind: TitleKind::Heading,
                level: Some(2),
                bold: true,
                ..TitleFormatSpec::default()
            },
        );
        registry.register(
            "subtitle",
            TitleFormatSpec {
                kind: TitleKind::Heading,
                level: Some(3),
                italic: true,
                ..TitleFormatSpec::default()
            },
        );
        registry.register(
            "boxed-section",
            TitleFormatSpec {
                bold: true,
                decor: Some(TitleDecor {
                    weight: Some("thin".into()),
                    color: Some("gray".into()),
                    fill: Some(DecorFill {
                        kind: "token".into(),
                        token: Some("surface-muted".into()),
                        color: None,
                    }),
                }),
                ..TitleFormatSpec::default()
            },
        );
        registry.register(
            "list-label",
            TitleFormatSpec {
                kind: TitleKind::ListItem,
                bold: true,
                ..TitleFormatSpec::default()
            },
        );
        registry
    }
}

impl TitlePresetRegistry {
    /// Registry with no presets
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            presets: HashMap::new(),
        }
    }

    /// Register or replace a preset
    pub fn register(&mut self, id: impl Into<String>, format: TitleFormatSpec) {
        self.presets.insert(id.into(), format);
    }

    /// Preset by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TitleFormatSpec> {
        self.presets.get(id)
    }
}

/// Renders `CR:TITLE_PRESET` anchors
#[derive(Debug, Clone, Default)]
pub struct TitleRenderer {
    presets: TitlePresetRegistry,
}

impl TitleRenderer {
    /// Create renderer with custom presets
    #[inline]
    #[must_use]
    pub fn new(presets: TitlePresetRegistry) -> Self {
        Self { presets }
    }
}

impl AnchorRenderer for TitleRenderer {
    fn kind(&self) -> AnchorKind {
        AnchorKind::TitlePreset
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<Vec<DocumentNode>, RenderError> {
        let question = ctx.question()?;
        let preset_id = ctx
            .anchor
            .preset_id
            .as_deref()
            .or_else(|| question.preset_id());

        let fallback = TitleFormatSpec {
            bold: true,
            ..TitleFormatSpec::default()
        };
        let spec = match (&question.title_format_override, preset_id.and_then(|id| self.presets.get(id))) {
            (Some(spec), _) | (None, Some(spec)) => spec,
            (None, None) => {
                warn!("unknown title preset {:?} for question {}", preset_id, question.id);
                &fallback
            }
        };

        let raw = answer_text(ctx.answers.get(&question.id))
            .or_else(|| Some(question.title.trim().to_string()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| question.id.clone());
        Ok(render_title(&raw, spec))
    }
}

fn answer_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

/// Apply a case transform
#[must_use]
pub fn apply_case(text: &str, case: TitleCase) -> String {
    match case {
        TitleCase::None => text.to_string(),
        TitleCase::Uppercase => text.to_uppercase(),
        TitleCase::Lowercase => text.to_lowercase(),
        TitleCase::Capitalize => {
            let mut out = String::with_capacity(text.len());
            let mut at_word_start = true;
            for ch in text.chars() {
                if at_word_start && ch.is_alphabetic() {
                    out.extend(ch.to_uppercase());
                } else {
                    out.push(ch);
                }
                at_word_start = ch.is_whitespace();
            }
            out
        }
    }
}

fn inline_style(spec: &TitleFormatSpec) -> Option<String> {
    let mut parts = Vec::new();
    match &spec.font_size {
        #[allow(clippy::cast_possible_truncation)]
        Some(FontSize::Points(pt)) if pt.fract() == 0.0 => parts.push(format!("font-size: {}pt", *pt as i64)),
        Some(FontSize::Points(pt)) => parts.push(format!("font-size: {pt}pt")),
        Some(FontSize::Css(css)) if !css.trim().is_empty() => parts.push(format!("font-size: {}", css.trim())),
        _ => {}
    }
    if let Some(color) = spec.font_color.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        parts.push(format!("color: {color}"));
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}

/// Build the title block for `text` under `spec`
#[must_use]
pub fn render_title(text: &str, spec: &TitleFormatSpec) -> Vec<DocumentNode> {
    let text = format!(
        "{}{}{}",
        spec.prefix.as_deref().unwrap_or(""),
        apply_case(text, spec.case),
        spec.suffix.as_deref().unwrap_or("")
    );

    let mut bits = 0;
    if spec.bold {
        bits |= format::BOLD;
    }
    if spec.italic {
        bits |= format::ITALIC;
    }
    if spec.underline {
        bits |= format::UNDERLINE;
    }
    let mut run = TextNode::new(text).with_format(bits);
    if let Some(style) = inline_style(spec) {
        run = run.with_style(style);
    }

    let mut element = ElementNode::new(vec![DocumentNode::Text(run)]);
    if let Some(align) = spec.align {
        element = element.with_attr("format", align.as_str());
    }

    let block = match spec.kind {
        TitleKind::Paragraph => DocumentNode::Paragraph(element),
        TitleKind::Heading => DocumentNode::Heading(HeadingNode {
            tag: heading_tag(spec.level.unwrap_or(2)),
            element,
        }),
        TitleKind::ListItem => DocumentNode::List(
            ElementNode::new(vec![DocumentNode::ListItem(element)]).with_attr("listType", "bullet"),
        ),
    };

    match &spec.decor {
        Some(decor) => {
            let mut wrapper = ElementNode::new(vec![block])
                .with_attr("weight", decor.weight.clone().unwrap_or_else(|| "thin".into()));
            if let Some(color) = &decor.color {
                wrapper = wrapper.with_attr("color", color.clone());
            }
            if let Some(fill) = &decor.fill {
                wrapper = wrapper.with_attr("fill", serde_json::to_value(fill).unwrap_or(Value::Null));
            }
            vec![DocumentNode::Decor(wrapper), DocumentNode::empty_paragraph()]
        }
        None => vec![block],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SnippetLibrary;
    use genpart_doc::{AnchorSpec, Answers, QuestionKind, QuestionRecord};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(question: QuestionRecord, answers: &Answers) -> Vec<DocumentNode> {
        let anchor = AnchorSpec::title(question.id.clone(), question.preset_id().unwrap_or("none").to_string());
        let snippets = SnippetLibrary::new();
        let questions = [question];
        let ctx = RenderContext {
            anchor: &anchor,
            questions: &questions,
            answers,
            snippets: &snippets,
        };
        TitleRenderer::default().render(&ctx).unwrap()
    }

    fn first_run(node: &DocumentNode) -> TextNode {
        let mut found = None;
        genpart_doc::traverse::visit(node, &mut |n| {
            if found.is_none() {
                if let DocumentNode::Text(t) = n {
                    found = Some(t.clone());
                }
            }
        });
        found.unwrap()
    }

    #[test]
    fn main_title_preset() {
        let question = QuestionRecord::new("h1", QuestionKind::Heading, "bilan sensoriel").with_title_preset("title-main");
        let nodes = render(question, &Answers::new());
        assert_eq!(nodes.len(), 1);
        let DocumentNode::Heading(h) = &nodes[0] else { panic!("heading expected") };
        assert_eq!(h.tag, "h1");
        assert_eq!(h.element.attr_str("format"), Some("center"));
        let run = first_run(&nodes[0]);
        assert_eq!(run.text, "BILAN SENSORIEL");
        assert_eq!(run.format, Some(format::BOLD));
    }

    #[test]
    fn answer_wins_over_title() {
        let question = QuestionRecord::new("h1", QuestionKind::Heading, "Title").with_title_preset("subtitle");
        let answers = json!({ "h1": "  Custom " });
        let nodes = render(question, answers.as_object().unwrap());
        assert_eq!(first_run(&nodes[0]).text, "Custom");
        assert_eq!(first_run(&nodes[0]).format, Some(format::ITALIC));
    }

    #[test]
    fn override_with_decor_and_style() {
        let mut question = QuestionRecord::new("q", QuestionKind::Heading, "le grand titre").with_title_preset("title-main");
        question.title_format_override = Some(TitleFormatSpec {
            kind: TitleKind::ListItem,
            underline: true,
            case: TitleCase::Capitalize,
            font_size: Some(FontSize::Points(14.0)),
            font_color: Some("#333".into()),
            prefix: Some("> ".into()),
            decor: Some(TitleDecor {
                weight: None,
                color: Some("blue".into()),
                fill: None,
            }),
            ..TitleFormatSpec::default()
        });
        let nodes = render(question, &Answers::new());
        assert_eq!(nodes.len(), 2);
        let DocumentNode::Decor(decor) = &nodes[0] else { panic!("decor expected") };
        assert_eq!(decor.attr_str("weight"), Some("thin"));
        assert_eq!(decor.attr_str("color"), Some("blue"));
        assert_eq!(decor.children[0].kind(), "list");
        let run = first_run(&nodes[0]);
        assert_eq!(run.text, "> Le Grand Titre");
        assert_eq!(run.format, Some(format::UNDERLINE));
        assert_eq!(run.style.as_deref(), Some("font-size: 14pt; color: #333"));
    }

    #[test]
    fn unknown_preset_falls_back_to_bold_paragraph() {
        let question = QuestionRecord::new("q", QuestionKind::Heading, "").with_title_preset("nope");
        let nodes = render(question, &Answers::new());
        assert_eq!(nodes[0].kind(), "paragraph");
        let run = first_run(&nodes[0]);
        assert_eq!(run.text, "q");
        assert_eq!(run.format, Some(format::BOLD));
    }

    #[test]
    fn capitalize_each_word() {
        assert_eq!(apply_case("hello  wide world", TitleCase::Capitalize), "Hello  Wide World");
        assert_eq!(apply_case("MiXed", TitleCase::Lowercase), "mixed");
    }
}
