//! Table anchor renderer
//!
//! Two paths:
//! - the question references a cached snippet: its slots are hydrated from
//!   the answers and the snippet is returned as-is
//! - otherwise a table is synthesized from the definition, with conditional
//!   colors applied per column

use crate::error::RenderError;
use crate::registry::{AnchorRenderer, RenderContext};
use crate::rules::ColorPresets;
use genpart_doc::answers::{display_value, resolve_answer, resolve_path};
use genpart_doc::node::format;
use genpart_doc::schema::{ColumnDef, TableDef, ValueType};
use genpart_doc::{traverse, AnchorKind, Answers, DocumentNode, ElementNode, QuestionKind, TextNode};
use serde_json::Value;
use tracing::debug;

/// Glyph shown for a checked boolean cell
pub const CHECK_GLYPH: &str = "\u{2713}";

/// Renders `CR:TBL` anchors
#[derive(Debug, Clone, Default)]
pub struct TableRenderer {
    presets: ColorPresets,
}

impl TableRenderer {
    /// Create renderer with custom color presets
    #[inline]
    #[must_use]
    pub fn new(presets: ColorPresets) -> Self {
        Self { presets }
    }

    fn synthesize(&self, question_id: &str, title: &str, table: &TableDef, answers: &Answers) -> Vec<DocumentNode> {
        let data = answers.get(question_id);
        let comment = table
            .comment
            .then(|| data.and_then(|d| d.get("comment")).and_then(Value::as_str))
            .flatten()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| DocumentNode::text_paragraph(format!("Comment: {c}")));

        if table.columns.is_empty() && table.row_groups.is_empty() {
            return match comment {
                Some(comment) => vec![comment],
                None => vec![DocumentNode::text_paragraph(format!(
                    "Table {question_id}: no data available."
                ))],
            };
        }

        let mut header = vec![cell(true, DocumentNode::text(title))];
        header.extend(
            table
                .columns
                .iter()
                .map(|c| cell(true, DocumentNode::text(column_label(c)))),
        );
        let mut rows = vec![DocumentNode::TableRow(ElementNode::new(header))];

        for row in table.rows() {
            let mut cells = vec![cell(false, DocumentNode::text(row.label.as_str()))];
            for column in &table.columns {
                let value = data
                    .and_then(|d| d.get(&row.id))
                    .and_then(|r| r.get(&column.id))
                    .unwrap_or(&Value::Null);
                let mut run = TextNode::new(format_cell(column.value_type, value));
                if let Some(color) = self.presets.color(column.coloring.as_ref(), value) {
                    run = run
                        .with_format(format::BOLD)
                        .with_style(format!("color: {color}; font-weight: bold"));
                }
                cells.push(cell(false, DocumentNode::Text(run)));
            }
            rows.push(DocumentNode::TableRow(ElementNode::new(cells)));
        }

        let mut out = vec![
            DocumentNode::empty_paragraph(),
            DocumentNode::Table(ElementNode::new(rows)),
            DocumentNode::empty_paragraph(),
        ];
        out.extend(comment);
        out
    }
}

impl AnchorRenderer for TableRenderer {
    fn kind(&self) -> AnchorKind {
        AnchorKind::Table
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<Vec<DocumentNode>, RenderError> {
        let question = ctx.question()?;
        let table = match (&question.kind, &question.table) {
            (QuestionKind::Table, Some(table)) => table,
            _ => return Err(RenderError::NotATable(question.id.clone())),
        };

        if let Some(snippet) = question
            .ast_snippet_id
            .as_deref()
            .and_then(|id| ctx.snippets.get(id))
        {
            debug!("hydrating snippet for table {}", ctx.anchor.id);
            return Ok(hydrate(snippet, &question.id, ctx.answers));
        }

        Ok(self.synthesize(&question.id, &question.title, table, ctx.answers))
    }
}

/// Replace snippet slots with the answers they are bound to
///
/// Paths resolve against the whole answer map first, then against the
/// question's own answer. Unresolved slots become empty text.
#[must_use]
pub fn hydrate(snippet: &[DocumentNode], question_id: &str, answers: &Answers) -> Vec<DocumentNode> {
    traverse::splice(snippet.to_vec(), &mut |node| {
        let DocumentNode::Slot(slot) = node else {
            return None;
        };
        let text = slot
            .path()
            .and_then(|path| {
                resolve_answer(answers, path)
                    .or_else(|| answers.get(question_id).and_then(|v| resolve_path(v, path)))
            })
            .map(display_value)
            .unwrap_or_default();
        Some(vec![DocumentNode::text(text)])
    })
}

fn column_label(column: &ColumnDef) -> &str {
    if column.label.trim().is_empty() {
        &column.id
    } else {
        &column.label
    }
}

fn cell(header: bool, content: DocumentNode) -> DocumentNode {
    DocumentNode::TableCell(
        ElementNode::new(vec![DocumentNode::paragraph(vec![content])])
            .with_attr("headerState", u8::from(header))
            .with_attr("colSpan", 1)
            .with_attr("rowSpan", 1),
    )
}

/// Display text of a cell value
#[must_use]
pub fn format_cell(value_type: ValueType, value: &Value) -> String {
    match (value_type, value) {
        (ValueType::Bool, Value::Bool(true)) => CHECK_GLYPH.to_string(),
        (ValueType::Bool, _) | (ValueType::Image, _) | (_, Value::Null) => String::new(),
        (ValueType::MultiChoice | ValueType::MultiChoiceRow, Value::Array(items)) => items
            .iter()
            .map(display_value)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        (ValueType::MultiChoice | ValueType::MultiChoiceRow, _) => String::new(),
        (_, Value::String(s)) => s.trim().to_string(),
        (_, Value::Number(n)) => n.to_string(),
        (_, Value::Bool(true)) => CHECK_GLYPH.to_string(),
        (_, other) => display_value(other),
    }
}
