//! Answers rendered as markdown prompt content
//!
//! Anchored tables and preset titles emit their marker line instead of
//! content; the generation service reproduces the marker and the assembler
//! renders it structurally.

use crate::anchor::marker_line;
use crate::table::CHECK_GLYPH;
use genpart_doc::answers::has_meaningful_value;
use genpart_doc::schema::{ColumnDef, TableDef, ValueType};
use genpart_doc::{AnchorSpec, Answers, QuestionKind, QuestionRecord};
use serde_json::Value;

/// One markdown block per question that has something to say
#[must_use]
pub fn answers_to_md_blocks(questions: &[QuestionRecord], answers: &Answers) -> Vec<String> {
    let mut blocks = Vec::new();
    for question in questions {
        match question.kind {
            QuestionKind::Table => {
                if let Some(anchor_id) = question.table_anchor_id() {
                    blocks.push(marker_line(&AnchorSpec::table(anchor_id, question.id.clone())));
                    continue;
                }
                let Some(table) = &question.table else {
                    continue;
                };
                let block = table_markdown(&question.title, table, answers.get(&question.id));
                if !block.trim().is_empty() {
                    blocks.push(block);
                }
            }
            QuestionKind::Heading => match question.preset_id() {
                Some(preset) => blocks.push(marker_line(&AnchorSpec::title(question.id.clone(), preset))),
                None => blocks.push(format!("### {}", question.title.trim())),
            },
            _ => {
                if let Some(block) = answers.get(&question.id).and_then(|v| field_markdown(question, v)) {
                    blocks.push(block);
                }
            }
        }
    }
    blocks
}

/// Blocks joined by blank lines
#[must_use]
pub fn answers_to_markdown(questions: &[QuestionRecord], answers: &Answers) -> String {
    answers_to_md_blocks(questions, answers).join("\n\n")
}

fn field_markdown(question: &QuestionRecord, value: &Value) -> Option<String> {
    if !has_meaningful_value(value) {
        return None;
    }
    let text = match value {
        Value::Object(map) => {
            let selected = match (map.get("options"), map.get("option")) {
                (Some(Value::Array(options)), _) => options
                    .iter()
                    .map(scalar_text)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", "),
                (_, Some(option)) => scalar_text(option),
                _ => String::new(),
            };
            let comment = map.get("comment").map(scalar_text).unwrap_or_default();
            if comment.is_empty() {
                selected
            } else {
                format!("{selected}\n\n> **Comment**: {comment}")
            }
        }
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other),
    };
    Some(format!("{}: {}", question.title, text))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "yes".to_string(),
        _ => String::new(),
    }
}

fn cell_has_value(column: &ColumnDef, value: Option<&Value>) -> bool {
    match (column.value_type, value) {
        (_, None | Some(Value::Null)) => false,
        (ValueType::Bool, Some(v)) => v.is_boolean(),
        (ValueType::MultiChoice | ValueType::MultiChoiceRow, Some(v)) => {
            v.as_array().is_some_and(|items| !items.is_empty())
        }
        (_, Some(v)) => has_meaningful_value(v),
    }
}

fn cell_text(column: &ColumnDef, value: Option<&Value>) -> String {
    match (column.value_type, value) {
        (ValueType::Bool, Some(Value::Bool(true))) => {
            if column.label.is_empty() {
                CHECK_GLYPH.to_string()
            } else {
                column.label.clone()
            }
        }
        (ValueType::Bool, _) | (_, None) => String::new(),
        (ValueType::MultiChoice | ValueType::MultiChoiceRow, Some(Value::Array(items))) => items
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(", "),
        (_, Some(v)) => scalar_text(v),
    }
}

/// Markdown table keeping only columns and rows that hold answers
fn table_markdown(title: &str, table: &TableDef, data: Option<&Value>) -> String {
    let cell = |row_id: &str, column: &ColumnDef| data.and_then(|d| d.get(row_id)).and_then(|r| r.get(&column.id));

    let kept: Vec<&ColumnDef> = table
        .columns
        .iter()
        .filter(|column| table.rows().any(|row| cell_has_value(column, cell(&row.id, column))))
        .collect();

    let mut out = format!("**{title}**\n\n");
    let mut has_body = false;
    if !kept.is_empty() {
        let header: Vec<&str> = std::iter::once("Row")
            .chain(kept.iter().map(|c| c.label.as_str()))
            .collect();
        let separator = vec!["---"; kept.len() + 1];
        out.push_str(&format!("| {} |\n| {} |", header.join(" | "), separator.join(" | ")));
        for row in table.rows() {
            if !kept.iter().any(|column| cell_has_value(column, cell(&row.id, column))) {
                continue;
            }
            let cells: Vec<String> = std::iter::once(row.label.clone())
                .chain(kept.iter().map(|column| cell_text(column, cell(&row.id, column))))
                .collect();
            out.push_str(&format!("\n| {} |", cells.join(" | ")));
        }
        has_body = true;
    }

    let comment = data
        .and_then(|d| d.get("comment"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty());
    match (has_body, comment) {
        (false, None) => String::new(),
        (_, Some(comment)) => {
            if !has_body {
                out.truncate(out.trim_end().len());
            }
            out.push_str(&format!("\n\n> **Comment**: {comment}"));
            out
        }
        (true, None) => out,
    }
}
