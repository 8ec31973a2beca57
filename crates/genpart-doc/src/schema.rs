//! Question schema
//!
//! A schema is an ordered array of [`QuestionRecord`]s. Only the payload the
//! engine interprets is typed; every other key survives in `extra` so reverse
//! synchronization can re-hydrate the exact authored record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Question type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    /// Free text
    Notes,
    /// Choice among options
    MultiChoice,
    /// Numeric scale
    Scale,
    /// Structured table
    Table,
    /// Group heading
    Heading,
    /// Unrecognised type, behaves like free text
    Other(String),
}

impl QuestionKind {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Notes => "notes",
            Self::MultiChoice => "multi-choice",
            Self::Scale => "scale",
            Self::Table => "table",
            Self::Heading => "heading",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for QuestionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "notes" => Self::Notes,
            "multi-choice" => Self::MultiChoice,
            "scale" => Self::Scale,
            "table" => Self::Table,
            "heading" => Self::Heading,
            _ => Self::Other(value),
        }
    }
}

impl From<QuestionKind> for String {
    fn from(value: QuestionKind) -> Self {
        match value {
            QuestionKind::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// One input field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    /// Stable identity
    pub id: String,
    /// Question type
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Table definition, for table questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDef>,
    /// Named title preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_preset_id: Option<String>,
    /// Inline title format, wins over the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_format_override: Option<TitleFormatSpec>,
    /// Cached snippet used as a bespoke table layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast_snippet_id: Option<String>,
    /// Remaining payload (options, scale, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuestionRecord {
    /// Create question with no payload
    #[must_use]
    pub fn new(id: impl Into<String>, kind: QuestionKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            table: None,
            title_preset_id: None,
            title_format_override: None,
            ast_snippet_id: None,
            extra: Map::new(),
        }
    }

    /// With table definition
    #[inline]
    #[must_use]
    pub fn with_table(mut self, table: TableDef) -> Self {
        self.table = Some(table);
        self
    }

    /// With title preset id
    #[inline]
    #[must_use]
    pub fn with_title_preset(mut self, preset_id: impl Into<String>) -> Self {
        self.title_preset_id = Some(preset_id.into());
        self
    }

    /// Whether this question opens a group
    #[inline]
    #[must_use]
    pub fn is_heading(&self) -> bool {
        self.kind == QuestionKind::Heading
    }

    /// Anchor id when this is a table flagged for anchor insertion
    #[must_use]
    pub fn table_anchor_id(&self) -> Option<&str> {
        if self.kind != QuestionKind::Table {
            return None;
        }
        self.table.as_ref().and_then(TableDef::anchor_id)
    }

    /// Non-blank title preset id
    #[must_use]
    pub fn preset_id(&self) -> Option<&str> {
        self.title_preset_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Read a schema array, skipping entries without a usable `id` and `type`
///
/// Entries whose typed payload is malformed keep their identity and carry the
/// whole payload in `extra`.
#[must_use]
pub fn parse_schema(value: &Value) -> Vec<QuestionRecord> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items.iter().filter_map(parse_question).collect()
}

fn parse_question(item: &Value) -> Option<QuestionRecord> {
    let object = item.as_object()?;
    let id = object.get("id").and_then(Value::as_str).filter(|s| !s.is_empty());
    let kind = object.get("type").and_then(Value::as_str).filter(|s| !s.is_empty());
    let (Some(id), Some(kind)) = (id, kind) else {
        warn!("skipping schema entry without id/type");
        return None;
    };
    match QuestionRecord::deserialize(item) {
        Ok(question) => Some(question),
        Err(err) => {
            warn!("question {} has a malformed payload: {}", id, err);
            let mut extra = object.clone();
            extra.remove("id");
            extra.remove("type");
            let title = extra
                .remove("title")
                .and_then(|t| t.as_str().map(str::to_string))
                .unwrap_or_default();
            let mut question = QuestionRecord::new(id, QuestionKind::from(kind.to_string()), title);
            question.extra = extra;
            Some(question)
        }
    }
}

/// Encode a schema array
#[must_use]
pub fn schema_to_value(questions: &[QuestionRecord]) -> Value {
    serde_json::to_value(questions).unwrap_or_else(|_| Value::Array(Vec::new()))
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDef {
    /// Columns in display order
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    /// Row groups in display order
    #[serde(default)]
    pub row_groups: Vec<RowGroup>,
    /// Whether a free-text comment is collected
    #[serde(default)]
    pub comment: bool,
    /// Render as an anchor instead of generated text
    #[serde(default)]
    pub insert_as_anchor: bool,
    /// Anchor id, e.g. `T1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<String>,
    /// Remaining attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableDef {
    /// Trimmed anchor id when anchor insertion is enabled
    #[must_use]
    pub fn anchor_id(&self) -> Option<&str> {
        if !self.insert_as_anchor {
            return None;
        }
        self.anchor_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// All declared rows across groups
    pub fn rows(&self) -> impl Iterator<Item = &RowDef> {
        self.row_groups.iter().flat_map(|g| g.rows.iter())
    }
}

/// Table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Column id, key into row answers
    pub id: String,
    /// Header label
    #[serde(default)]
    pub label: String,
    /// Cell value type
    #[serde(default)]
    pub value_type: ValueType,
    /// Conditional coloring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coloring: Option<ColoringDef>,
    /// Remaining attributes (options, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Table cell value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    /// Free text
    #[default]
    Text,
    /// Number
    Number,
    /// Checkbox
    Bool,
    /// Single choice
    Choice,
    /// Multiple choice
    MultiChoice,
    /// Multiple choice with per-row options
    MultiChoiceRow,
    /// Image reference
    Image,
    /// Unrecognised type
    #[serde(other)]
    Unknown,
}

/// Row group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowGroup {
    /// Group id
    pub id: String,
    /// Group title
    #[serde(default)]
    pub title: String,
    /// Rows in display order
    #[serde(default)]
    pub rows: Vec<RowDef>,
}

/// Table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDef {
    /// Row id, key into table answers
    pub id: String,
    /// Row label
    #[serde(default)]
    pub label: String,
}

/// Column coloring: a named preset or an inline rule list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColoringDef {
    /// Preset id, resolved first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    /// Inline rules, evaluated top to bottom
    #[serde(default)]
    pub rules: Vec<ColorRule>,
}

/// Conditional color rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    /// Condition
    #[serde(rename = "if")]
    pub condition: Condition,
    /// Color applied on match
    pub color: String,
}

impl ColorRule {
    /// Create rule
    #[inline]
    #[must_use]
    pub fn new(condition: Condition, color: impl Into<String>) -> Self {
        Self {
            condition,
            color: color.into(),
        }
    }
}

/// Rule condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Condition {
    /// `value < x`
    Lt {
        /// Threshold
        value: Value,
    },
    /// `value <= x`
    Lte {
        /// Threshold
        value: Value,
    },
    /// `value > x`
    Gt {
        /// Threshold
        value: Value,
    },
    /// `value >= x`
    Gte {
        /// Threshold
        value: Value,
    },
    /// Equality, numeric when both sides are numbers
    Eq {
        /// Expected value
        value: Value,
    },
    /// Negated equality
    Neq {
        /// Rejected value
        value: Value,
    },
    /// `[min, max)`, or `[min, max]` when inclusive
    Between {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
        /// Include the upper bound
        #[serde(default)]
        inclusive: bool,
    },
    /// Membership
    In {
        /// Accepted values
        #[serde(default)]
        values: Vec<Value>,
    },
    /// Non-membership
    NotIn {
        /// Rejected values
        #[serde(default)]
        values: Vec<Value>,
    },
    /// Absent or blank
    IsEmpty,
    /// Present and not blank
    IsNotEmpty,
}

/// Title block shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TitleKind {
    /// Heading block
    Heading,
    /// Paragraph block
    #[default]
    Paragraph,
    /// Single bulleted list item
    ListItem,
}

/// Title alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleAlign {
    /// Left
    Left,
    /// Center
    Center,
    /// Right
    Right,
    /// Justify
    Justify,
}

impl TitleAlign {
    /// Element `format` value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }
}

/// Title case transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleCase {
    /// Unchanged
    #[default]
    None,
    /// UPPERCASE
    Uppercase,
    /// Capitalize Each Word
    Capitalize,
    /// lowercase
    Lowercase,
}

/// Font size, points or raw CSS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontSize {
    /// Size in points
    Points(f64),
    /// Raw CSS value, e.g. `1.2em`
    Css(String),
}

/// Styled title format
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleFormatSpec {
    /// Block shape
    #[serde(default)]
    pub kind: TitleKind,
    /// Heading level (1-6)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Alignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TitleAlign>,
    /// Bold
    #[serde(default)]
    pub bold: bool,
    /// Italic
    #[serde(default)]
    pub italic: bool,
    /// Underline
    #[serde(default)]
    pub underline: bool,
    /// Case transform
    #[serde(default)]
    pub case: TitleCase,
    /// Font size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    /// Font color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    /// Text before the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Text after the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Border and fill wrapper
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decor: Option<TitleDecor>,
}

/// Border and fill applied around a title block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TitleDecor {
    /// Border weight (`none`, `thin`, `medium`, `thick`, `dashed`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    /// Border color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Background fill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<DecorFill>,
}

/// Background fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorFill {
    /// `none`, `token` or `custom`
    pub kind: String,
    /// Palette token when `kind` is `token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Hex color when `kind` is `custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_skips_unusable_entries() {
        let schema = parse_schema(&json!([
            { "id": "h1", "type": "heading", "title": "Intro" },
            { "type": "notes" },
            "garbage",
            { "id": "q1", "type": "notes", "title": "Notes", "options": ["a"] }
        ]));
        assert_eq!(schema.len(), 2);
        assert!(schema[0].is_heading());
        assert_eq!(schema[1].extra.get("options"), Some(&json!(["a"])));
    }

    #[test]
    fn malformed_payload_keeps_identity() {
        let raw = json!({ "id": "t1", "type": "table", "title": "T", "table": { "columns": "nope" } });
        let schema = parse_schema(&json!([raw.clone()]));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].kind, QuestionKind::Table);
        assert!(schema[0].table.is_none());
        assert_eq!(schema_to_value(&schema), json!([raw]));
    }

    #[test]
    fn unknown_kind_round_trips() {
        let schema = parse_schema(&json!([{ "id": "x", "type": "signature" }]));
        assert_eq!(schema[0].kind, QuestionKind::Other("signature".into()));
        assert_eq!(schema_to_value(&schema)[0]["type"], "signature");
    }

    #[test]
    fn table_anchor_requires_flag_and_id() {
        let mut table = TableDef {
            anchor_id: Some(" T1 ".into()),
            ..TableDef::default()
        };
        let q = QuestionRecord::new("t", QuestionKind::Table, "T").with_table(table.clone());
        assert_eq!(q.table_anchor_id(), None);
        table.insert_as_anchor = true;
        let q = q.with_table(table);
        assert_eq!(q.table_anchor_id(), Some("T1"));
    }

    #[test]
    fn rule_wire_format() {
        let rule: ColorRule = serde_json::from_value(json!({
            "if": { "op": "between", "min": -3, "max": -1 },
            "color": "orange"
        }))
        .unwrap();
        assert_eq!(
            rule.condition,
            Condition::Between { min: -3.0, max: -1.0, inclusive: false }
        );
        let rule: ColorRule =
            serde_json::from_value(json!({ "if": { "op": "isEmpty" }, "color": "gray" })).unwrap();
        assert_eq!(rule.condition, Condition::IsEmpty);
    }
}
