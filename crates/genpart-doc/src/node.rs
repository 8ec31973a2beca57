//! Rich-text document tree
//!
//! The tree is a closed sum type discriminated by the wire `type` key:
//! - Free-form author content (paragraphs, headings, text, tables, lists, decor)
//! - Managed nodes owned by synchronization (group headings, placeholders, anchors)
//! - [`DocumentNode::Opaque`] for anything unrecognised or malformed
//!
//! Attributes that are not interpreted here are kept verbatim in `attrs`, so a
//! decode/encode cycle never loses author data. Decoded text runs and
//! containers also remember their wire key order and encode back in it.

use crate::spec::{AnchorKind, EmptyPolicy};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Uninterpreted node attributes
pub type Attrs = Map<String, Value>;

/// Text format bit flags
pub mod format {
    /// Bold text
    pub const BOLD: u32 = 1;
    /// Italic text
    pub const ITALIC: u32 = 2;
    /// Strikethrough text
    pub const STRIKETHROUGH: u32 = 4;
    /// Underlined text
    pub const UNDERLINE: u32 = 8;
}

/// Key order of a decoded JSON object
///
/// Ignored by equality: two nodes with the same content are equal whatever
/// order their keys arrived in.
#[derive(Debug, Clone, Default)]
pub struct KeyOrder(Vec<String>);

impl KeyOrder {
    /// Capture the key order of `value`, empty for non-objects
    #[must_use]
    pub fn of(value: &Value) -> Self {
        Self(
            value
                .as_object()
                .map(|object| object.keys().cloned().collect())
                .unwrap_or_default(),
        )
    }

    /// Whether no order was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reorder `object` to the recorded order; keys not recorded keep their
    /// relative order after the recorded ones
    #[must_use]
    pub fn arrange(&self, object: Map<String, Value>) -> Map<String, Value> {
        let mut entries: Vec<(String, Value)> = object.into_iter().collect();
        entries.sort_by_key(|(key, _)| {
            self.0
                .iter()
                .position(|k| k == key)
                .unwrap_or(self.0.len())
        });
        entries.into_iter().collect()
    }
}

impl PartialEq for KeyOrder {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

/// Generic container node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementNode {
    /// Child nodes in document order
    #[serde(default)]
    pub children: Vec<DocumentNode>,
    /// Remaining attributes (direction, format, indent, version, ...)
    #[serde(flatten)]
    pub attrs: Attrs,
    /// Wire key order when decoded
    #[serde(skip)]
    pub key_order: KeyOrder,
}

impl ElementNode {
    /// Create element with children
    #[inline]
    #[must_use]
    pub fn new(children: Vec<DocumentNode>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    /// Set attribute, builder style
    #[inline]
    #[must_use]
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// String attribute lookup
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Insert attribute only when absent
    pub fn default_attr(&mut self, key: &str, value: impl Into<Value>) {
        if !self.attrs.contains_key(key) {
            self.attrs.insert(key.to_string(), value.into());
        }
    }

    /// Copy of this element with different children
    #[must_use]
    pub fn with_children(&self, children: Vec<DocumentNode>) -> Self {
        Self {
            children,
            attrs: self.attrs.clone(),
            key_order: self.key_order.clone(),
        }
    }
}

/// Heading block (`h1`..`h6`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingNode {
    /// Tag name, e.g. `h2`
    pub tag: String,
    /// Heading content
    #[serde(flatten)]
    pub element: ElementNode,
}

/// Leaf text run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextNode {
    /// Text content
    #[serde(default)]
    pub text: String,
    /// Format bit flags, see [`format`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<u32>,
    /// Inline CSS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Remaining attributes (detail, mode, version, ...)
    #[serde(flatten)]
    pub attrs: Attrs,
    /// Wire key order when decoded
    #[serde(skip)]
    pub key_order: KeyOrder,
}

impl TextNode {
    /// Create plain text run
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// With format flags
    #[inline]
    #[must_use]
    pub fn with_format(mut self, bits: u32) -> Self {
        self.format = Some(bits);
        self
    }

    /// With inline style
    #[inline]
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Copy of this run carrying different text
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Managed heading that opens a question group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHeadingNode {
    /// Heading question id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_id: Option<String>,
    /// Owning group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Tag name, e.g. `h2`
    #[serde(default = "default_heading_tag")]
    pub tag: String,
    /// Visible heading content
    #[serde(flatten)]
    pub element: ElementNode,
}

fn default_heading_tag() -> String {
    "h2".to_string()
}

/// Managed placeholder for a generated region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderNode {
    /// Stable placeholder id
    pub placeholder_id: String,
    /// Owning group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Covered question ids, display order
    pub question_ids: Vec<String>,
    /// Generation recipe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    /// Fallback when no answer is meaningful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_if_empty: Option<EmptyPolicy>,
    /// Dependencies on other placeholders
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    /// Remaining attributes (scope, version, ...)
    #[serde(flatten)]
    pub attrs: Attrs,
}

impl PlaceholderNode {
    /// Create placeholder with canonical scope and version
    #[must_use]
    pub fn new(
        placeholder_id: impl Into<String>,
        group_id: impl Into<String>,
        question_ids: Vec<String>,
    ) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("scope".into(), serde_json::json!({ "type": "questions-list" }));
        attrs.insert("version".into(), Value::from(1));
        Self {
            placeholder_id: placeholder_id.into(),
            group_id: Some(group_id.into()),
            question_ids,
            recipe_id: None,
            policy_if_empty: None,
            deps: Vec::new(),
            attrs,
        }
    }
}

/// Managed marker for structurally rendered content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorNode {
    /// Marker kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_type: Option<AnchorKind>,
    /// Logical anchor id, e.g. `T1`
    pub anchor_id: String,
    /// Owning group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Originating question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    /// Remaining attributes
    #[serde(flatten)]
    pub attrs: Attrs,
}

impl AnchorNode {
    /// Create table anchor marker
    #[must_use]
    pub fn table(anchor_id: &str, group_id: Option<String>, question_id: Option<String>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("version".into(), Value::from(1));
        Self {
            anchor_type: Some(AnchorKind::Table),
            anchor_id: anchor_id.trim().to_string(),
            group_id,
            question_id,
            attrs,
        }
    }
}

/// Slot inside a cached snippet, bound to an answer path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotNode {
    /// Answer path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    /// Legacy answer path key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Remaining attributes
    #[serde(flatten)]
    pub attrs: Attrs,
}

impl SlotNode {
    /// Bound answer path, `slotId` first
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.slot_id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|p| !p.is_empty())
    }
}

/// Document tree node
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentNode {
    /// Tree root
    Root(ElementNode),
    /// Paragraph block
    Paragraph(ElementNode),
    /// Heading block
    Heading(HeadingNode),
    /// Text run
    Text(TextNode),
    /// Table
    Table(ElementNode),
    /// Table row
    TableRow(ElementNode),
    /// Table cell (`headerState` in attrs)
    TableCell(ElementNode),
    /// List (`listType` in attrs)
    List(ElementNode),
    /// List item
    ListItem(ElementNode),
    /// Decorative wrapper (`weight`, `color`, `fill` in attrs)
    Decor(ElementNode),
    /// Managed group heading
    GroupHeading(GroupHeadingNode),
    /// Managed generation placeholder
    Placeholder(PlaceholderNode),
    /// Managed anchor marker
    Anchor(AnchorNode),
    /// Snippet slot
    Slot(SlotNode),
    /// Unrecognised or malformed node, kept verbatim
    Opaque(Value),
}

/// Wire `type` names
pub mod kind {
    /// Root
    pub const ROOT: &str = "root";
    /// Paragraph
    pub const PARAGRAPH: &str = "paragraph";
    /// Heading
    pub const HEADING: &str = "heading";
    /// Text
    pub const TEXT: &str = "text";
    /// Table
    pub const TABLE: &str = "table";
    /// Table row
    pub const TABLE_ROW: &str = "tablerow";
    /// Table cell
    pub const TABLE_CELL: &str = "tablecell";
    /// List
    pub const LIST: &str = "list";
    /// List item
    pub const LIST_ITEM: &str = "listitem";
    /// Decorative wrapper
    pub const DECOR: &str = "decor-block";
    /// Group heading marker
    pub const GROUP_HEADING: &str = "group-heading";
    /// Generation placeholder
    pub const PLACEHOLDER: &str = "gen-part-placeholder";
    /// Anchor marker
    pub const ANCHOR: &str = "anchor-node";
    /// Snippet slot
    pub const SLOT: &str = "slot";
}

impl DocumentNode {
    /// Plain text run
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextNode::new(text))
    }

    /// Paragraph with children
    #[inline]
    #[must_use]
    pub fn paragraph(children: Vec<DocumentNode>) -> Self {
        Self::Paragraph(ElementNode::new(children))
    }

    /// Paragraph with a single plain text run
    #[must_use]
    pub fn text_paragraph(text: impl Into<String>) -> Self {
        Self::paragraph(vec![Self::text(text)])
    }

    /// Empty paragraph, used as a spacer
    #[inline]
    #[must_use]
    pub fn empty_paragraph() -> Self {
        Self::paragraph(Vec::new())
    }

    /// Heading with tag and children
    #[must_use]
    pub fn heading(tag: impl Into<String>, children: Vec<DocumentNode>) -> Self {
        Self::Heading(HeadingNode {
            tag: tag.into(),
            element: ElementNode::new(children),
        })
    }

    /// Wire `type` name
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Root(_) => kind::ROOT,
            Self::Paragraph(_) => kind::PARAGRAPH,
            Self::Heading(_) => kind::HEADING,
            Self::Text(_) => kind::TEXT,
            Self::Table(_) => kind::TABLE,
            Self::TableRow(_) => kind::TABLE_ROW,
            Self::TableCell(_) => kind::TABLE_CELL,
            Self::List(_) => kind::LIST,
            Self::ListItem(_) => kind::LIST_ITEM,
            Self::Decor(_) => kind::DECOR,
            Self::GroupHeading(_) => kind::GROUP_HEADING,
            Self::Placeholder(_) => kind::PLACEHOLDER,
            Self::Anchor(_) => kind::ANCHOR,
            Self::Slot(_) => kind::SLOT,
            Self::Opaque(value) => value.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }

    /// Whether synchronization owns this node
    #[inline]
    #[must_use]
    pub fn is_managed(&self) -> bool {
        matches!(
            self,
            Self::GroupHeading(_) | Self::Placeholder(_) | Self::Anchor(_)
        )
    }

    /// Container view, when the node has children
    #[must_use]
    pub fn element(&self) -> Option<&ElementNode> {
        match self {
            Self::Root(e)
            | Self::Paragraph(e)
            | Self::Table(e)
            | Self::TableRow(e)
            | Self::TableCell(e)
            | Self::List(e)
            | Self::ListItem(e)
            | Self::Decor(e) => Some(e),
            Self::Heading(h) => Some(&h.element),
            Self::GroupHeading(g) => Some(&g.element),
            _ => None,
        }
    }

    /// Mutable container view
    pub fn element_mut(&mut self) -> Option<&mut ElementNode> {
        match self {
            Self::Root(e)
            | Self::Paragraph(e)
            | Self::Table(e)
            | Self::TableRow(e)
            | Self::TableCell(e)
            | Self::List(e)
            | Self::ListItem(e)
            | Self::Decor(e) => Some(e),
            Self::Heading(h) => Some(&mut h.element),
            Self::GroupHeading(g) => Some(&mut g.element),
            _ => None,
        }
    }

    /// Children, empty for leaves
    #[must_use]
    pub fn children(&self) -> &[DocumentNode] {
        self.element().map_or(&[], |e| e.children.as_slice())
    }

    /// Concatenated text of all descendant text runs
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(t) => out.push_str(&t.text),
            other => {
                for child in other.children() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Decode from JSON; unrecognised or malformed input becomes [`DocumentNode::Opaque`]
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Self::Opaque(value);
        };
        let parsed = match kind {
            kind::ROOT => decode(&value).map(Self::Root),
            kind::PARAGRAPH => decode(&value).map(Self::Paragraph),
            kind::HEADING => decode(&value).map(Self::Heading),
            kind::TEXT => decode(&value).map(Self::Text),
            kind::TABLE => decode(&value).map(Self::Table),
            kind::TABLE_ROW => decode(&value).map(Self::TableRow),
            kind::TABLE_CELL => decode(&value).map(Self::TableCell),
            kind::LIST => decode(&value).map(Self::List),
            kind::LIST_ITEM => decode(&value).map(Self::ListItem),
            kind::DECOR => decode(&value).map(Self::Decor),
            kind::GROUP_HEADING => decode(&value).map(Self::GroupHeading),
            kind::PLACEHOLDER => decode(&value).map(Self::Placeholder),
            kind::ANCHOR => decode(&value).map(Self::Anchor),
            kind::SLOT => decode(&value).map(Self::Slot),
            _ => None,
        };
        match parsed {
            Some(mut node) if node.is_well_formed() => {
                node.strip_type_attr();
                node.record_key_order(&value);
                node
            }
            _ => Self::Opaque(value),
        }
    }

    /// Encode to JSON
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn is_well_formed(&self) -> bool {
        match self {
            Self::GroupHeading(g) => g.heading_id.is_some() || g.group_id.is_some(),
            Self::Placeholder(p) => !p.placeholder_id.is_empty(),
            Self::Anchor(a) => !a.anchor_id.trim().is_empty(),
            Self::Slot(s) => s.path().is_some(),
            Self::Heading(h) => is_heading_tag(&h.tag),
            _ => true,
        }
    }

    fn strip_type_attr(&mut self) {
        let attrs = match self {
            Self::Text(t) => &mut t.attrs,
            Self::Placeholder(p) => &mut p.attrs,
            Self::Anchor(a) => &mut a.attrs,
            Self::Slot(s) => &mut s.attrs,
            Self::Opaque(_) => return,
            other => match other.element_mut() {
                Some(e) => &mut e.attrs,
                None => return,
            },
        };
        attrs.remove("type");
    }

    fn record_key_order(&mut self, value: &Value) {
        match self {
            Self::Text(t) => t.key_order = KeyOrder::of(value),
            other => {
                if let Some(e) = other.element_mut() {
                    e.key_order = KeyOrder::of(value);
                }
            }
        }
    }
}

/// Whether `tag` names a heading level
#[must_use]
pub fn is_heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Heading tag for a level, clamped to 1..=6
#[must_use]
pub fn heading_tag(level: u8) -> String {
    format!("h{}", level.clamp(1, 6))
}

fn decode<'a, T: Deserialize<'a>>(value: &'a Value) -> Option<T> {
    T::deserialize(value).ok()
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

/// Serialize `body` under a leading `type` key, or in `order` when one was
/// recorded at decode time
pub(crate) fn serialize_tagged<S: Serializer, T: Serialize>(
    kind: &str,
    body: &T,
    order: &KeyOrder,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let tagged = Tagged { kind, body };
    if order.is_empty() {
        return tagged.serialize(serializer);
    }
    match serde_json::to_value(&tagged).map_err(<S::Error as serde::ser::Error>::custom)? {
        Value::Object(object) => order.arrange(object).serialize(serializer),
        other => other.serialize(serializer),
    }
}

impl Serialize for DocumentNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        match self {
            Self::Opaque(value) => value.serialize(serializer),
            Self::Text(t) => serialize_tagged(kind, t, &t.key_order, serializer),
            Self::Heading(h) => serialize_tagged(kind, h, &h.element.key_order, serializer),
            Self::GroupHeading(g) => serialize_tagged(kind, g, &g.element.key_order, serializer),
            Self::Placeholder(p) => Tagged { kind, body: p }.serialize(serializer),
            Self::Anchor(a) => Tagged { kind, body: a }.serialize(serializer),
            Self::Slot(s) => Tagged { kind, body: s }.serialize(serializer),
            Self::Root(e)
            | Self::Paragraph(e)
            | Self::Table(e)
            | Self::TableRow(e)
            | Self::TableCell(e)
            | Self::List(e)
            | Self::ListItem(e)
            | Self::Decor(e) => serialize_tagged(kind, e, &e.key_order, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DocumentNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}
