//! Editor state: the `{root}` envelope around a document tree

use crate::error::DocError;
use crate::node::{kind, serialize_tagged, DocumentNode, ElementNode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Document tree wrapped in its editor envelope
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentState {
    /// Root element
    pub root: ElementNode,
    /// Envelope keys other than `root`
    pub extra: Map<String, Value>,
}

impl DocumentState {
    /// State with the given top-level children
    #[must_use]
    pub fn new(children: Vec<DocumentNode>) -> Self {
        Self {
            root: ElementNode::new(children),
            extra: Map::new(),
        }
    }

    /// Top-level children
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[DocumentNode] {
        &self.root.children
    }

    /// Decode from a JSON string
    ///
    /// # Errors
    /// Returns [`DocError`] on malformed JSON or a missing root.
    pub fn from_json(json: &str) -> Result<Self, DocError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Decode from JSON, accepting either `{root: {...}}` or a bare root node
    ///
    /// # Errors
    /// Returns [`DocError::InvalidState`] when no root element is found.
    pub fn from_value(value: Value) -> Result<Self, DocError> {
        let Value::Object(mut envelope) = value else {
            return Err(DocError::invalid_state("expected an object"));
        };
        if envelope.get("type").and_then(Value::as_str) == Some(kind::ROOT) {
            return match DocumentNode::from_value(Value::Object(envelope)) {
                DocumentNode::Root(root) => Ok(Self {
                    root,
                    extra: Map::new(),
                }),
                _ => Err(DocError::invalid_state("malformed root node")),
            };
        }
        let raw_root = envelope
            .remove("root")
            .ok_or_else(|| DocError::invalid_state("missing root"))?;
        let root = match raw_root {
            Value::Object(mut root) => {
                root.entry("type").or_insert_with(|| Value::from(kind::ROOT));
                DocumentNode::from_value(Value::Object(root))
            }
            _ => return Err(DocError::invalid_state("root is not an object")),
        };
        match root {
            DocumentNode::Root(root) => Ok(Self {
                root,
                extra: envelope,
            }),
            _ => Err(DocError::invalid_state("root has the wrong type")),
        }
    }

    /// Encode to JSON
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Canonical JSON string
    ///
    /// # Errors
    /// Returns [`DocError::Json`] when encoding fails.
    pub fn to_json(&self) -> Result<String, DocError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Copy with editor defaults filled in
    ///
    /// Text runs get `detail`, `format`, `style`, `version`; paragraphs get
    /// `direction`, `format`, `indent`, `version`; bare top-level text is
    /// wrapped in a paragraph.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let children = self
            .root
            .children
            .iter()
            .cloned()
            .map(|child| match child {
                DocumentNode::Text(_) => DocumentNode::paragraph(vec![child]),
                other => other,
            })
            .map(normalize_node)
            .collect();
        let mut root = self.root.with_children(children);
        root.default_attr("direction", "ltr");
        root.attrs.insert("format".into(), Value::from(""));
        root.attrs.insert("indent".into(), Value::from(0));
        root.attrs.insert("version".into(), Value::from(1));
        Self {
            root,
            extra: self.extra.clone(),
        }
    }
}

fn normalize_node(mut node: DocumentNode) -> DocumentNode {
    match &mut node {
        DocumentNode::Text(text) => {
            text.format.get_or_insert(0);
            text.style.get_or_insert_with(String::new);
            text.attrs.entry("detail").or_insert(Value::from(0));
            text.attrs.entry("version").or_insert(Value::from(1));
        }
        DocumentNode::Paragraph(paragraph) => {
            paragraph.default_attr("direction", "ltr");
            paragraph.default_attr("format", "");
            paragraph.default_attr("indent", 0);
            paragraph.default_attr("version", 1);
        }
        _ => {}
    }
    if let Some(element) = node.element_mut() {
        let children = std::mem::take(&mut element.children);
        element.children = children.into_iter().map(normalize_node).collect();
    }
    node
}

#[derive(Serialize)]
struct Envelope<'a> {
    root: RootRef<'a>,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

struct RootRef<'a>(&'a ElementNode);

impl Serialize for RootRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_tagged(kind::ROOT, self.0, &self.0.key_order, serializer)
    }
}

impl Serialize for DocumentState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Envelope {
            root: RootRef(&self.root),
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DocumentState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
