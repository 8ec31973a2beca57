//! Placeholder specification persisted alongside a template
//!
//! Two wire shapes are accepted:
//! - a bare `{placeholderId: entry}` map (legacy, version 1)
//! - a `{genPartsSpec, specVersion}` envelope
//!
//! Both normalize to [`GenPartsSpec`], which always encodes as the envelope.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current spec version
pub const SPEC_VERSION: u32 = 2;

/// Fallback when a placeholder has no meaningful answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyPolicy {
    /// Drop the placeholder
    Remove,
    /// Replace with one neutral sentence
    NeutralSentence,
    /// Leave the placeholder untouched
    KeepEmpty,
}

impl EmptyPolicy {
    /// Parse wire name
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "remove" => Some(Self::Remove),
            "neutralSentence" => Some(Self::NeutralSentence),
            "keepEmpty" => Some(Self::KeepEmpty),
            _ => None,
        }
    }
}

/// Anchor marker kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnchorKind {
    /// Structured table
    #[serde(rename = "CR:TBL")]
    Table,
    /// Preset-styled title
    #[serde(rename = "CR:TITLE_PRESET")]
    TitlePreset,
}

impl AnchorKind {
    /// Marker type token
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Table => "CR:TBL",
            Self::TitlePreset => "CR:TITLE_PRESET",
        }
    }

    /// Parse marker type token
    #[must_use]
    pub fn from_marker(token: &str) -> Option<Self> {
        match token {
            "CR:TBL" => Some(Self::Table),
            "CR:TITLE_PRESET" => Some(Self::TitlePreset),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}

/// Anchor discovered in a question list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorSpec {
    /// Marker id
    pub id: String,
    /// Marker kind
    #[serde(rename = "type")]
    pub kind: AnchorKind,
    /// Originating question
    pub question_id: String,
    /// Title preset, for title anchors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
}

impl AnchorSpec {
    /// Table anchor
    #[must_use]
    pub fn table(id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: AnchorKind::Table,
            question_id: question_id.into(),
            preset_id: None,
        }
    }

    /// Title-preset anchor; the marker id is the question id
    #[must_use]
    pub fn title(question_id: impl Into<String>, preset_id: impl Into<String>) -> Self {
        let question_id = question_id.into();
        Self {
            id: question_id.clone(),
            kind: AnchorKind::TitlePreset,
            question_id,
            preset_id: Some(preset_id.into()),
        }
    }
}

/// One placeholder entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderSpec {
    /// Owning group
    pub group_id: String,
    /// Covered questions, ordered and unique
    pub question_ids: Vec<String>,
    /// Generation recipe
    #[serde(default)]
    pub recipe_id: Option<String>,
    /// Empty-answer policy
    #[serde(default)]
    pub policy_if_empty: Option<EmptyPolicy>,
    /// Dependencies
    #[serde(default)]
    pub deps: Vec<String>,
}

impl PlaceholderSpec {
    /// Create entry with no recipe, policy or deps
    #[must_use]
    pub fn new(group_id: impl Into<String>, question_ids: Vec<String>) -> Self {
        Self {
            group_id: group_id.into(),
            question_ids,
            recipe_id: None,
            policy_if_empty: None,
            deps: Vec::new(),
        }
    }

    /// Tolerant decode of one entry
    #[must_use]
    pub fn normalize(placeholder_id: &str, raw: &Value) -> Self {
        let default_group = format!("grp-{placeholder_id}");
        let Some(entry) = raw.as_object() else {
            return Self::new(default_group, Vec::new());
        };

        let question_ids = entry
            .get("questionIds")
            .and_then(Value::as_array)
            .map(|ids| unique_ordered(ids.iter().filter_map(Value::as_str)))
            .unwrap_or_default();

        let group_id = entry
            .get("groupId")
            .and_then(Value::as_str)
            .filter(|g| !g.is_empty())
            .map_or(default_group, str::to_string);

        let recipe_id = entry
            .get("recipeId")
            .and_then(Value::as_str)
            .map(str::to_string);

        let policy_if_empty = entry
            .get("policyIfEmpty")
            .and_then(Value::as_str)
            .and_then(EmptyPolicy::parse);

        let deps = match entry.get("deps").and_then(Value::as_array) {
            Some(deps) if deps.iter().all(Value::is_string) => deps
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            group_id,
            question_ids,
            recipe_id,
            policy_if_empty,
            deps,
        }
    }
}

/// Ordered, de-duplicated, non-empty strings
pub fn unique_ordered<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

/// Placeholder specification of one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenPartsSpec {
    /// Entries keyed by placeholder id, insertion ordered
    #[serde(rename = "genPartsSpec")]
    pub entries: IndexMap<String, PlaceholderSpec>,
    /// Wire version; below 2 is legacy
    pub spec_version: u32,
}

impl Default for GenPartsSpec {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            spec_version: SPEC_VERSION,
        }
    }
}

impl GenPartsSpec {
    /// Empty current-version spec
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize any stored payload
    ///
    /// Non-objects become an empty current-version spec.
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        let Some(object) = raw.as_object() else {
            return Self::new();
        };

        if let Some(entries) = object.get("genPartsSpec").and_then(Value::as_object) {
            let spec_version = object
                .get("specVersion")
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map_or(SPEC_VERSION, |v| v as u32);
            return Self {
                entries: normalize_entries(entries),
                spec_version,
            };
        }

        Self {
            entries: normalize_entries(object),
            spec_version: 1,
        }
    }

    /// Encode as the `{genPartsSpec, specVersion}` envelope
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Legacy specs are excluded from automatic synchronization
    #[inline]
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.spec_version < SPEC_VERSION
    }

    /// Entry lookup
    #[inline]
    #[must_use]
    pub fn get(&self, placeholder_id: &str) -> Option<&PlaceholderSpec> {
        self.entries.get(placeholder_id)
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, placeholder_id: impl Into<String>, entry: PlaceholderSpec) {
        self.entries.insert(placeholder_id.into(), entry);
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the spec has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_entries(entries: &Map<String, Value>) -> IndexMap<String, PlaceholderSpec> {
    entries
        .iter()
        .map(|(id, raw)| (id.clone(), PlaceholderSpec::normalize(id, raw)))
        .collect()
}
