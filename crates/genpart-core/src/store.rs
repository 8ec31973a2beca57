//! Template store seam and an in-memory implementation

use crate::context::ResolutionContext;
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use genpart_doc::{schema_to_value, DocumentState, GenPartsSpec, QuestionRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Template record as persisted
///
/// Fields stay raw JSON so that malformed stored data reaches the engine,
/// which decides how to degrade.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTemplate {
    /// Template id
    pub id: String,
    /// Editor state, if a layout exists
    #[serde(default)]
    pub tree: Option<Value>,
    /// Raw placeholder spec, legacy or envelope
    #[serde(default)]
    pub spec: Value,
    /// Raw question schema array
    #[serde(default)]
    pub schema: Value,
    /// Template-level style prompt
    #[serde(default)]
    pub style_prompt: Option<String>,
    /// Cached table layouts as editor states, keyed by snippet id
    #[serde(default)]
    pub snippets: Map<String, Value>,
}

impl StoredTemplate {
    /// Create template with a schema and nothing else
    #[inline]
    pub fn new(id: impl Into<String>, schema: &[QuestionRecord]) -> Self {
        Self {
            id: id.into(),
            schema: schema_to_value(schema),
            ..Self::default()
        }
    }

    /// With stored tree
    #[inline]
    #[must_use]
    pub fn with_tree(mut self, tree: Value) -> Self {
        self.tree = Some(tree);
        self
    }

    /// With stored spec
    #[inline]
    #[must_use]
    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }

    /// With style prompt
    #[inline]
    #[must_use]
    pub fn with_style_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.style_prompt = Some(prompt.into());
        self
    }

    /// With a cached table layout
    #[must_use]
    pub fn with_snippet(mut self, snippet_id: impl Into<String>, state: Value) -> Self {
        self.snippets.insert(snippet_id.into(), state);
        self
    }
}

/// Persistence for templates and resolution contexts
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Load a template by id
    async fn load_template(&self, template_id: &str) -> Result<StoredTemplate, StoreError>;

    /// Persist tree and spec
    async fn save_layout(
        &self,
        template_id: &str,
        tree: &DocumentState,
        spec: &GenPartsSpec,
    ) -> Result<(), StoreError>;

    /// Persist question schema
    async fn save_schema(
        &self,
        template_id: &str,
        schema: &[QuestionRecord],
    ) -> Result<(), StoreError>;

    /// Load a resolution context by id
    async fn load_context(&self, context_id: &str) -> Result<ResolutionContext, StoreError>;
}

/// In-memory store backed by concurrent maps
#[derive(Debug, Default)]
pub struct InMemoryStore {
    templates: DashMap<String, StoredTemplate>,
    contexts: DashMap<String, ResolutionContext>,
    context_loads: AtomicUsize,
}

impl InMemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template
    pub fn insert_template(&self, template: StoredTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Add or replace a context
    pub fn insert_context(&self, context: ResolutionContext) {
        self.contexts.insert(context.id.clone(), context);
    }

    /// Snapshot of a template
    #[must_use]
    pub fn template(&self, template_id: &str) -> Option<StoredTemplate> {
        self.templates.get(template_id).map(|entry| entry.value().clone())
    }

    /// Number of `load_context` calls served
    #[must_use]
    pub fn context_loads(&self) -> usize {
        self.context_loads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TemplateStore for InMemoryStore {
    async fn load_template(&self, template_id: &str) -> Result<StoredTemplate, StoreError> {
        self.template(template_id)
            .ok_or_else(|| StoreError::template_not_found(template_id))
    }

    async fn save_layout(
        &self,
        template_id: &str,
        tree: &DocumentState,
        spec: &GenPartsSpec,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .templates
            .get_mut(template_id)
            .ok_or_else(|| StoreError::template_not_found(template_id))?;
        entry.tree = Some(tree.to_value());
        entry.spec = spec.to_value();
        debug!(template_id, placeholders = spec.len(), "Saved layout");
        Ok(())
    }

    async fn save_schema(
        &self,
        template_id: &str,
        schema: &[QuestionRecord],
    ) -> Result<(), StoreError> {
        let mut entry = self
            .templates
            .get_mut(template_id)
            .ok_or_else(|| StoreError::template_not_found(template_id))?;
        entry.schema = schema_to_value(schema);
        debug!(template_id, questions = schema.len(), "Saved schema");
        Ok(())
    }

    async fn load_context(&self, context_id: &str) -> Result<ResolutionContext, StoreError> {
        self.context_loads.fetch_add(1, Ordering::Relaxed);
        self.contexts
            .get(context_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::context_not_found(context_id))
    }
}
