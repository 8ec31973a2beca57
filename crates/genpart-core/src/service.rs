//! Template service
//!
//! Ties the store, the synchronizers and the resolution pipeline together.

use crate::config::EngineConfig;
use crate::context::{ContextCache, ResolutionContext};
use crate::error::EngineError;
use crate::generation::{combine_style_prompts, TextGenerator};
use crate::pipeline::{PlaceholderResolver, Resolution};
use crate::store::{StoredTemplate, TemplateStore};
use genpart_doc::{parse_schema, Answers, DocumentState, GenPartsSpec};
use genpart_sync::{layout_to_schema, schema_to_layout_with, ReverseOutcome, SyncOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine entry point over a template store
#[derive(Debug)]
pub struct TemplateService<S: TemplateStore> {
    store: Arc<S>,
    config: EngineConfig,
    cache: ContextCache,
    resolver: PlaceholderResolver,
}

impl<S: TemplateStore> TemplateService<S> {
    /// Create service
    pub fn new(store: Arc<S>, generator: Arc<dyn TextGenerator>, config: EngineConfig) -> Self {
        let cache = ContextCache::new(config.cache.max_capacity, config.cache.ttl());
        let resolver = PlaceholderResolver::new(generator, &config);
        Self {
            store,
            config,
            cache,
            resolver,
        }
    }

    /// Replace the resolver, e.g. to add recipes or snippets
    #[must_use]
    pub fn with_resolver(mut self, resolver: PlaceholderResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Underlying store
    #[inline]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rebuild the layout from the stored schema
    ///
    /// Returns `None` without touching the store when the stored spec is a
    /// non-empty legacy spec and `force` is not set.
    pub async fn sync_from_schema(
        &self,
        template_id: &str,
        force: bool,
    ) -> Result<Option<SyncOutcome>, EngineError> {
        let template = self.store.load_template(template_id).await?;
        let previous_spec = GenPartsSpec::from_value(&template.spec);
        if previous_spec.is_legacy() && !previous_spec.is_empty() && !force {
            info!(template_id, "Legacy placeholder spec, skipping synchronization");
            return Ok(None);
        }

        let schema = parse_schema(&template.schema);
        let previous_tree = decode_tree(&template);
        let outcome = schema_to_layout_with(
            &schema,
            previous_tree.as_ref(),
            Some(&previous_spec),
            &self.config.sync_options(),
        );
        self.store
            .save_layout(template_id, &outcome.tree, &outcome.spec)
            .await?;

        info!(
            template_id,
            created = outcome.report.created_placeholder_ids.len(),
            reused = outcome.report.reused_placeholder_ids.len(),
            removed = outcome.report.removed_placeholder_ids.len(),
            "Schema synchronized to layout"
        );
        Ok(Some(outcome))
    }

    /// Rebuild the schema from an edited layout
    pub async fn sync_from_layout(
        &self,
        template_id: &str,
        tree: &DocumentState,
    ) -> Result<ReverseOutcome, EngineError> {
        let template = self.store.load_template(template_id).await?;
        let base = parse_schema(&template.schema);
        let outcome = layout_to_schema(tree, &base);

        self.store.save_schema(template_id, &outcome.schema).await?;
        self.store
            .save_layout(template_id, &outcome.tree, &outcome.spec)
            .await?;

        info!(
            template_id,
            questions = outcome.schema.len(),
            injected = outcome.report.injected_heading_ids.len(),
            "Layout synchronized to schema"
        );
        Ok(outcome)
    }

    /// Resolve the template placeholders for one set of answers
    ///
    /// The stored template is not modified.
    pub async fn generate(
        &self,
        template_id: &str,
        context_id: &str,
        answers: &Answers,
    ) -> Result<Resolution, EngineError> {
        let template = self.store.load_template(template_id).await?;
        let raw_tree = template
            .tree
            .clone()
            .ok_or_else(|| EngineError::MissingLayout {
                template_id: template_id.to_string(),
            })?;
        let tree = DocumentState::from_value(raw_tree)?;
        let spec = GenPartsSpec::from_value(&template.spec);

        let cached = self
            .cache
            .get_or_load(context_id, || self.store.load_context(context_id))
            .await?;

        let mut context = ResolutionContext::clone(&cached);
        if context.questions.is_empty() {
            context.questions = parse_schema(&template.schema);
        }
        context.style_prompt = combine_style_prompts([
            template.style_prompt.as_deref(),
            cached.style_prompt.as_deref(),
        ]);

        if template.snippets.is_empty() {
            return self
                .resolver
                .resolve_placeholders(&tree, &spec, answers, &context)
                .await;
        }
        let mut snippets = self.resolver.snippets().clone();
        snippets.insert_states(template.snippets);
        debug!(template_id, snippets = snippets.len(), "Loaded cached table layouts");
        self.resolver
            .resolve_placeholders_with(&tree, &spec, answers, &context, &snippets)
            .await
    }
}

fn decode_tree(template: &StoredTemplate) -> Option<DocumentState> {
    let raw = template.tree.clone()?;
    match DocumentState::from_value(raw) {
        Ok(tree) => Some(tree),
        Err(err) => {
            warn!(template_id = %template.id, error = %err, "Stored layout is malformed, rebuilding");
            None
        }
    }
}
