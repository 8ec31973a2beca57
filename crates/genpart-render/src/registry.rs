//! Anchor renderer registry
//!
//! Renderers turn one anchor into document fragments. The registry picks the
//! renderer for the anchor kind and downgrades failures to an empty result so
//! assembly always completes.

use crate::error::RenderError;
use crate::table::TableRenderer;
use crate::title::TitleRenderer;
use genpart_doc::{AnchorKind, AnchorSpec, Answers, DocumentNode, DocumentState, QuestionRecord};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Cached document fragments keyed by snippet id
#[derive(Debug, Clone, Default)]
pub struct SnippetLibrary {
    snippets: HashMap<String, Vec<DocumentNode>>,
}

impl SnippetLibrary {
    /// Empty library
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment
    pub fn insert(&mut self, id: impl Into<String>, nodes: Vec<DocumentNode>) {
        self.snippets.insert(id.into(), nodes);
    }

    /// Add a stored editor state; its top-level children become the fragment
    pub fn insert_state(&mut self, id: impl Into<String>, state: DocumentState) {
        self.insert(id, state.root.children);
    }

    /// Add stored editor states keyed by snippet id
    ///
    /// States that fail to decode are skipped; their ids are returned.
    pub fn insert_states<I>(&mut self, states: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut rejected = Vec::new();
        for (id, raw) in states {
            match DocumentState::from_value(raw) {
                Ok(state) => self.insert_state(id, state),
                Err(err) => {
                    warn!(snippet_id = %id, error = %err, "Skipping malformed snippet");
                    rejected.push(id);
                }
            }
        }
        rejected
    }

    /// Fragment by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&[DocumentNode]> {
        self.snippets.get(id).map(Vec::as_slice)
    }

    /// Number of fragments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    /// Whether the library is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

/// Inputs available to a renderer
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Anchor being rendered
    pub anchor: &'a AnchorSpec,
    /// Questions in scope
    pub questions: &'a [QuestionRecord],
    /// Answers in scope
    pub answers: &'a Answers,
    /// Cached fragments
    pub snippets: &'a SnippetLibrary,
}

impl<'a> RenderContext<'a> {
    /// Question the anchor points at
    ///
    /// # Errors
    /// Returns [`RenderError::QuestionNotFound`] when absent.
    pub fn question(&self) -> Result<&'a QuestionRecord, RenderError> {
        self.questions
            .iter()
            .find(|q| q.id == self.anchor.question_id)
            .ok_or_else(|| RenderError::question_not_found(&self.anchor.id, &self.anchor.question_id))
    }
}

/// Renders anchors of one kind
pub trait AnchorRenderer: Send + Sync {
    /// Anchor kind handled
    fn kind(&self) -> AnchorKind;

    /// Render the anchor; an empty result means nothing to insert
    ///
    /// # Errors
    /// Returns [`RenderError`] when the anchor cannot be resolved.
    fn render(&self, ctx: &RenderContext<'_>) -> Result<Vec<DocumentNode>, RenderError>;
}

/// Renderer lookup by anchor kind
pub struct RendererRegistry {
    renderers: Vec<Box<dyn AnchorRenderer>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        default_renderers()
    }
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry")
            .field(
                "kinds",
                &self.renderers.iter().map(|r| r.kind()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RendererRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            renderers: Vec::new(),
        }
    }

    /// Register a renderer, replacing any previous one for the same kind
    pub fn register<R: AnchorRenderer + 'static>(&mut self, renderer: R) {
        self.renderers.retain(|r| r.kind() != renderer.kind());
        self.renderers.push(Box::new(renderer));
    }

    /// Renderer for a kind
    #[must_use]
    pub fn find(&self, kind: AnchorKind) -> Option<&dyn AnchorRenderer> {
        self.renderers.iter().find(|r| r.kind() == kind).map(|r| &**r)
    }

    /// Render, propagating errors
    ///
    /// # Errors
    /// Returns [`RenderError::NoRenderer`] for unregistered kinds, or the
    /// renderer's own error.
    pub fn try_render(&self, ctx: &RenderContext<'_>) -> Result<Vec<DocumentNode>, RenderError> {
        self.find(ctx.anchor.kind)
            .ok_or(RenderError::NoRenderer(ctx.anchor.kind))?
            .render(ctx)
    }

    /// Render, logging errors and returning nothing on failure
    #[must_use]
    pub fn render(&self, ctx: &RenderContext<'_>) -> Vec<DocumentNode> {
        self.try_render(ctx).unwrap_or_else(|err| {
            warn!("anchor {} not rendered: {}", ctx.anchor.id, err);
            Vec::new()
        })
    }
}

/// Registry with the built-in table and title renderers
#[must_use]
pub fn default_renderers() -> RendererRegistry {
    let mut registry = RendererRegistry::new();
    registry.register(TableRenderer::default());
    registry.register(TitleRenderer::default());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<DocumentNode>);

    impl AnchorRenderer for Fixed {
        fn kind(&self) -> AnchorKind {
            AnchorKind::Table
        }

        fn render(&self, _ctx: &RenderContext<'_>) -> Result<Vec<DocumentNode>, RenderError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn register_replaces_same_kind() {
        let mut registry = default_renderers();
        registry.register(Fixed(vec![DocumentNode::text_paragraph("stub")]));
        let anchor = AnchorSpec::table("T1", "q1");
        let answers = Answers::new();
        let snippets = SnippetLibrary::new();
        let ctx = RenderContext {
            anchor: &anchor,
            questions: &[],
            answers: &answers,
            snippets: &snippets,
        };
        assert_eq!(registry.render(&ctx)[0].plain_text(), "stub");
    }

    #[test]
    fn failures_downgrade_to_empty() {
        let registry = default_renderers();
        let anchor = AnchorSpec::table("T1", "missing");
        let answers = Answers::new();
        let snippets = SnippetLibrary::new();
        let ctx = RenderContext {
            anchor: &anchor,
            questions: &[],
            answers: &answers,
            snippets: &snippets,
        };
        assert!(matches!(
            registry.try_render(&ctx),
            Err(RenderError::QuestionNotFound { .. })
        ));
        assert!(registry.render(&ctx).is_empty());
        assert!(matches!(
            RendererRegistry::new().try_render(&ctx),
            Err(RenderError::NoRenderer(AnchorKind::Table))
        ));
    }

    #[test]
    fn stored_states_load_into_library() {
        let mut snippets = SnippetLibrary::new();
        let rejected = snippets.insert_states([
            (
                "snip".to_string(),
                serde_json::json!({ "root": { "type": "root", "children": [
                    { "type": "paragraph", "children": [{ "type": "slot", "slotId": "q1.score" }] }
                ] } }),
            ),
            ("broken".to_string(), serde_json::json!("not a state")),
        ]);
        assert_eq!(rejected, vec!["broken"]);
        assert_eq!(snippets.len(), 1);
        let fragment = snippets.get("snip").unwrap();
        assert_eq!(fragment.len(), 1);
        assert!(matches!(fragment[0].children()[0], DocumentNode::Slot(_)));
    }
}
