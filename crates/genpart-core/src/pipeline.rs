//! Placeholder resolution pipeline
//!
//! For every placeholder present in both the tree and the `GenPartsSpec`:
//! 1. Select its questions and answers
//! 2. Apply the empty-answer policy when nothing meaningful was answered
//! 3. Otherwise prompt the generator with the recipe and anchor constraints
//! 4. Verify markers and assemble the generated text into nodes
//!
//! Replacements are spliced back with the shared tree traversal, so
//! everything outside the placeholders is untouched.

use crate::config::EngineConfig;
use crate::context::ResolutionContext;
use crate::error::{EngineError, GenerationError};
use crate::generation::{GenerationRequest, TextGenerator};
use crate::recipes::RecipeRegistry;
use genpart_doc::answers::{answers_subset, has_meaningful_answers};
use genpart_doc::traverse::{placeholder_ids, replace_placeholders};
use genpart_doc::{
    Answers, DocumentNode, DocumentState, EmptyPolicy, GenPartsSpec, PlaceholderSpec,
    QuestionRecord,
};
use genpart_render::{anchor, answers_to_markdown, AssembleInput, DocumentAssembler, SnippetLibrary};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one resolution pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    /// Tree with replacements applied
    pub tree: DocumentState,
    /// Placeholders replaced by generated content
    pub generated: Vec<String>,
    /// Placeholders handled by their empty-answer policy
    pub empty: Vec<String>,
    /// Placeholders refused by the generator content policy
    pub rejected: Vec<(String, GenerationError)>,
    /// Placeholders whose output could not be assembled
    pub skipped: Vec<String>,
}

/// Outcome for a single placeholder
enum Step {
    Replace(Vec<DocumentNode>),
    Keep,
}

/// Resolves placeholders through a text generator
pub struct PlaceholderResolver {
    generator: Arc<dyn TextGenerator>,
    recipes: RecipeRegistry,
    assembler: DocumentAssembler,
    snippets: SnippetLibrary,
    neutral_sentence: String,
    output_format: String,
}

impl std::fmt::Debug for PlaceholderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceholderResolver")
            .field("recipes", &self.recipes)
            .field("neutral_sentence", &self.neutral_sentence)
            .finish_non_exhaustive()
    }
}

impl PlaceholderResolver {
    /// Create resolver with built-in recipes
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, config: &EngineConfig) -> Self {
        Self {
            generator,
            recipes: RecipeRegistry::new(),
            assembler: DocumentAssembler::new(),
            snippets: SnippetLibrary::new(),
            neutral_sentence: config.neutral_sentence.clone(),
            output_format: config.output_format.clone(),
        }
    }

    /// With recipe registry
    #[inline]
    #[must_use]
    pub fn with_recipes(mut self, recipes: RecipeRegistry) -> Self {
        self.recipes = recipes;
        self
    }

    /// With cached table layouts, looked up by a table question's snippet id
    #[inline]
    #[must_use]
    pub fn with_snippets(mut self, snippets: SnippetLibrary) -> Self {
        self.snippets = snippets;
        self
    }

    /// Cached table layouts every pass starts from
    #[inline]
    pub fn snippets(&self) -> &SnippetLibrary {
        &self.snippets
    }

    /// Resolve every placeholder of `tree` that `spec` describes
    ///
    /// # Errors
    /// A generation failure other than a content-policy rejection stops the
    /// pass with [`EngineError::PlaceholderFailed`]; the error carries the
    /// tree with the replacements made so far.
    pub async fn resolve_placeholders(
        &self,
        tree: &DocumentState,
        spec: &GenPartsSpec,
        answers: &Answers,
        context: &ResolutionContext,
    ) -> Result<Resolution, EngineError> {
        self.resolve_placeholders_with(tree, spec, answers, context, &self.snippets).await
    }

    /// Same as [`Self::resolve_placeholders`], rendering table anchors
    /// against `snippets` instead of the resolver's own library
    ///
    /// # Errors
    /// See [`Self::resolve_placeholders`].
    pub async fn resolve_placeholders_with(
        &self,
        tree: &DocumentState,
        spec: &GenPartsSpec,
        answers: &Answers,
        context: &ResolutionContext,
        snippets: &SnippetLibrary,
    ) -> Result<Resolution, EngineError> {
        let mut resolution = Resolution::default();
        let mut replacements: HashMap<String, Vec<DocumentNode>> = HashMap::new();

        let mut ids: Vec<String> = Vec::new();
        for child in tree.children() {
            for id in placeholder_ids(child) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        for placeholder_id in ids {
            let Some(entry) = spec.get(&placeholder_id) else {
                debug!(%placeholder_id, "Placeholder not in spec, leaving it");
                continue;
            };

            match self
                .resolve_one(&placeholder_id, entry, answers, context, snippets, &mut resolution)
                .await
            {
                Ok(Step::Replace(nodes)) => {
                    replacements.insert(placeholder_id, nodes);
                }
                Ok(Step::Keep) => {}
                Err(source) => {
                    warn!(%placeholder_id, error = %source, "Generation failed");
                    let partial = apply(tree, &replacements);
                    return Err(EngineError::placeholder_failed(placeholder_id, source, partial));
                }
            }
        }

        resolution.tree = apply(tree, &replacements);
        info!(
            generated = resolution.generated.len(),
            empty = resolution.empty.len(),
            rejected = resolution.rejected.len(),
            skipped = resolution.skipped.len(),
            "Placeholder resolution complete"
        );
        Ok(resolution)
    }

    async fn resolve_one(
        &self,
        placeholder_id: &str,
        entry: &PlaceholderSpec,
        answers: &Answers,
        context: &ResolutionContext,
        snippets: &SnippetLibrary,
        resolution: &mut Resolution,
    ) -> Result<Step, GenerationError> {
        if !has_meaningful_answers(&entry.question_ids, answers) {
            resolution.empty.push(placeholder_id.to_string());
            return Ok(self.empty_policy(placeholder_id, entry.policy_if_empty));
        }

        let questions = select_questions(&entry.question_ids, &context.questions);
        let subset = answers_subset(&entry.question_ids, answers);
        let anchors = anchor::collect(&questions);

        let recipe = self
            .recipes
            .resolve(entry.recipe_id.as_deref(), context.section_kind.as_deref());
        let base = recipe.map(|r| r.instructions.as_str()).unwrap_or_default();
        let output_format = recipe
            .and_then(|r| r.output_format.clone())
            .unwrap_or_else(|| self.output_format.clone());

        let mut content = answers_to_markdown(&questions, &subset);
        if content.trim().is_empty() {
            content = context.markdown.clone().unwrap_or_default();
        }

        let request = GenerationRequest {
            instructions: anchor::inject_prompt(base, &anchors),
            content,
            style_prompt: context.style_prompt.clone(),
            output_format,
        };

        debug!(placeholder_id, anchors = anchors.len(), "Requesting generation");
        let generated = match self.generator.generate(&request).await {
            Ok(text) => text,
            Err(err) if err.is_content_policy() => {
                warn!(placeholder_id, error = %err, "Generation refused, keeping placeholder");
                resolution.rejected.push((placeholder_id.to_string(), err));
                return Ok(Step::Keep);
            }
            Err(err) => return Err(err),
        };

        let checked = anchor::post_process(&generated, &anchors);
        let input = AssembleInput::new(&checked.text, &anchors, &questions, &subset)
            .with_missing(&checked.status.missing)
            .with_snippets(snippets);
        match self.assembler.assemble(&input) {
            Ok(assembly) => {
                if !assembly.auto_inserted.is_empty() {
                    debug!(placeholder_id, auto_inserted = ?assembly.auto_inserted, "Anchors auto-inserted");
                }
                resolution.generated.push(placeholder_id.to_string());
                Ok(Step::Replace(assembly.state.root.children))
            }
            Err(err) => {
                warn!(placeholder_id, error = %err, "Assembly failed, skipping placeholder");
                resolution.skipped.push(placeholder_id.to_string());
                Ok(Step::Keep)
            }
        }
    }

    fn empty_policy(&self, placeholder_id: &str, policy: Option<EmptyPolicy>) -> Step {
        debug!(placeholder_id, ?policy, "No meaningful answers");
        match policy {
            Some(EmptyPolicy::KeepEmpty) => Step::Keep,
            Some(EmptyPolicy::NeutralSentence) => {
                Step::Replace(vec![DocumentNode::text_paragraph(self.neutral_sentence.clone())])
            }
            Some(EmptyPolicy::Remove) | None => Step::Replace(Vec::new()),
        }
    }
}

/// Questions in `question_ids` order; unknown ids are dropped
fn select_questions(question_ids: &[String], questions: &[QuestionRecord]) -> Vec<QuestionRecord> {
    question_ids
        .iter()
        .filter_map(|id| questions.iter().find(|q| &q.id == id).cloned())
        .collect()
}

fn apply(tree: &DocumentState, replacements: &HashMap<String, Vec<DocumentNode>>) -> DocumentState {
    if replacements.is_empty() {
        return tree.clone();
    }
    let children = replace_placeholders(tree.root.children.clone(), replacements);
    DocumentState {
        root: tree.root.with_children(children),
        extra: tree.extra.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockTextGenerator;
    use genpart_doc::schema::TableDef;
    use genpart_doc::{PlaceholderNode, QuestionKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn placeholder(id: &str, qids: &[&str]) -> DocumentNode {
        DocumentNode::Placeholder(PlaceholderNode::new(
            id,
            format!("grp-{id}"),
            qids.iter().map(|q| q.to_string()).collect(),
        ))
    }

    fn spec_entry(spec: &mut GenPartsSpec, id: &str, qids: &[&str], policy: Option<EmptyPolicy>) {
        let mut entry = PlaceholderSpec::new(
            format!("grp-{id}"),
            qids.iter().map(|q| q.to_string()).collect(),
        );
        entry.policy_if_empty = policy;
        spec.insert(id, entry);
    }

    fn context() -> ResolutionContext {
        ResolutionContext::new("ctx").with_questions(vec![
            QuestionRecord::new("q1", QuestionKind::Notes, "Notes"),
            QuestionRecord::new("q2", QuestionKind::Notes, "More"),
        ])
    }

    fn answers(value: serde_json::Value) -> Answers {
        value.as_object().cloned().unwrap_or_default()
    }

    fn resolver(mock: MockTextGenerator) -> PlaceholderResolver {
        PlaceholderResolver::new(Arc::new(mock), &EngineConfig::default())
    }

    #[tokio::test]
    async fn empty_policies_never_call_generator() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(0);

        let tree = DocumentState::new(vec![
            DocumentNode::text_paragraph("intro"),
            placeholder("keep", &["q1"]),
            placeholder("neutral", &["q1"]),
            placeholder("gone", &["q1"]),
            placeholder("unset", &["q2"]),
        ]);
        let mut spec = GenPartsSpec::new();
        spec_entry(&mut spec, "keep", &["q1"], Some(EmptyPolicy::KeepEmpty));
        spec_entry(&mut spec, "neutral", &["q1"], Some(EmptyPolicy::NeutralSentence));
        spec_entry(&mut spec, "gone", &["q1"], Some(EmptyPolicy::Remove));
        spec_entry(&mut spec, "unset", &["q2"], None);

        let out = resolver(mock)
            .resolve_placeholders(&tree, &spec, &answers(json!({ "q1": "  ", "q2": false })), &context())
            .await
            .unwrap();

        let expected = vec![
            DocumentNode::text_paragraph("intro"),
            placeholder("keep", &["q1"]),
            DocumentNode::text_paragraph(crate::config::DEFAULT_NEUTRAL_SENTENCE),
        ];
        assert_eq!(out.tree.children(), expected.as_slice());
        assert_eq!(out.empty, vec!["keep", "neutral", "gone", "unset"]);
        assert!(out.generated.is_empty());
    }

    #[tokio::test]
    async fn generated_text_replaces_placeholder() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .withf(|req| req.content.contains("Slept well") && req.instructions.contains("summary"))
            .returning(|_| Ok("First paragraph.\n\nSecond paragraph.".to_string()));

        let tree = DocumentState::new(vec![placeholder("p1", &["q1"]), placeholder("orphan", &["q2"])]);
        let mut spec = GenPartsSpec::new();
        spec_entry(&mut spec, "p1", &["q1"], None);

        let out = resolver(mock)
            .resolve_placeholders(&tree, &spec, &answers(json!({ "q1": "Slept well" })), &context())
            .await
            .unwrap();

        let texts: Vec<String> = out.tree.children().iter().map(DocumentNode::plain_text).collect();
        assert_eq!(texts, vec!["First paragraph.", "Second paragraph.", ""]);
        assert_eq!(out.tree.children()[2], placeholder("orphan", &["q2"]));
        assert_eq!(out.generated, vec!["p1"]);
    }

    #[tokio::test]
    async fn anchors_constrain_prompt_and_are_assembled() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .withf(|req| req.instructions.contains("[[CR:TBL|id=T1]]"))
            .returning(|_| Ok("Results below.".to_string()));

        let table = QuestionRecord::new("t", QuestionKind::Table, "Scores").with_table(TableDef {
            insert_as_anchor: true,
            anchor_id: Some("T1".into()),
            ..TableDef::default()
        });
        let ctx = ResolutionContext::new("ctx").with_questions(vec![
            QuestionRecord::new("q1", QuestionKind::Notes, "Notes"),
            table,
        ]);
        let tree = DocumentState::new(vec![placeholder("p1", &["q1", "t"])]);
        let mut spec = GenPartsSpec::new();
        spec_entry(&mut spec, "p1", &["q1", "t"], None);

        let out = resolver(mock)
            .resolve_placeholders(&tree, &spec, &answers(json!({ "q1": "yes" })), &ctx)
            .await
            .unwrap();
        assert_eq!(out.generated, vec!["p1"]);
        assert!(out.tree.children().len() >= 2);
        assert_eq!(out.tree.children()[0].plain_text(), "Results below.");
    }

    #[tokio::test]
    async fn content_policy_keeps_siblings_going() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(2)
            .returning(|req| {
                if req.content.contains("blocked") {
                    Err(GenerationError::ContentPolicy("refused".into()))
                } else {
                    Ok("Fine.".to_string())
                }
            });

        let tree = DocumentState::new(vec![placeholder("p1", &["q1"]), placeholder("p2", &["q2"])]);
        let mut spec = GenPartsSpec::new();
        spec_entry(&mut spec, "p1", &["q1"], None);
        spec_entry(&mut spec, "p2", &["q2"], None);

        let out = resolver(mock)
            .resolve_placeholders(
                &tree,
                &spec,
                &answers(json!({ "q1": "blocked", "q2": "ok" })),
                &context(),
            )
            .await
            .unwrap();
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].0, "p1");
        assert_eq!(out.tree.children()[0], placeholder("p1", &["q1"]));
        assert_eq!(out.tree.children()[1].plain_text(), "Fine.");
    }

    #[tokio::test]
    async fn upstream_failure_returns_partial_tree() {
        let mut mock = MockTextGenerator::new();
        let mut calls = 0;
        mock.expect_generate().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok("Done.".to_string())
            } else {
                Err(GenerationError::Upstream("timeout".into()))
            }
        });

        let tree = DocumentState::new(vec![placeholder("p1", &["q1"]), placeholder("p2", &["q2"])]);
        let mut spec = GenPartsSpec::new();
        spec_entry(&mut spec, "p1", &["q1"], None);
        spec_entry(&mut spec, "p2", &["q2"], None);

        let err = resolver(mock)
            .resolve_placeholders(&tree, &spec, &answers(json!({ "q1": "a", "q2": "b" })), &context())
            .await
            .unwrap_err();
        match &err {
            EngineError::PlaceholderFailed { placeholder_id, .. } => assert_eq!(placeholder_id, "p2"),
            other => panic!("unexpected error: {other}"),
        }
        let partial = err.partial().unwrap();
        assert_eq!(partial.children()[0].plain_text(), "Done.");
        assert_eq!(partial.children()[1], placeholder("p2", &["q2"]));
    }

    #[test]
    fn unknown_questions_are_dropped_from_selection() {
        let ctx = context();
        let ids = vec!["q2".to_string(), "zz".to_string(), "q1".to_string()];
        let picked: Vec<String> = select_questions(&ids, &ctx.questions).into_iter().map(|q| q.id).collect();
        assert_eq!(picked, vec!["q2", "q1"]);
    }
}
