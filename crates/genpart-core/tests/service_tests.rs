use genpart_core::{
    EngineConfig, EngineError, InMemoryStore, ResolutionContext, StoredTemplate, TemplateService,
};
use genpart_doc::{DocumentNode, DocumentState, GenPartsSpec, PlaceholderNode, PlaceholderSpec};
use genpart_test_utils::{sample_answers, sample_schema, ScriptedGenerator};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn setup(generator: ScriptedGenerator) -> (TemplateService<InMemoryStore>, Arc<ScriptedGenerator>) {
    let store = Arc::new(InMemoryStore::new());
    store.insert_template(
        StoredTemplate::new("t1", &sample_schema()).with_style_prompt("Formal register."),
    );
    let mut context = ResolutionContext::new("ctx").with_section_kind("observations");
    context.style_prompt = Some("Third person.".into());
    store.insert_context(context);

    let generator = Arc::new(generator);
    let service = TemplateService::new(store, generator.clone(), EngineConfig::default());
    (service, generator)
}

fn stored_tree(service: &TemplateService<InMemoryStore>) -> DocumentState {
    let raw = service.store().template("t1").and_then(|t| t.tree).unwrap();
    DocumentState::from_value(raw).unwrap()
}

#[tokio::test]
async fn sync_persists_layout() {
    let (service, _) = setup(ScriptedGenerator::new());
    let outcome = service.sync_from_schema("t1", false).await.unwrap().unwrap();

    assert!(outcome.report.created_placeholder_ids.contains(&"gen-history".to_string()));
    assert_eq!(stored_tree(&service), outcome.tree);
    let stored_spec = service.store().template("t1").unwrap().spec;
    assert_eq!(GenPartsSpec::from_value(&stored_spec), outcome.spec);

    let again = service.sync_from_schema("t1", false).await.unwrap().unwrap();
    assert!(again.report.created_placeholder_ids.is_empty());
    assert_eq!(again.tree, outcome.tree);
}

#[tokio::test]
async fn legacy_spec_is_skipped_unless_forced() {
    let (service, _) = setup(ScriptedGenerator::new());
    let template = service.store().template("t1").unwrap().with_spec(json!({
        "old": { "groupId": "g", "questionIds": ["birth"] }
    }));
    service.store().insert_template(template);

    assert!(service.sync_from_schema("t1", false).await.unwrap().is_none());
    assert!(service.store().template("t1").unwrap().tree.is_none());

    let forced = service.sync_from_schema("t1", true).await.unwrap().unwrap();
    assert_eq!(forced.spec.spec_version, 2);
}

#[tokio::test]
async fn malformed_layout_is_rebuilt() {
    let (service, _) = setup(ScriptedGenerator::new());
    let template = service.store().template("t1").unwrap().with_tree(json!("not a tree"));
    service.store().insert_template(template);

    let outcome = service.sync_from_schema("t1", false).await.unwrap().unwrap();
    assert!(!outcome.report.created_placeholder_ids.is_empty());
}

#[tokio::test]
async fn generate_fills_placeholders_and_caches_context() {
    let generator = ScriptedGenerator::new()
        .with_response("History paragraph.")
        .with_response("Results paragraph.")
        .with_response("History again.")
        .with_response("Results again.");
    let (service, generator) = setup(generator);
    service.sync_from_schema("t1", false).await.unwrap();

    let resolution = service.generate("t1", "ctx", &sample_answers()).await.unwrap();
    assert_eq!(resolution.generated.len(), 2);
    assert!(resolution
        .tree
        .children()
        .iter()
        .all(|node| !matches!(node, DocumentNode::Placeholder(_))));
    let texts: Vec<String> = resolution.tree.children().iter().map(DocumentNode::plain_text).collect();
    assert!(texts.contains(&"History paragraph.".to_string()));

    let requests = generator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].content.contains("Born at term"));
    assert!(requests[0].instructions.contains("clinical observations"));
    assert_eq!(
        requests[0].style_prompt.as_deref(),
        Some("Formal register.\nThird person.")
    );

    service.generate("t1", "ctx", &sample_answers()).await.unwrap();
    assert_eq!(service.store().context_loads(), 1);

    // The stored layout keeps its placeholders.
    assert!(stored_tree(&service)
        .children()
        .iter()
        .any(|node| matches!(node, DocumentNode::Placeholder(_))));
}

#[tokio::test]
async fn generate_without_layout_fails() {
    let (service, _) = setup(ScriptedGenerator::new());
    let err = service.generate("t1", "ctx", &sample_answers()).await.unwrap_err();
    assert!(matches!(err, EngineError::MissingLayout { .. }));

    let err = service.generate("missing", "ctx", &sample_answers()).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
}

#[tokio::test]
async fn upstream_failure_surfaces_partial_tree() {
    let generator = ScriptedGenerator::new().with_response("History paragraph.");
    let (service, _) = setup(generator);
    service.sync_from_schema("t1", false).await.unwrap();

    let err = service.generate("t1", "ctx", &sample_answers()).await.unwrap_err();
    let partial = err.partial().unwrap();
    let texts: Vec<String> = partial.children().iter().map(DocumentNode::plain_text).collect();
    assert!(texts.contains(&"History paragraph.".to_string()));
    assert!(partial
        .children()
        .iter()
        .any(|node| matches!(node, DocumentNode::Placeholder(_))));
}

#[tokio::test]
async fn layout_edits_flow_back_to_schema() {
    let (service, _) = setup(ScriptedGenerator::new());
    let forward = service.sync_from_schema("t1", false).await.unwrap().unwrap();

    let mut children = forward.tree.children().to_vec();
    children.insert(0, DocumentNode::text_paragraph("Preface written by hand"));
    let edited = DocumentState::new(children);

    let reverse = service.sync_from_layout("t1", &edited).await.unwrap();
    let ids: Vec<&str> = reverse.schema.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec!["history", "birth", "results", "summary", "scores"]);
    assert_eq!(stored_tree(&service), reverse.tree);

    let stored = service.store().template("t1").unwrap();
    assert_eq!(genpart_doc::parse_schema(&stored.schema), reverse.schema);
}

#[tokio::test]
async fn stored_snippets_render_table_anchors() {
    let mut schema = sample_schema();
    schema[4].ast_snippet_id = Some("scores-layout".into());
    let qids = vec!["summary".to_string(), "scores".to_string()];
    let tree = DocumentState::new(vec![DocumentNode::Placeholder(PlaceholderNode::new(
        "gen-results",
        "grp-results",
        qids.clone(),
    ))]);
    let mut spec = GenPartsSpec::new();
    spec.insert("gen-results", PlaceholderSpec::new("grp-results", qids));

    let store = Arc::new(InMemoryStore::new());
    store.insert_template(
        StoredTemplate::new("t1", &schema)
            .with_tree(tree.to_value())
            .with_spec(spec.to_value())
            .with_snippet(
                "scores-layout",
                json!({ "root": { "type": "root", "children": [
                    { "type": "paragraph", "children": [
                        { "type": "text", "text": "Summary: " },
                        { "type": "slot", "slotId": "summary" }
                    ] }
                ] } }),
            ),
    );
    store.insert_context(ResolutionContext::new("ctx"));
    let generator = Arc::new(ScriptedGenerator::new().with_response("Results paragraph."));
    let service = TemplateService::new(store, generator, EngineConfig::default());

    let resolution = service.generate("t1", "ctx", &sample_answers()).await.unwrap();
    let texts: Vec<String> = resolution.tree.children().iter().map(DocumentNode::plain_text).collect();
    assert_eq!(texts[0], "Results paragraph.");
    assert!(texts.contains(&"Summary: Scores are within the expected range.".to_string()));
}
