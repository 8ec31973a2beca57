use genpart_doc::schema::{ColumnDef, RowDef, RowGroup, TableDef, ValueType};
use genpart_doc::{AnchorSpec, Answers, DocumentNode, QuestionKind, QuestionRecord};
use genpart_render::{anchor, answers_to_markdown, AssembleInput, DocumentAssembler};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn questions() -> Vec<QuestionRecord> {
    vec![
        QuestionRecord::new("h1", QuestionKind::Heading, "sensory profile").with_title_preset("title-section"),
        QuestionRecord::new("t1", QuestionKind::Table, "Scores").with_table(TableDef {
            columns: vec![ColumnDef {
                id: "score".into(),
                label: "Score".into(),
                value_type: ValueType::Number,
                coloring: None,
                extra: Default::default(),
            }],
            row_groups: vec![RowGroup {
                id: "g".into(),
                title: String::new(),
                rows: vec![RowDef {
                    id: "r1".into(),
                    label: "Touch".into(),
                }],
            }],
            comment: false,
            insert_as_anchor: true,
            anchor_id: Some("T1".into()),
            extra: Default::default(),
        }),
        QuestionRecord::new("n1", QuestionKind::Notes, "Notes"),
    ]
}

fn answers() -> Answers {
    json!({ "t1": { "r1": { "score": 2 } }, "n1": "calm and focused" })
        .as_object()
        .cloned()
        .unwrap()
}

#[test]
fn prompt_content_lists_markers() {
    let questions = questions();
    let anchors = anchor::collect(&questions);
    let md = answers_to_markdown(&questions, &answers());
    for a in &anchors {
        assert!(md.contains(&anchor::marker_line(a)), "{md}");
    }
    assert!(md.ends_with("Notes: calm and focused"));
}

#[test]
fn generated_text_assembles_with_built_in_renderers() {
    let questions = questions();
    let answers = answers();
    let anchors = anchor::collect(&questions);
    let generated = "`[[CR:TITLE_PRESET|id=h1]]`\n\nThe child is calm.\n\n`[[CR:TBL|id=T1]]`";
    let checked = anchor::post_process(generated, &anchors);
    assert!(checked.status.ok);

    let assembly = DocumentAssembler::new()
        .assemble(
            &AssembleInput::new(&checked.text, &anchors, &questions, &answers)
                .with_missing(&checked.status.missing),
        )
        .unwrap();

    let kinds: Vec<&str> = assembly.state.children().iter().map(DocumentNode::kind).collect();
    assert_eq!(kinds, vec!["heading", "paragraph", "paragraph", "table", "paragraph"]);
    assert_eq!(assembly.state.children()[0].plain_text(), "sensory profile");
    assert_eq!(assembly.used, vec!["h1", "T1"]);
    assert!(assembly.auto_inserted.is_empty());
}

#[test]
fn dropped_marker_is_recovered_at_the_end() {
    let questions = questions();
    let answers = answers();
    let anchors = anchor::collect(&questions);
    let checked = anchor::post_process("The child is calm.", &anchors);
    assert_eq!(checked.status.missing, vec!["h1", "T1"]);

    let assembly = DocumentAssembler::new()
        .assemble(
            &AssembleInput::new(&checked.text, &anchors, &questions, &answers)
                .with_missing(&checked.status.missing),
        )
        .unwrap();
    assert_eq!(assembly.auto_inserted, vec!["h1", "T1"]);
    let texts: Vec<String> = assembly.state.children().iter().map(DocumentNode::plain_text).collect();
    assert_eq!(texts[0], "The child is calm.");
    assert_eq!(texts[1], "sensory profile");
    assert_eq!(texts[2], "Table T1 inserted automatically (marker missing).");
}

proptest! {
    #[test]
    fn prop_markers_on_own_lines_verify(
        ids in prop::collection::btree_set("[A-Za-z0-9_-]{1,8}", 1..6),
        filler in prop::collection::vec("[a-z ]{0,20}", 0..6),
    ) {
        let anchors: Vec<AnchorSpec> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| if i % 2 == 0 {
                AnchorSpec::table(id.clone(), format!("q{i}"))
            } else {
                AnchorSpec::title(id.clone(), "title-main")
            })
            .collect();
        let mut lines: Vec<String> = filler.clone();
        for (i, a) in anchors.iter().enumerate() {
            lines.insert(i.min(lines.len()), anchor::marker_line(a));
        }
        let status = anchor::verify(&lines.join("\n"), &anchors);
        prop_assert!(status.ok);
        prop_assert!(status.missing.is_empty());
    }
}
