use genpart_doc::{DocumentNode, DocumentState};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
    ]
}

fn attrs() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-zA-Z]{1,6}", scalar(), 0..4).prop_map(|m| {
        m.into_iter()
            .filter(|(k, _)| !matches!(k.as_str(), "type" | "children" | "text" | "format" | "style" | "tag"))
            .collect()
    })
}

fn text_node() -> impl Strategy<Value = Value> {
    ("[^\\x00]{0,12}", 0u32..16, attrs()).prop_map(|(text, format, mut extra)| {
        extra.insert("type".into(), json!("text"));
        extra.insert("text".into(), json!(text));
        extra.insert("format".into(), json!(format));
        Value::Object(extra)
    })
}

fn block_node() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        text_node(),
        attrs().prop_map(|mut extra| {
            extra.insert("type".into(), json!("equation"));
            Value::Object(extra)
        }),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            prop_oneof![Just("paragraph"), Just("listitem"), Just("tablecell"), Just("quote")],
            prop::collection::vec(inner, 0..4),
            attrs(),
        )
            .prop_map(|(kind, children, mut extra)| {
                extra.insert("type".into(), json!(kind));
                extra.insert("children".into(), Value::Array(children));
                Value::Object(extra)
            })
    })
}

proptest! {
    #[test]
    fn prop_free_form_nodes_survive_decode_encode(raw in block_node()) {
        let node = DocumentNode::from_value(raw.clone());
        prop_assert_eq!(serde_json::to_string(&node).unwrap(), serde_json::to_string(&raw).unwrap());
    }

    #[test]
    fn prop_states_survive_decode_encode(children in prop::collection::vec(block_node(), 0..5)) {
        let raw = json!({ "root": { "type": "root", "children": children } });
        let state = DocumentState::from_value(raw.clone()).unwrap();
        prop_assert_eq!(state.to_json().unwrap(), serde_json::to_string(&raw).unwrap());
    }
}

#[test]
fn editor_paragraph_keeps_its_bytes() {
    let raw = r#"{"children":[{"detail":0,"format":3,"mode":"normal","style":"color: red","text":"Observation","type":"text","version":1}],"direction":"ltr","format":"","indent":0,"type":"paragraph","version":1,"textFormat":3,"textStyle":""}"#;
    let node: DocumentNode = serde_json::from_str(raw).unwrap();
    assert_eq!(serde_json::to_string(&node).unwrap(), raw);
}

#[test]
fn managed_nodes_decode_typed() {
    let state = DocumentState::from_value(json!({
        "root": {
            "type": "root",
            "children": [
                { "type": "group-heading", "headingId": "h1", "groupId": "grp-h1", "tag": "h2",
                  "children": [{ "type": "text", "text": "Intro" }] },
                { "type": "gen-part-placeholder", "placeholderId": "gen-h1", "groupId": "grp-h1",
                  "scope": { "type": "questions-list" }, "questionIds": ["q1"], "version": 1 },
                { "type": "anchor-node", "anchorType": "CR:TBL", "anchorId": "T1", "version": 1 }
            ]
        }
    }))
    .unwrap();
    let managed: Vec<_> = state.children().iter().filter(|n| n.is_managed()).collect();
    assert_eq!(managed.len(), 3);
    assert_eq!(state.children()[0].plain_text(), "Intro");
}
