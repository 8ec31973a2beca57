//! Layout to schema synchronization
//!
//! Rebuilds the question schema from an edited tree. Managed nodes are read
//! in document order, descending into non-managed containers:
//!
//! - group heading: a heading question, titled with the marker's text
//! - anchor: the base table question with the same anchor id
//! - placeholder: its question ids, sanitized
//!
//! A question id is claimed by at most one placeholder or anchor. Anomalies
//! never fail the pass; they end up as report notes.

use genpart_doc::node::kind;
use genpart_doc::{
    AnchorNode, DocumentNode, DocumentState, GenPartsSpec, GroupHeadingNode, PlaceholderNode,
    PlaceholderSpec, QuestionKind, QuestionRecord, TemplateSyncReport,
};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;
use uuid::Uuid;

/// Result of a reverse pass
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseOutcome {
    /// Schema in layout order
    pub schema: Vec<QuestionRecord>,
    /// Tree with resolved heading ids and sanitized placeholders
    pub tree: DocumentState,
    /// Placeholder specification read from the tree
    pub spec: GenPartsSpec,
    /// What changed
    pub report: TemplateSyncReport,
}

/// Reverse sync
#[must_use]
pub fn layout_to_schema(tree: &DocumentState, base: &[QuestionRecord]) -> ReverseOutcome {
    let mut working = tree.clone();
    let mut walk = Walk::new(base, &working);
    walk.nodes(&mut working.root.children);

    let Walk {
        schema,
        spec,
        mut report,
        claimed,
        ..
    } = walk;
    report.removed_question_ids.extend(
        base.iter()
            .filter(|q| !claimed.contains(&q.id))
            .map(|q| q.id.clone()),
    );
    let report = report.finalize();
    debug!(
        questions = schema.len(),
        placeholders = spec.len(),
        notes = report.notes.len(),
        "Layout synchronized to schema"
    );

    ReverseOutcome {
        schema,
        tree: working,
        spec,
        report,
    }
}

struct Walk<'a> {
    base: HashMap<&'a str, &'a QuestionRecord>,
    tables: Vec<&'a QuestionRecord>,
    orphan_headings: VecDeque<&'a QuestionRecord>,
    claimed: HashSet<String>,
    schema: Vec<QuestionRecord>,
    spec: GenPartsSpec,
    report: TemplateSyncReport,
}

impl<'a> Walk<'a> {
    fn new(base: &'a [QuestionRecord], tree: &DocumentState) -> Self {
        let mut referenced = HashSet::new();
        for child in tree.children() {
            genpart_doc::traverse::visit(child, &mut |node| {
                if let DocumentNode::GroupHeading(GroupHeadingNode {
                    heading_id: Some(id),
                    ..
                }) = node
                {
                    referenced.insert(id.clone());
                }
            });
        }

        Self {
            base: base.iter().map(|q| (q.id.as_str(), q)).collect(),
            tables: base.iter().filter(|q| q.table_anchor_id().is_some()).collect(),
            orphan_headings: base
                .iter()
                .filter(|q| q.is_heading() && !referenced.contains(&q.id))
                .collect(),
            claimed: HashSet::new(),
            schema: Vec::new(),
            spec: GenPartsSpec::new(),
            report: TemplateSyncReport::new(),
        }
    }

    fn nodes(&mut self, nodes: &mut [DocumentNode]) {
        for node in nodes {
            match node {
                DocumentNode::GroupHeading(heading) => self.heading(heading),
                DocumentNode::Anchor(anchor) => self.anchor(anchor),
                DocumentNode::Placeholder(placeholder) => self.placeholder(placeholder),
                DocumentNode::Opaque(raw)
                    if raw.get("type").and_then(|t| t.as_str()) == Some(kind::PLACEHOLDER) =>
                {
                    self.report
                        .note("Invalid gen-part-placeholder node encountered");
                }
                other => {
                    if let Some(element) = other.element_mut() {
                        self.nodes(&mut element.children);
                    }
                }
            }
        }
    }

    fn heading(&mut self, node: &mut GroupHeadingNode) {
        let title: String = node
            .element
            .children
            .iter()
            .map(DocumentNode::plain_text)
            .collect();

        let by_marker = node
            .heading_id
            .as_deref()
            .and_then(|id| self.base.get(id).copied())
            .filter(|q| q.is_heading() && !self.claimed.contains(&q.id));
        let question = match by_marker.or_else(|| self.orphan_headings.pop_front()) {
            Some(existing) => QuestionRecord {
                title,
                ..existing.clone()
            },
            None => {
                let id = Uuid::new_v4().to_string();
                self.report.injected_heading_ids.push(id.clone());
                QuestionRecord::new(id, QuestionKind::Heading, title)
            }
        };
        debug!(heading_id = %question.id, "Heading resolved");

        self.claimed.insert(question.id.clone());
        node.heading_id = Some(question.id.clone());
        self.schema.push(question);
    }

    fn anchor(&mut self, node: &mut AnchorNode) {
        let anchor_id = node.anchor_id.trim();
        let mut matches = self
            .tables
            .iter()
            .copied()
            .filter(|q| q.table_anchor_id() == Some(anchor_id));
        let preferred = node
            .question_id
            .as_deref()
            .and_then(|qid| self.tables.iter().copied().find(|q| {
                q.id == qid && q.table_anchor_id() == Some(anchor_id)
            }));

        match preferred.or_else(|| matches.next()) {
            Some(question) if !self.claimed.contains(&question.id) => {
                self.claimed.insert(question.id.clone());
                node.question_id = Some(question.id.clone());
                self.schema.push(question.clone());
            }
            Some(question) => {
                self.report.note(format!(
                    "Anchor {anchor_id} refers to question {} already assigned; ignored",
                    question.id
                ));
                node.question_id = None;
            }
            None => {
                self.report
                    .note(format!("Anchor {anchor_id} has no matching table question"));
                node.question_id = None;
            }
        }
    }

    fn placeholder(&mut self, node: &mut PlaceholderNode) {
        let placeholder_id = node.placeholder_id.clone();
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(node.question_ids.len());

        for id in &node.question_ids {
            if id.is_empty() {
                continue;
            }
            if !seen.insert(id.as_str()) {
                self.report.note(format!(
                    "Duplicate questionId {id} ignored in placeholder {placeholder_id}"
                ));
                continue;
            }
            let Some(question) = self.base.get(id.as_str()) else {
                self.report.removed_question_ids.push(id.clone());
                continue;
            };
            if !self.claimed.insert(id.clone()) {
                self.report.note(format!(
                    "Question {id} already assigned; skipped from placeholder {placeholder_id}"
                ));
                continue;
            }
            kept.push(id.clone());
            self.schema.push((*question).clone());
        }

        let group_id = node
            .group_id
            .clone()
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| format!("grp-{placeholder_id}"));
        node.question_ids = kept;
        node.group_id = Some(group_id.clone());

        if let Some(first) = self.spec.entries.get_mut(&placeholder_id) {
            self.report.note(format!(
                "Placeholder {placeholder_id} appears more than once; questions merged into the first"
            ));
            first.question_ids.extend(node.question_ids.iter().cloned());
            return;
        }
        self.spec.insert(
            placeholder_id,
            PlaceholderSpec {
                group_id,
                question_ids: node.question_ids.clone(),
                recipe_id: node.recipe_id.clone(),
                policy_if_empty: node.policy_if_empty,
                deps: node.deps.clone(),
            },
        );
    }
}
