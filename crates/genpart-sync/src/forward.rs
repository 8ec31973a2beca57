//! Schema to layout synchronization
//!
//! Recomputes the managed skeleton of a template from its question schema
//! and merges it into the previous tree:
//!
//! - one group heading per heading question
//! - one placeholder per run of questions between anchored tables
//! - one anchor marker per anchored table
//!
//! Placeholder ids survive repeated passes through [`match_placeholder`].
//! Never fails: anything unusable in the previous state degrades to "no
//! previous layout".

use crate::grouping::{group_questions, QuestionGroup, Segment};
use crate::ids::ensure_unique_id;
use crate::matching::{match_placeholder, Candidate};
use crate::merge::{merge_children, merge_root};
use genpart_doc::node::heading_tag;
use genpart_doc::spec::{unique_ordered, SPEC_VERSION};
use genpart_doc::traverse;
use genpart_doc::{
    AnchorNode, DocumentNode, DocumentState, ElementNode, GenPartsSpec, GroupHeadingNode,
    PlaceholderNode, PlaceholderSpec, QuestionRecord, TemplateSyncReport,
};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Forward synchronization knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Level of emitted group headings
    pub heading_level: u8,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { heading_level: 2 }
    }
}

impl SyncOptions {
    /// Set the group heading level
    #[inline]
    #[must_use]
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level;
        self
    }
}

/// Result of a forward pass
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Merged tree
    pub tree: DocumentState,
    /// New placeholder specification
    pub spec: GenPartsSpec,
    /// What changed
    pub report: TemplateSyncReport,
}

/// Forward sync with default options
#[must_use]
pub fn schema_to_layout(
    questions: &[QuestionRecord],
    previous_tree: Option<&DocumentState>,
    previous_spec: Option<&GenPartsSpec>,
) -> SyncOutcome {
    schema_to_layout_with(questions, previous_tree, previous_spec, &SyncOptions::default())
}

/// Forward sync
#[must_use]
pub fn schema_to_layout_with(
    questions: &[QuestionRecord],
    previous_tree: Option<&DocumentState>,
    previous_spec: Option<&GenPartsSpec>,
    options: &SyncOptions,
) -> SyncOutcome {
    let empty = GenPartsSpec::new();
    let previous_spec = previous_spec.unwrap_or(&empty);
    let mut lookups = Lookups::collect(previous_tree, previous_spec);
    let mut pass = Pass::new(&mut lookups, options);

    for (index, group) in group_questions(questions).iter().enumerate() {
        pass.group(index, group);
    }
    let Pass {
        nodes,
        spec_entries,
        mut report,
        selected,
        claimed,
        ..
    } = pass;

    for (placeholder_id, entry) in &previous_spec.entries {
        if selected.contains(placeholder_id) {
            continue;
        }
        report.removed_placeholder_ids.push(placeholder_id.clone());
        report.removed_question_ids.extend(
            entry
                .question_ids
                .iter()
                .filter(|id| !claimed.contains(*id))
                .cloned(),
        );
    }

    let tree = match previous_tree {
        Some(previous) => DocumentState {
            root: merge_root(&previous.root, merge_children(previous.children(), nodes)),
            extra: previous.extra.clone(),
        },
        None => DocumentState {
            root: merge_root(&ElementNode::default(), nodes),
            extra: Default::default(),
        },
    };

    let spec = GenPartsSpec {
        entries: spec_entries,
        spec_version: previous_spec.spec_version.max(SPEC_VERSION),
    };
    let report = report.finalize();
    debug!(
        created = report.created_placeholder_ids.len(),
        reused = report.reused_placeholder_ids.len(),
        removed = report.removed_placeholder_ids.len(),
        "Schema synchronized to layout"
    );

    SyncOutcome { tree, spec, report }
}

/// Identity hints recovered from the previous state
#[derive(Debug, Default)]
struct Lookups {
    known_groups: HashSet<String>,
    heading_group: HashMap<String, String>,
    question_group: HashMap<String, String>,
    buckets: HashMap<String, Vec<Candidate>>,
    id_pool: HashSet<String>,
}

impl Lookups {
    fn collect(previous_tree: Option<&DocumentState>, previous_spec: &GenPartsSpec) -> Self {
        let mut lookups = Self::default();

        for (placeholder_id, entry) in &previous_spec.entries {
            lookups.known_groups.insert(entry.group_id.clone());
            lookups.id_pool.insert(placeholder_id.clone());
            for question_id in &entry.question_ids {
                lookups
                    .question_group
                    .insert(question_id.clone(), entry.group_id.clone());
            }
            lookups
                .buckets
                .entry(entry.group_id.clone())
                .or_default()
                .push(Candidate {
                    placeholder_id: placeholder_id.clone(),
                    spec: entry.clone(),
                });
        }

        let Some(tree) = previous_tree else {
            return lookups;
        };
        for child in tree.children() {
            if let DocumentNode::GroupHeading(GroupHeadingNode {
                heading_id: Some(heading_id),
                group_id: Some(group_id),
                ..
            }) = child
            {
                lookups.known_groups.insert(group_id.clone());
                lookups
                    .heading_group
                    .insert(heading_id.clone(), group_id.clone());
            }
        }
        for child in tree.children() {
            traverse::visit(child, &mut |node| match node {
                DocumentNode::Anchor(AnchorNode {
                    question_id: Some(question_id),
                    group_id: Some(group_id),
                    ..
                }) => {
                    lookups.known_groups.insert(group_id.clone());
                    lookups
                        .question_group
                        .entry(question_id.clone())
                        .or_insert_with(|| group_id.clone());
                }
                DocumentNode::Placeholder(p) => {
                    lookups.id_pool.insert(p.placeholder_id.clone());
                }
                _ => {}
            });
        }
        lookups
    }
}

/// Mutable state of one forward pass
struct Pass<'l> {
    lookups: &'l mut Lookups,
    options: &'l SyncOptions,
    assigned_groups: HashSet<String>,
    nodes: Vec<DocumentNode>,
    spec_entries: IndexMap<String, PlaceholderSpec>,
    report: TemplateSyncReport,
    selected: HashSet<String>,
    claimed: HashSet<String>,
}

impl<'l> Pass<'l> {
    fn new(lookups: &'l mut Lookups, options: &'l SyncOptions) -> Self {
        Self {
            lookups,
            options,
            assigned_groups: HashSet::new(),
            nodes: Vec::new(),
            spec_entries: Default::default(),
            report: TemplateSyncReport::new(),
            selected: HashSet::new(),
            claimed: HashSet::new(),
        }
    }

    fn group(&mut self, index: usize, group: &QuestionGroup<'_>) {
        let group_id = self.resolve_group_id(index, group);

        if let Some(heading) = group.heading {
            if !self.lookups.heading_group.contains_key(&heading.id) {
                self.report.injected_heading_ids.push(heading.id.clone());
            }
            self.lookups
                .heading_group
                .insert(heading.id.clone(), group_id.clone());
            self.nodes.push(group_heading(
                heading,
                &group_id,
                self.options.heading_level,
            ));
        }

        let seed = group
            .seed()
            .map_or_else(|| format!("group-{index}"), str::to_string);
        let mut bucket = self.lookups.buckets.remove(&group_id).unwrap_or_default();
        let mut reused = Vec::new();
        let mut created = 0usize;

        for segment in group.segments() {
            match segment {
                Segment::Questions(questions) => {
                    let question_ids = unique_ordered(questions.iter().map(|q| q.id.as_str()));
                    let matching = match_placeholder(&question_ids, bucket);
                    bucket = matching.remaining;
                    let (placeholder_id, entry, previous) = match matching.matched {
                        Some(candidate) => {
                            reused.push(candidate.placeholder_id.clone());
                            self.report
                                .reused_placeholder_ids
                                .push(candidate.placeholder_id.clone());
                            let entry = PlaceholderSpec {
                                group_id: group_id.clone(),
                                question_ids,
                                recipe_id: candidate.spec.recipe_id.clone(),
                                policy_if_empty: candidate.spec.policy_if_empty,
                                deps: candidate.spec.deps.clone(),
                            };
                            (candidate.placeholder_id, entry, Some(candidate.spec))
                        }
                        None => {
                            let placeholder_id =
                                ensure_unique_id(&format!("gen-{seed}"), &mut self.lookups.id_pool);
                            created += 1;
                            self.report
                                .created_placeholder_ids
                                .push(placeholder_id.clone());
                            (placeholder_id, PlaceholderSpec::new(&group_id, question_ids), None)
                        }
                    };
                    debug!(placeholder_id = %placeholder_id, group_id = %group_id, "Placeholder assigned");
                    self.record_diff(previous.as_ref(), &entry.question_ids);
                    for question_id in &entry.question_ids {
                        self.claim(question_id);
                    }
                    self.selected.insert(placeholder_id.clone());
                    self.nodes.push(placeholder_node(&placeholder_id, &entry));
                    self.spec_entries.insert(placeholder_id, entry);
                }
                Segment::Anchor {
                    question,
                    anchor_id,
                } => {
                    self.claim(&question.id);
                    self.nodes.push(DocumentNode::Anchor(AnchorNode::table(
                        anchor_id,
                        Some(group_id.clone()),
                        Some(question.id.clone()),
                    )));
                }
            }
        }

        if !reused.is_empty() && created > 0 {
            self.report.split_placeholder_ids.extend(reused);
        }
    }

    fn resolve_group_id(&mut self, index: usize, group: &QuestionGroup<'_>) -> String {
        let from_heading = group
            .heading
            .and_then(|h| self.lookups.heading_group.get(&h.id))
            .filter(|g| !self.assigned_groups.contains(*g));
        let from_questions = || {
            group
                .questions
                .iter()
                .filter_map(|q| self.lookups.question_group.get(&q.id))
                .find(|g| !self.assigned_groups.contains(*g))
        };
        let existing = from_heading.or_else(from_questions).cloned();
        let group_id = match existing {
            Some(existing) => existing,
            None => {
                let seed = group
                    .seed()
                    .map_or_else(|| format!("group-{index}"), str::to_string);
                ensure_unique_id(&format!("grp-{seed}"), &mut self.lookups.known_groups)
            }
        };
        self.assigned_groups.insert(group_id.clone());
        group_id
    }

    fn record_diff(&mut self, previous: Option<&PlaceholderSpec>, next: &[String]) {
        let previous: &[String] = previous.map_or(&[], |p| p.question_ids.as_slice());
        self.report
            .added_question_ids
            .extend(next.iter().filter(|id| !previous.contains(id)).cloned());
        self.report
            .removed_question_ids
            .extend(previous.iter().filter(|id| !next.contains(id)).cloned());
    }

    fn claim(&mut self, question_id: &str) {
        if !self.claimed.insert(question_id.to_string()) {
            self.report.note(format!(
                "Question {question_id} assigned multiple times; keeping latest order."
            ));
        }
    }
}

fn group_heading(heading: &QuestionRecord, group_id: &str, level: u8) -> DocumentNode {
    let element = ElementNode::new(vec![DocumentNode::text(heading.title.clone())])
        .with_attr("direction", "ltr")
        .with_attr("format", "")
        .with_attr("indent", 0)
        .with_attr("version", 1);
    DocumentNode::GroupHeading(GroupHeadingNode {
        heading_id: Some(heading.id.clone()),
        group_id: Some(group_id.to_string()),
        tag: heading_tag(level),
        element,
    })
}

fn placeholder_node(placeholder_id: &str, entry: &PlaceholderSpec) -> DocumentNode {
    let mut node = PlaceholderNode::new(placeholder_id, &entry.group_id, entry.question_ids.clone());
    node.recipe_id = entry.recipe_id.clone();
    node.policy_if_empty = entry.policy_if_empty;
    node.deps = entry.deps.clone();
    DocumentNode::Placeholder(node)
}
