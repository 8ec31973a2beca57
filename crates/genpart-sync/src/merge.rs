//! Merge of a recomputed managed skeleton into a previous tree
//!
//! Only top-level children are considered. Every previous managed node is
//! paired with at most one new node, strongest affinity first:
//!
//! 1. group heading by `headingId`, placeholder by `placeholderId`, anchor by
//!    `anchorId`
//! 2. group heading by `groupId`, anchor by `questionId`
//! 3. placeholder or anchor: the next unconsumed node of the same kind
//!
//! Paired nodes take the previous node's position; unpaired previous managed
//! nodes are dropped; unpaired new nodes are appended. Everything else passes
//! through unchanged.

use genpart_doc::{Attrs, DocumentNode, ElementNode, GroupHeadingNode, TextNode};
use tracing::debug;

const PHASES: u8 = 3;

/// Merge `next` into `previous` top-level children
#[must_use]
pub fn merge_children(previous: &[DocumentNode], next: Vec<DocumentNode>) -> Vec<DocumentNode> {
    if previous.is_empty() {
        return next;
    }

    let mut pending: Vec<Option<DocumentNode>> = next.into_iter().map(Some).collect();
    let mut pairing: Vec<Option<usize>> = vec![None; previous.len()];

    for phase in 0..PHASES {
        for (i, old) in previous.iter().enumerate() {
            if pairing[i].is_some() || !old.is_managed() {
                continue;
            }
            let found = pending.iter().enumerate().find_map(|(j, slot)| {
                let new = slot.as_ref()?;
                let taken = pairing.contains(&Some(j));
                (!taken && affinity(old, new) == Some(phase)).then_some(j)
            });
            pairing[i] = found;
        }
    }

    let mut merged = Vec::with_capacity(previous.len().max(pending.len()));
    for (old, paired) in previous.iter().zip(&pairing) {
        if !old.is_managed() {
            merged.push(old.clone());
            continue;
        }
        match paired.and_then(|j| pending[j].take()) {
            Some(new) => merged.push(merge_node(old, new)),
            None => debug!(kind = old.kind(), "Dropping unmatched managed node"),
        }
    }
    merged.extend(pending.into_iter().flatten());
    merged
}

/// Previous root attributes with editor defaults, over new children
#[must_use]
pub fn merge_root(previous: &ElementNode, children: Vec<DocumentNode>) -> ElementNode {
    let mut root = previous.with_children(children);
    root.default_attr("direction", "ltr");
    root.default_attr("format", "");
    root.default_attr("indent", 0);
    root.default_attr("version", 1);
    root
}

fn affinity(old: &DocumentNode, new: &DocumentNode) -> Option<u8> {
    match (old, new) {
        (DocumentNode::GroupHeading(a), DocumentNode::GroupHeading(b)) => {
            if a.heading_id.is_some() && a.heading_id == b.heading_id {
                Some(0)
            } else if a.group_id.is_some() && a.group_id == b.group_id {
                Some(1)
            } else {
                None
            }
        }
        (DocumentNode::Placeholder(a), DocumentNode::Placeholder(b)) => {
            if a.placeholder_id == b.placeholder_id {
                Some(0)
            } else {
                Some(2)
            }
        }
        (DocumentNode::Anchor(a), DocumentNode::Anchor(b)) => {
            if a.anchor_id == b.anchor_id {
                Some(0)
            } else if a.question_id.is_some() && a.question_id == b.question_id {
                Some(1)
            } else {
                Some(2)
            }
        }
        _ => None,
    }
}

fn merge_node(old: &DocumentNode, new: DocumentNode) -> DocumentNode {
    match (old, new) {
        (DocumentNode::GroupHeading(old), DocumentNode::GroupHeading(new)) => {
            DocumentNode::GroupHeading(merge_heading(old, new))
        }
        (DocumentNode::Placeholder(old), DocumentNode::Placeholder(mut new)) => {
            new.attrs = overlay(&old.attrs, new.attrs);
            DocumentNode::Placeholder(new)
        }
        (DocumentNode::Anchor(old), DocumentNode::Anchor(mut new)) => {
            new.attrs = overlay(&old.attrs, new.attrs);
            DocumentNode::Anchor(new)
        }
        (_, new) => new,
    }
}

fn merge_heading(old: &GroupHeadingNode, new: GroupHeadingNode) -> GroupHeadingNode {
    let title: String = new.element.children.iter().map(DocumentNode::plain_text).collect();
    let previous_title: String = old.element.children.iter().map(DocumentNode::plain_text).collect();
    let children = if title == previous_title {
        old.element.children.clone()
    } else {
        redistribute(&old.element.children, &title)
    };
    GroupHeadingNode {
        heading_id: new.heading_id,
        group_id: new.group_id,
        tag: old.tag.clone(),
        element: old.element.with_children(children),
    }
}

/// Spread `text` over the existing text runs, keeping each run's formatting
///
/// Each run takes as many characters as it held before; the last run takes
/// the rest. Headings with non-text inline content collapse to one run.
fn redistribute(children: &[DocumentNode], text: &str) -> Vec<DocumentNode> {
    let runs: Vec<&TextNode> = children
        .iter()
        .filter_map(|child| match child {
            DocumentNode::Text(run) => Some(run),
            _ => None,
        })
        .collect();
    let Some(first) = runs.first() else {
        return vec![DocumentNode::text(text)];
    };
    if runs.len() != children.len() {
        return vec![DocumentNode::Text(first.with_text(text))];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::with_capacity(runs.len());
    let mut start = 0;
    for (i, run) in runs.iter().enumerate() {
        let end = if i + 1 == runs.len() {
            chars.len()
        } else {
            (start + run.text.chars().count()).min(chars.len())
        };
        if end > start {
            out.push(DocumentNode::Text(
                run.with_text(chars[start..end].iter().collect::<String>()),
            ));
        }
        start = end;
    }
    if out.is_empty() {
        out.push(DocumentNode::Text(first.with_text("")));
    }
    out
}

fn overlay(base: &Attrs, top: Attrs) -> Attrs {
    let mut merged = base.clone();
    merged.extend(top);
    merged
}
