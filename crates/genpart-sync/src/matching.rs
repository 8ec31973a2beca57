//! Placeholder identity matching
//!
//! Identity is best effort: a segment reuses the placeholder of its group
//! whose question list is identical, else the first one still available.

use genpart_doc::PlaceholderSpec;

/// Previous placeholder available for reuse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Placeholder id
    pub placeholder_id: String,
    /// Previous entry
    pub spec: PlaceholderSpec,
}

/// Result of one matching step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Matching {
    /// Selected candidate
    pub matched: Option<Candidate>,
    /// Candidates left in the bucket, original order
    pub remaining: Vec<Candidate>,
}

/// Pick a candidate for `question_ids` from `bucket`
#[must_use]
pub fn match_placeholder(question_ids: &[String], mut bucket: Vec<Candidate>) -> Matching {
    if bucket.is_empty() {
        return Matching::default();
    }
    let index = bucket
        .iter()
        .position(|c| c.spec.question_ids == question_ids)
        .unwrap_or(0);
    let matched = bucket.remove(index);
    Matching {
        matched: Some(matched),
        remaining: bucket,
    }
}
