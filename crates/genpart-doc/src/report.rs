//! Synchronization diff report

use serde::{Deserialize, Serialize};

/// What a synchronization pass changed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSyncReport {
    /// Newly minted placeholder ids
    pub created_placeholder_ids: Vec<String>,
    /// Placeholder ids carried over from the previous spec
    pub reused_placeholder_ids: Vec<String>,
    /// Previous placeholder ids no longer present
    pub removed_placeholder_ids: Vec<String>,
    /// Reused placeholder ids whose group also gained a new placeholder
    pub split_placeholder_ids: Vec<String>,
    /// Heading ids that had no marker before this pass
    pub injected_heading_ids: Vec<String>,
    /// Question ids newly covered by a placeholder
    pub added_question_ids: Vec<String>,
    /// Question ids no longer covered
    pub removed_question_ids: Vec<String>,
    /// Free-text anomalies
    pub notes: Vec<String>,
}

impl TemplateSyncReport {
    /// Empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a note
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// De-duplicate every list, first occurrence wins
    #[must_use]
    pub fn finalize(mut self) -> Self {
        for list in [
            &mut self.created_placeholder_ids,
            &mut self.reused_placeholder_ids,
            &mut self.removed_placeholder_ids,
            &mut self.split_placeholder_ids,
            &mut self.injected_heading_ids,
            &mut self.added_question_ids,
            &mut self.removed_question_ids,
            &mut self.notes,
        ] {
            dedupe(list);
        }
        self
    }

    /// Whether the pass created or removed any placeholder
    #[must_use]
    pub fn changed_placeholders(&self) -> bool {
        !self.created_placeholder_ids.is_empty() || !self.removed_placeholder_ids.is_empty()
    }
}

fn dedupe(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_dedupes_in_order() {
        let mut report = TemplateSyncReport::new();
        report.created_placeholder_ids = vec!["b".into(), "a".into(), "b".into()];
        report.note("x");
        report.note("x");
        let report = report.finalize();
        assert_eq!(report.created_placeholder_ids, vec!["b", "a"]);
        assert_eq!(report.notes, vec!["x"]);
        assert!(report.changed_placeholders());
    }
}
