//! Question groups
//!
//! A group is a maximal run `[heading?, question, ...]`. Inside a group,
//! anchored tables cut the remaining questions into segments: each segment
//! becomes one placeholder, each anchored table one anchor marker.

use genpart_doc::QuestionRecord;

/// Questions under one heading
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionGroup<'a> {
    /// Opening heading, absent for leading questions
    pub heading: Option<&'a QuestionRecord>,
    /// Non-heading questions, schema order
    pub questions: Vec<&'a QuestionRecord>,
}

/// Piece of a group in layout order
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Questions covered by one placeholder
    Questions(Vec<&'a QuestionRecord>),
    /// Table rendered through an anchor marker
    Anchor {
        /// Table question
        question: &'a QuestionRecord,
        /// Trimmed anchor id
        anchor_id: &'a str,
    },
}

impl<'a> QuestionGroup<'a> {
    /// Seed for minted ids: heading id, else first question id
    #[must_use]
    pub fn seed(&self) -> Option<&'a str> {
        self.heading
            .or_else(|| self.questions.first().copied())
            .map(|q| q.id.as_str())
    }

    /// Split at anchored tables
    #[must_use]
    pub fn segments(&self) -> Vec<Segment<'a>> {
        let mut out = Vec::new();
        let mut current: Vec<&'a QuestionRecord> = Vec::new();
        for &question in &self.questions {
            match question.table_anchor_id() {
                Some(anchor_id) => {
                    if !current.is_empty() {
                        out.push(Segment::Questions(std::mem::take(&mut current)));
                    }
                    out.push(Segment::Anchor {
                        question,
                        anchor_id,
                    });
                }
                None => current.push(question),
            }
        }
        if !current.is_empty() {
            out.push(Segment::Questions(current));
        }
        out
    }
}

/// Group a schema by heading boundaries
#[must_use]
pub fn group_questions(questions: &[QuestionRecord]) -> Vec<QuestionGroup<'_>> {
    let mut groups = Vec::new();
    let mut current = QuestionGroup {
        heading: None,
        questions: Vec::new(),
    };
    for question in questions {
        if question.is_heading() {
            if current.heading.is_some() || !current.questions.is_empty() {
                groups.push(current);
            }
            current = QuestionGroup {
                heading: Some(question),
                questions: Vec::new(),
            };
        } else {
            current.questions.push(question);
        }
    }
    if current.heading.is_some() || !current.questions.is_empty() {
        groups.push(current);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpart_doc::{QuestionKind, TableDef};

    fn anchored(id: &str, anchor: &str) -> QuestionRecord {
        QuestionRecord::new(id, QuestionKind::Table, id).with_table(TableDef {
            insert_as_anchor: true,
            anchor_id: Some(anchor.into()),
            ..TableDef::default()
        })
    }

    #[test]
    fn groups_by_heading() {
        let schema = vec![
            QuestionRecord::new("q0", QuestionKind::Notes, ""),
            QuestionRecord::new("h1", QuestionKind::Heading, ""),
            QuestionRecord::new("q1", QuestionKind::Notes, ""),
            QuestionRecord::new("h2", QuestionKind::Heading, ""),
        ];
        let groups = group_questions(&schema);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].seed(), Some("q0"));
        assert_eq!(groups[1].seed(), Some("h1"));
        assert_eq!(groups[1].questions.len(), 1);
        assert!(groups[2].questions.is_empty());
        assert!(group_questions(&[]).is_empty());
    }

    #[test]
    fn anchors_cut_segments() {
        let schema = vec![
            QuestionRecord::new("h", QuestionKind::Heading, ""),
            QuestionRecord::new("a", QuestionKind::Notes, ""),
            anchored("t", " T1 "),
            QuestionRecord::new("b", QuestionKind::Scale, ""),
            QuestionRecord::new("c", QuestionKind::Notes, ""),
            anchored("u", "T2"),
        ];
        let groups = group_questions(&schema);
        let segments = groups[0].segments();
        assert_eq!(segments.len(), 4);
        assert!(matches!(&segments[0], Segment::Questions(q) if q.len() == 1));
        assert!(matches!(&segments[1], Segment::Anchor { anchor_id: "T1", .. }));
        assert!(matches!(&segments[2], Segment::Questions(q) if q.len() == 2));
        assert!(matches!(&segments[3], Segment::Anchor { anchor_id: "T2", .. }));
    }
}
