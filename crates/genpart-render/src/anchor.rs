//! Anchor markers in generated text
//!
//! An anchor stands for content rendered structurally (a table, a styled
//! title). The generation service must reproduce its marker verbatim, alone
//! on a line, in single backticks: `` `[[CR:TBL|id=T1]]` ``.

use genpart_doc::{AnchorKind, AnchorSpec, QuestionRecord};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info};

/// Anchors required by a question list
///
/// Tables flagged for anchor insertion with a non-blank anchor id, and any
/// question carrying a title preset. Question order is kept; ids are
/// de-duplicated per kind.
#[must_use]
pub fn collect(questions: &[QuestionRecord]) -> Vec<AnchorSpec> {
    let mut seen: HashSet<(AnchorKind, String)> = HashSet::new();
    let mut anchors = Vec::new();
    for question in questions {
        if let Some(id) = question.table_anchor_id() {
            if seen.insert((AnchorKind::Table, id.to_string())) {
                debug!("table anchor {} for question {}", id, question.id);
                anchors.push(AnchorSpec::table(id, question.id.clone()));
            }
        }
        if let Some(preset) = question.preset_id() {
            if seen.insert((AnchorKind::TitlePreset, question.id.clone())) {
                debug!("title anchor for question {} (preset {})", question.id, preset);
                anchors.push(AnchorSpec::title(question.id.clone(), preset));
            }
        }
    }
    anchors
}

/// Marker text, `[[TYPE|id=ID]]`
#[must_use]
pub fn format_anchor(anchor: &AnchorSpec) -> String {
    format!("[[{}|id={}]]", anchor.kind.marker(), anchor.id)
}

/// Marker wrapped in single backticks, as it must appear in generated text
#[must_use]
pub fn marker_line(anchor: &AnchorSpec) -> String {
    format!("`{}`", format_anchor(anchor))
}

/// Output constraints listing every marker the generated text must contain
///
/// Empty when there are no anchors.
#[must_use]
pub fn build_constraint_block(anchors: &[AnchorSpec]) -> String {
    if anchors.is_empty() {
        return String::new();
    }
    let mut lines: Vec<String> = vec![
        "OUTPUT CONSTRAINTS".into(),
        "1) Write descriptive, factual prose.".into(),
        "2) Reproduce every marker listed below EXACTLY as written, alone on its own line, enclosed in single backticks.".into(),
        "3) Never write the content of a table or title yourself; write only its marker.".into(),
        "4) Never add a marker that is not listed.".into(),
    ];
    for (kind, label) in [
        (AnchorKind::Table, "TABLES TO INSERT"),
        (AnchorKind::TitlePreset, "TITLES TO INSERT"),
    ] {
        let group: Vec<_> = anchors.iter().filter(|a| a.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(label.into());
        lines.extend(group.into_iter().map(|a| format!("- {}", marker_line(a))));
    }
    lines.join("\n")
}

/// Prepend the constraint block to base instructions when anchors exist
#[must_use]
pub fn inject_prompt(base_instructions: &str, anchors: &[AnchorSpec]) -> String {
    if anchors.is_empty() {
        return base_instructions.to_string();
    }
    debug!("injecting constraints for {} anchors", anchors.len());
    format!("{}\n\n{}", build_constraint_block(anchors), base_instructions)
        .trim()
        .to_string()
}

/// Marker presence check result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnchorStatus {
    /// Every marker found
    pub ok: bool,
    /// Ids of markers not found alone on a line
    pub missing: Vec<String>,
}

/// Check that each anchor's backticked marker appears alone on some line
#[must_use]
pub fn verify(text: &str, anchors: &[AnchorSpec]) -> AnchorStatus {
    let missing: Vec<String> = anchors
        .iter()
        .filter(|anchor| !marker_on_own_line(text, anchor))
        .map(|anchor| anchor.id.clone())
        .collect();
    AnchorStatus {
        ok: missing.is_empty(),
        missing,
    }
}

fn marker_on_own_line(text: &str, anchor: &AnchorSpec) -> bool {
    let pattern = format!(r"(?m)^[ \t]*{}[ \t]*\r?$", regex::escape(&marker_line(anchor)));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

/// Reserved for a targeted re-prompt; returns `text` unchanged
///
/// Missing markers are recovered only by auto-insertion at assembly time.
#[must_use]
pub fn fix_missing(text: &str, _anchors: &[AnchorSpec], _missing: &[String]) -> String {
    text.to_string()
}

/// Generated text after verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessed {
    /// Text handed to the assembler
    pub text: String,
    /// Verification result
    pub status: AnchorStatus,
}

/// Verify markers, then apply [`fix_missing`]
#[must_use]
pub fn post_process(text: &str, anchors: &[AnchorSpec]) -> PostProcessed {
    let status = verify(text, anchors);
    if !status.ok {
        info!("generated text is missing anchors {:?}", status.missing);
    }
    PostProcessed {
        text: fix_missing(text, anchors, &status.missing),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpart_doc::schema::TableDef;
    use genpart_doc::QuestionKind;

    fn table_question(id: &str, anchor: &str) -> QuestionRecord {
        QuestionRecord::new(id, QuestionKind::Table, "Table").with_table(TableDef {
            insert_as_anchor: true,
            anchor_id: Some(anchor.into()),
            ..TableDef::default()
        })
    }

    #[test]
    fn collects_tables_and_titles_in_order() {
        let questions = vec![
            QuestionRecord::new("h", QuestionKind::Heading, "Intro").with_title_preset("title-main"),
            table_question("t1", " T1 "),
            table_question("t2", "T1"),
            table_question("t3", "  "),
            QuestionRecord::new("n", QuestionKind::Notes, "Notes"),
        ];
        let anchors = collect(&questions);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0], AnchorSpec::title("h", "title-main"));
        assert_eq!(anchors[1], AnchorSpec::table("T1", "t1"));
    }

    #[test]
    fn formats_markers() {
        assert_eq!(format_anchor(&AnchorSpec::table("T1", "q")), "[[CR:TBL|id=T1]]");
        assert_eq!(marker_line(&AnchorSpec::title("q9", "p")), "`[[CR:TITLE_PRESET|id=q9]]`");
    }

    #[test]
    fn constraint_block_groups_by_kind() {
        let block = build_constraint_block(&[AnchorSpec::table("T1", "q1"), AnchorSpec::title("q2", "p")]);
        let tables = block.find("TABLES TO INSERT").unwrap();
        let titles = block.find("TITLES TO INSERT").unwrap();
        assert!(tables < titles);
        assert!(block.contains("- `[[CR:TBL|id=T1]]`"));
        assert!(block.contains("- `[[CR:TITLE_PRESET|id=q2]]`"));
        assert!(build_constraint_block(&[]).is_empty());
    }

    #[test]
    fn inject_prompt_prepends_block() {
        assert_eq!(inject_prompt("Base", &[]), "Base");
        let prompt = inject_prompt("Base", &[AnchorSpec::table("T1", "q1")]);
        assert!(prompt.starts_with("OUTPUT CONSTRAINTS"));
        assert!(prompt.ends_with("\n\nBase"));
    }

    #[test]
    fn verify_requires_marker_alone_on_line() {
        let anchors = [AnchorSpec::table("T1", "q1"), AnchorSpec::table("T2", "q2")];
        let status = verify("Intro\n  `[[CR:TBL|id=T1]]`  \nSee `[[CR:TBL|id=T2]]` here", &anchors);
        assert!(!status.ok);
        assert_eq!(status.missing, vec!["T2"]);
        assert!(verify("anything", &[]).ok);
    }

    #[test]
    fn fix_missing_is_identity() {
        let anchors = [AnchorSpec::table("T1", "q1")];
        let out = post_process("no markers", &anchors);
        assert_eq!(out.text, "no markers");
        assert_eq!(out.status.missing, vec!["T1"]);
    }
}
