//! Testing utilities for GenPart workspace
//!
//! Shared fixtures and a scripted text generator.

#![allow(missing_docs)]

use async_trait::async_trait;
use genpart_core::{GenerationError, GenerationRequest, TextGenerator};
use genpart_doc::schema::TableDef;
use genpart_doc::{Answers, QuestionKind, QuestionRecord};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn heading(id: &str, title: &str) -> QuestionRecord {
    QuestionRecord::new(id, QuestionKind::Heading, title)
}

pub fn notes(id: &str, title: &str) -> QuestionRecord {
    QuestionRecord::new(id, QuestionKind::Notes, title)
}

pub fn anchored_table(id: &str, title: &str, anchor_id: &str) -> QuestionRecord {
    QuestionRecord::new(id, QuestionKind::Table, title).with_table(TableDef {
        insert_as_anchor: true,
        anchor_id: Some(anchor_id.to_string()),
        ..TableDef::default()
    })
}

/// Two groups: history with a note, results with a note and a table anchor
pub fn sample_schema() -> Vec<QuestionRecord> {
    vec![
        heading("history", "History"),
        notes("birth", "Birth"),
        heading("results", "Results"),
        notes("summary", "Summary"),
        anchored_table("scores", "Scores", "T1"),
    ]
}

pub fn sample_answers() -> Answers {
    let value = json!({
        "birth": "Born at term, no complications.",
        "summary": "Scores are within the expected range.",
    });
    value.as_object().cloned().unwrap_or_default()
}

/// Generator that replays queued responses and records every request
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    pub fn with_error(self, error: GenerationError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<String, GenerationError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Upstream("no scripted response".into())))
    }
}
