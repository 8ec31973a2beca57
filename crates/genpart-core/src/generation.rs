//! Text generation seam

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One request to the text-generation service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Recipe instructions with the anchor constraint block
    pub instructions: String,
    /// Answers rendered as markdown
    pub content: String,
    /// Combined style prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_prompt: Option<String>,
    /// Output format instructions
    pub output_format: String,
}

/// External text-generation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate plain text for a request
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Join non-blank style prompts with newlines, in order
#[must_use]
pub fn combine_style_prompts<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let kept: Vec<&str> = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    (!kept.is_empty()).then(|| kept.join("\n"))
}
