//! Error types for rendering and assembly
//!
//! Render errors never reach callers of the assembler: the renderer
//! registry logs them and treats the anchor as rendering nothing.

use genpart_doc::{AnchorKind, DocError};

/// Errors rendering one anchor
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Anchor points at a question absent from the context
    #[error("anchor {anchor_id}: question {question_id} not found")]
    QuestionNotFound {
        /// Anchor id
        anchor_id: String,
        /// Missing question id
        question_id: String,
    },

    /// Table anchor on a question without a table definition
    #[error("question {0} is not a table")]
    NotATable(String),

    /// No renderer registered for the anchor kind
    #[error("no renderer for {0}")]
    NoRenderer(AnchorKind),
}

impl RenderError {
    /// Create question-not-found error
    pub fn question_not_found(anchor_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self::QuestionNotFound {
            anchor_id: anchor_id.into(),
            question_id: question_id.into(),
        }
    }
}

/// Errors producing the assembled document
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    /// Encoding the assembled state failed
    #[error("encode failed: {0}")]
    Encode(#[from] DocError),
}
