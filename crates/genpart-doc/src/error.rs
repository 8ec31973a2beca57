//! Error types for the document model

/// Errors decoding documents and schemas
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// Input is not valid JSON
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON is valid but not a document state
    #[error("invalid document state: {0}")]
    InvalidState(String),
}

impl DocError {
    /// Create invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}
