//! Error types for the GenPart engine
//!
//! Covers:
//! - Generation service failures and content-policy rejections
//! - Store access failures
//! - Configuration loading
//! - Placeholder resolution failures, carrying the partial tree

use genpart_doc::{DocError, DocumentState};
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Store access failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stored document could not be decoded
    #[error("document error: {0}")]
    Document(#[from] DocError),

    /// Template has no layout to resolve
    #[error("template {template_id} has no layout")]
    MissingLayout {
        /// Template id
        template_id: String,
    },

    /// Generation failed for one placeholder
    ///
    /// Placeholders resolved before the failure are already applied to
    /// `partial`.
    #[error("placeholder {placeholder_id} failed: {source}")]
    PlaceholderFailed {
        /// Failing placeholder
        placeholder_id: String,
        /// Generation error
        source: GenerationError,
        /// Tree with earlier replacements applied
        partial: Box<DocumentState>,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Create placeholder failure
    #[inline]
    pub fn placeholder_failed(
        placeholder_id: impl Into<String>,
        source: GenerationError,
        partial: DocumentState,
    ) -> Self {
        Self::PlaceholderFailed {
            placeholder_id: placeholder_id.into(),
            source,
            partial: Box::new(partial),
        }
    }

    /// Partially resolved tree, for placeholder failures
    #[must_use]
    pub fn partial(&self) -> Option<&DocumentState> {
        match self {
            Self::PlaceholderFailed { partial, .. } => Some(partial.as_ref()),
            _ => None,
        }
    }
}

/// Text generation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Service failed or returned an unusable response
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Request rejected by the service content policy
    #[error("content policy rejection: {0}")]
    ContentPolicy(String),
}

impl GenerationError {
    /// Check if the service refused the content
    #[inline]
    #[must_use]
    pub fn is_content_policy(&self) -> bool {
        matches!(self, Self::ContentPolicy(_))
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with this id
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Requested id
        id: String,
    },

    /// Backend failure
    #[error("backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create template-not-found error
    #[inline]
    pub fn template_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "template",
            id: id.into(),
        }
    }

    /// Create context-not-found error
    #[inline]
    pub fn context_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "context",
            id: id.into(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// I/O error
        source: std::io::Error,
    },

    /// Config is not valid TOML for the engine
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_policy_is_distinguished() {
        assert!(GenerationError::ContentPolicy("nope".into()).is_content_policy());
        assert!(!GenerationError::Upstream("503".into()).is_content_policy());
    }

    #[test]
    fn placeholder_failure_keeps_partial() {
        let partial = DocumentState::new(vec![]);
        let err = EngineError::placeholder_failed(
            "gen-h1",
            GenerationError::Upstream("timeout".into()),
            partial.clone(),
        );
        assert!(err.to_string().contains("gen-h1"));
        assert_eq!(err.partial(), Some(&partial));
        assert!(EngineError::from(StoreError::template_not_found("t"))
            .partial()
            .is_none());
    }

    #[test]
    fn store_error_display() {
        assert_eq!(
            StoreError::context_not_found("c1").to_string(),
            "context not found: c1"
        );
    }
}
