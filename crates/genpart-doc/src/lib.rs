//! GenPart document model
//!
//! Shared types for template synchronization and generative assembly.
//!
//! # Core Concepts
//!
//! - [`DocumentNode`]: closed sum type over rich-text nodes, with managed
//!   group headings, placeholders and anchors
//! - [`DocumentState`]: the `{root}` editor envelope
//! - [`QuestionRecord`]: one schema field; [`parse_schema`] reads an array
//! - [`GenPartsSpec`]: placeholder specification, legacy and envelope forms
//! - [`TemplateSyncReport`]: diff record produced by every sync pass
//!
//! # Example
//!
//! ```rust,ignore
//! use genpart_doc::{DocumentState, GenPartsSpec};
//!
//! let state = DocumentState::from_json(stored_tree)?;
//! let spec = GenPartsSpec::from_value(&stored_spec);
//! assert!(!spec.is_legacy());
//! ```

#![warn(unreachable_pub)]

pub mod answers;
mod error;
pub mod node;
mod report;
pub mod schema;
pub mod spec;
mod state;
pub mod traverse;

pub use answers::Answers;
pub use error::DocError;
pub use node::{
    AnchorNode, Attrs, DocumentNode, ElementNode, GroupHeadingNode, HeadingNode, KeyOrder,
    PlaceholderNode, SlotNode, TextNode,
};
pub use report::TemplateSyncReport;
pub use schema::{parse_schema, schema_to_value, QuestionKind, QuestionRecord, TableDef};
pub use spec::{AnchorKind, AnchorSpec, EmptyPolicy, GenPartsSpec, PlaceholderSpec};
pub use state::DocumentState;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        AnchorKind, AnchorSpec, Answers, DocumentNode, DocumentState, ElementNode, EmptyPolicy,
        GenPartsSpec, PlaceholderSpec, QuestionKind, QuestionRecord, TemplateSyncReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
