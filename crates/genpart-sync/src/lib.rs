//! Schema and layout synchronization
//!
//! Keeps a question schema and a freely edited document tree in sync in
//! both directions while preserving the identity of generated regions.
//!
//! # Core Concepts
//!
//! - [`schema_to_layout`]: schema edit to managed skeleton, merged into the
//!   previous tree
//! - [`layout_to_schema`]: edited tree back to schema and placeholder spec
//! - [`match_placeholder`]: placeholder identity reconciliation
//!
//! # Example
//!
//! ```rust,ignore
//! use genpart_sync::{layout_to_schema, schema_to_layout};
//!
//! let forward = schema_to_layout(&questions, Some(&tree), Some(&spec));
//! let reverse = layout_to_schema(&forward.tree, &questions);
//! assert_eq!(reverse.schema, questions);
//! ```

#![warn(unreachable_pub)]

pub mod forward;
pub mod grouping;
pub mod ids;
pub mod matching;
pub mod merge;
pub mod reverse;

pub use forward::{schema_to_layout, schema_to_layout_with, SyncOptions, SyncOutcome};
pub use grouping::{group_questions, QuestionGroup, Segment};
pub use matching::{match_placeholder, Candidate, Matching};
pub use reverse::{layout_to_schema, ReverseOutcome};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        layout_to_schema, schema_to_layout, ReverseOutcome, SyncOptions, SyncOutcome,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
