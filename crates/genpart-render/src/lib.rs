//! GenPart rendering and assembly
//!
//! Turns generated text into document trees:
//!
//! - [`markdown`]: minimal markdown to heading/paragraph nodes
//! - [`anchor`]: marker discovery, prompt constraints and verification
//! - [`rules`]: conditional cell coloring
//! - [`TableRenderer`] / [`TitleRenderer`]: structural rendering of anchors
//! - [`DocumentAssembler`]: splices rendered anchors into the parsed text
//!
//! # Example
//!
//! ```rust,ignore
//! use genpart_render::{anchor, AssembleInput, DocumentAssembler};
//!
//! let anchors = anchor::collect(&questions);
//! let checked = anchor::post_process(&generated, &anchors);
//! let assembly = DocumentAssembler::new().assemble(
//!     &AssembleInput::new(&checked.text, &anchors, &questions, &answers)
//!         .with_missing(&checked.status.missing),
//! )?;
//! ```

#![warn(unreachable_pub)]

pub mod anchor;
pub mod answers_md;
pub mod assembler;
mod error;
pub mod markdown;
pub mod registry;
pub mod rules;
pub mod table;
pub mod title;

pub use answers_md::answers_to_markdown;
pub use assembler::{AssembleInput, Assembly, DocumentAssembler};
pub use error::{AssembleError, RenderError};
pub use markdown::MarkdownParser;
pub use registry::{default_renderers, AnchorRenderer, RenderContext, RendererRegistry, SnippetLibrary};
pub use rules::{ColorPreset, ColorPresets};
pub use table::TableRenderer;
pub use title::{TitlePresetRegistry, TitleRenderer};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        anchor, AnchorRenderer, AssembleInput, Assembly, DocumentAssembler, MarkdownParser,
        RenderContext, RendererRegistry, SnippetLibrary,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
