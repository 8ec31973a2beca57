//! GenPart engine
//!
//! Resolves template placeholders into generated content and exposes the
//! synchronizers behind a store-backed service:
//! - [`PlaceholderResolver`]: per-placeholder generation with empty-answer
//!   policies, anchor constraints and assembly
//! - [`TemplateService`]: forward/reverse sync and generation over a
//!   [`TemplateStore`]
//! - [`ContextCache`]: short-lived cache of resolution contexts
//! - [`EngineConfig`]: TOML configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use genpart_core::{EngineConfig, InMemoryStore, TemplateService};
//!
//! # async fn example(generator: Arc<dyn TextGenerator>) -> Result<(), EngineError> {
//! let service = TemplateService::new(Arc::new(InMemoryStore::new()), generator, EngineConfig::default());
//! service.sync_from_schema("template-1", false).await?;
//! let resolution = service.generate("template-1", "context-1", &answers).await?;
//! println!("Generated {} parts", resolution.generated.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod recipes;
pub mod service;
pub mod store;

pub use config::{CacheConfig, EngineConfig};
pub use context::{ContextCache, ResolutionContext};
pub use error::{ConfigError, EngineError, GenerationError, StoreError};
pub use generation::{combine_style_prompts, GenerationRequest, TextGenerator};
pub use pipeline::{PlaceholderResolver, Resolution};
pub use recipes::{Recipe, RecipeRegistry};
pub use service::TemplateService;
pub use store::{InMemoryStore, StoredTemplate, TemplateStore};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        EngineConfig, EngineError, GenerationRequest, InMemoryStore, PlaceholderResolver,
        ResolutionContext, TemplateService, TemplateStore, TextGenerator,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
