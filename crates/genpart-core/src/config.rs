//! Engine configuration
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! neutral_sentence = "No information was provided for this part."
//! heading_level = 2
//!
//! [cache]
//! ttl_secs = 5
//! max_capacity = 1000
//! ```

use crate::error::ConfigError;
use genpart_sync::SyncOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default paragraph for the `neutralSentence` policy
pub const DEFAULT_NEUTRAL_SENTENCE: &str = "No information was provided for this part.";

/// Default output format instructions sent with every generation request
pub const DEFAULT_OUTPUT_FORMAT: &str = "\
### OUTPUT FORMAT
- Plain paragraphs separated by one blank line.
- Markdown headings (#) only when a title marker is not provided.
- No lists, no tables, no code blocks.
- Reproduce every marker exactly, alone on its own line.";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Resolution-context cache
    pub cache: CacheConfig,
    /// Paragraph emitted by the `neutralSentence` policy
    pub neutral_sentence: String,
    /// Level of group headings emitted by forward sync
    pub heading_level: u8,
    /// Output format instructions for recipes without their own
    pub output_format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            neutral_sentence: DEFAULT_NEUTRAL_SENTENCE.to_string(),
            heading_level: 2,
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
        }
    }
}

/// Context cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Maximum number of cached contexts
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 5,
            max_capacity: 1000,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With group heading level
    #[inline]
    #[must_use]
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level;
        self
    }

    /// With cache TTL
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl_secs = ttl.as_secs();
        self
    }

    /// Parse and validate TOML
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&raw)?;
        info!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=6).contains(&self.heading_level) {
            return Err(ConfigError::Invalid(format!(
                "heading_level must be between 1 and 6, got {}",
                self.heading_level
            )));
        }
        if self.cache.max_capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Forward synchronization options
    #[inline]
    #[must_use]
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions::default().with_heading_level(self.heading_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache.ttl(), Duration::from_secs(5));
        assert_eq!(config.cache.max_capacity, 1000);
        assert_eq!(config.sync_options().heading_level, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("heading_level = 3\n[cache]\nttl_secs = 1\n").unwrap();
        assert_eq!(config.heading_level, 3);
        assert_eq!(config.cache.ttl_secs, 1);
        assert_eq!(config.cache.max_capacity, 1000);
        assert_eq!(config.neutral_sentence, DEFAULT_NEUTRAL_SENTENCE);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("heading_level = 9"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("heading_level = \"two\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "neutral_sentence = \"Nothing to report.\"").unwrap();
        let config = EngineConfig::load(file.path()).await.unwrap();
        assert_eq!(config.neutral_sentence, "Nothing to report.");

        let missing = EngineConfig::load("/nonexistent/genpart.toml").await;
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
