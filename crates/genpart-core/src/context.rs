//! Resolution contexts and their short-lived cache
//!
//! A resolution context describes the section being generated. Contexts are
//! loaded once per request burst: the cache deduplicates repeated loads and
//! entries expire unconditionally after the configured TTL.

use crate::error::StoreError;
use genpart_doc::QuestionRecord;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Section being generated
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionContext {
    /// Context id
    pub id: String,
    /// Section kind, used as recipe fallback
    #[serde(default)]
    pub section_kind: Option<String>,
    /// Section title
    #[serde(default)]
    pub section_title: Option<String>,
    /// Section questions; empty means the template schema
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
    /// Markdown used when the answers render to nothing
    #[serde(default)]
    pub markdown: Option<String>,
    /// Style prompt
    #[serde(default)]
    pub style_prompt: Option<String>,
}

impl ResolutionContext {
    /// Create empty context
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// With section kind
    #[inline]
    #[must_use]
    pub fn with_section_kind(mut self, kind: impl Into<String>) -> Self {
        self.section_kind = Some(kind.into());
        self
    }

    /// With section questions
    #[inline]
    #[must_use]
    pub fn with_questions(mut self, questions: Vec<QuestionRecord>) -> Self {
        self.questions = questions;
        self
    }

    /// With fallback markdown
    #[inline]
    #[must_use]
    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }
}

/// TTL cache of resolution contexts keyed by context id
#[derive(Debug, Clone)]
pub struct ContextCache {
    inner: Cache<String, Arc<ResolutionContext>>,
}

impl ContextCache {
    /// Create cache with capacity and TTL
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached context
    pub async fn get(&self, id: &str) -> Option<Arc<ResolutionContext>> {
        self.inner.get(id).await
    }

    /// Cached context, else load and cache it
    pub async fn get_or_load<F, Fut>(
        &self,
        id: &str,
        load: F,
    ) -> Result<Arc<ResolutionContext>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResolutionContext, StoreError>>,
    {
        if let Some(cached) = self.get(id).await {
            debug!(context_id = id, "Context cache hit");
            return Ok(cached);
        }

        let context = Arc::new(load().await?);
        self.inner.insert(id.to_string(), Arc::clone(&context)).await;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn repeated_loads_are_deduplicated() {
        let cache = ContextCache::new(10, Duration::from_secs(60));
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let ctx = cache
                .get_or_load("c1", || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(ResolutionContext::new("c1").with_section_kind("observations"))
                })
                .await
                .unwrap();
            assert_eq!(ctx.section_kind.as_deref(), Some("observations"));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = ContextCache::new(10, Duration::from_millis(50));
        cache
            .get_or_load("c1", || async { Ok(ResolutionContext::new("c1")) })
            .await
            .unwrap();
        assert!(cache.get("c1").await.is_some());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("c1").await.is_none());
    }

    #[tokio::test]
    async fn load_errors_are_not_cached() {
        let cache = ContextCache::new(10, Duration::from_secs(60));
        let err = cache
            .get_or_load("missing", || async {
                Err(StoreError::context_not_found("missing"))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.get("missing").await.is_none());
    }
}
