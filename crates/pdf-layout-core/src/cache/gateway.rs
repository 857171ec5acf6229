//! Cache-first resolution of translation chunks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::{CacheKey, TranslationCache};
use crate::config::Lang;
use crate::error::{Error, Result};
use crate::translator::{LengthConstraint, Translator};

/// Shared cancellation switch for a document job.
///
/// Once set, no new remote calls are issued. Work already painted stays.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Resolves chunks through the cache, calling the translator only on a miss.
///
/// Concurrent misses on one key may each call the translator; the first
/// stored result wins and every caller returns that stored value.
#[derive(Clone)]
pub struct TranslationGateway {
    translator: Arc<dyn Translator>,
    cache: Arc<TranslationCache>,
    cancel: CancelFlag,
}

impl TranslationGateway {
    pub fn new(
        translator: Arc<dyn Translator>,
        cache: Arc<TranslationCache>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            translator,
            cache,
            cancel,
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub async fn resolve(
        &self,
        source: &Lang,
        target: &Lang,
        chunk: &str,
        constraint: Option<&LengthConstraint>,
    ) -> Result<String> {
        let key = CacheKey::new(source, target, chunk, constraint);

        if let Some(hit) = self.cache.get(&key).await {
            debug!("Cache hit for chunk {}", key);
            return Ok(hit);
        }

        self.cancel.check()?;
        debug!(
            "Cache miss for chunk {} ({} chars), calling {}",
            key,
            chunk.chars().count(),
            self.translator.name()
        );

        let translated = self
            .translator
            .translate(chunk, source, target, constraint)
            .await?;
        Ok(self.cache.insert(&key, translated).await)
    }
}
