//! Sensitive word screening for comment moderation
//!
//! Comments whose content contains any configured word are held for staff
//! review instead of being approved on submission. Matching is a plain,
//! case-sensitive substring test against every word in the list.

use crate::error::{Error, Result};
use crate::store::{ContentStore, StoreError};
use async_trait::async_trait;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Where the current sensitive word list comes from.
#[async_trait]
pub trait SensitiveWordSource: Send + Sync {
    async fn list_all_words(&self) -> std::result::Result<Vec<String>, StoreError>;
}

/// Fixed in-process list.
#[derive(Debug, Clone, Default)]
pub struct StaticWordList(pub Vec<String>);

impl StaticWordList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(words.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl SensitiveWordSource for StaticWordList {
    async fn list_all_words(&self) -> std::result::Result<Vec<String>, StoreError> {
        Ok(self.0.clone())
    }
}

/// Wraps another source and keeps its list for a fixed TTL.
pub struct CachedWordSource {
    inner: Arc<dyn SensitiveWordSource>,
    cache: Cache<(), Arc<Vec<String>>>,
}

impl CachedWordSource {
    pub fn new(inner: Arc<dyn SensitiveWordSource>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder().time_to_live(ttl).max_capacity(1).build(),
        }
    }

    /// Drop the cached list; the next lookup reloads from the inner source.
    pub fn invalidate(&self) {
        self.cache.invalidate(&());
    }
}

#[async_trait]
impl SensitiveWordSource for CachedWordSource {
    async fn list_all_words(&self) -> std::result::Result<Vec<String>, StoreError> {
        if let Some(words) = self.cache.get(&()) {
            return Ok(words.as_ref().clone());
        }

        let words = Arc::new(self.inner.list_all_words().await?);
        log::debug!("Loaded {} sensitive words", words.len());
        self.cache.insert((), words.clone());
        Ok(words.as_ref().clone())
    }
}

/// First word of `words` found in `content`, if any. Empty words never match.
pub fn find_sensitive<'a>(content: &str, words: &'a [String]) -> Option<&'a str> {
    words
        .iter()
        .map(String::as_str)
        .find(|word| !word.is_empty() && content.contains(word))
}

/// Add a word to the stored list.
pub async fn add_word(store: &dyn ContentStore, word: &str) -> Result<String> {
    let word = word.trim();
    if word.is_empty() {
        return Err(Error::validation("sensitive word must not be empty"));
    }

    match store.insert_sensitive_word(word).await {
        Ok(()) => {
            log::info!("Added sensitive word {:?}", word);
            Ok(word.to_string())
        }
        Err(StoreError::Duplicate(_)) => Err(Error::Conflict(format!(
            "sensitive word {:?} already exists",
            word
        ))),
        Err(e) => Err(e.into()),
    }
}
