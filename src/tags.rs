//! Tag reconciliation and lookup
//!
//! Free-form tag input is turned into canonical tag rows: names are trimmed,
//! blanks dropped, duplicates collapsed (exact match, first one wins), and
//! every name resolves to one stored tag, created on first use.

use crate::constants::{MAX_NAME_LENGTH, TAG_SEPARATORS};
use crate::error::{Error, Result};
use crate::orm::tags;
use crate::slug::SlugAllocator;
use crate::store::{ContentStore, StoreError, UniqueKey};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A structured tag entry, as sent by API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagName {
    pub name: String,
}

/// Tag input: either `"a, b, c"` or `[{"name": "a"}, {"name": "b"}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    Text(String),
    Names(Vec<TagName>),
}

impl Default for TagInput {
    fn default() -> Self {
        TagInput::Names(Vec::new())
    }
}

impl From<&str> for TagInput {
    fn from(text: &str) -> Self {
        TagInput::Text(text.to_string())
    }
}

impl TagInput {
    /// Trimmed, non-empty, de-duplicated names in input order.
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            TagInput::Text(text) => text.split(TAG_SEPARATORS).collect(),
            TagInput::Names(list) => list.iter().map(|t| t.name.as_str()).collect(),
        };

        let mut seen = HashSet::new();
        raw.into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_string()))
            .map(str::to_string)
            .collect()
    }
}

/// Tags resolved for one write, remembering which ones this call created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub tags: Vec<tags::Model>,
    /// Ids of rows inserted while resolving; candidates for cleanup if the
    /// write they were meant for fails.
    pub created: Vec<i32>,
}

impl Reconciled {
    pub fn ids(&self) -> Vec<i32> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn ContentStore>,
    slugs: SlugAllocator,
}

impl TagService {
    pub fn new(store: Arc<dyn ContentStore>, slugs: SlugAllocator) -> Self {
        Self { store, slugs }
    }

    /// Resolve every name in `input` to a stored tag, creating missing ones.
    ///
    /// On failure, tags already created by this call are removed again.
    pub async fn reconcile(&self, input: &TagInput) -> Result<Reconciled> {
        let names = input.names();
        if let Some(long) = names
            .iter()
            .find(|n| n.chars().count() as u64 > MAX_NAME_LENGTH)
        {
            return Err(Error::validation(format!("tag name too long: {}", long)));
        }

        let mut resolved = Reconciled::default();
        for name in &names {
            match self.resolve(name).await {
                Ok((tag, created)) => {
                    if created {
                        resolved.created.push(tag.id);
                    }
                    resolved.tags.push(tag);
                }
                Err(e) => {
                    self.discard(&resolved.created).await;
                    return Err(e);
                }
            }
        }
        Ok(resolved)
    }

    /// Drop tags created for a write that did not happen. Tags some article
    /// links to in the meantime are kept.
    pub async fn discard(&self, created: &[i32]) {
        if created.is_empty() {
            return;
        }
        match self.store.delete_unused_tags(created).await {
            Ok(n) => log::debug!("Discarded {} unused tag(s)", n),
            Err(e) => log::warn!("Failed to discard tags {:?}: {}", created, e),
        }
    }

    async fn resolve(&self, name: &str) -> Result<(tags::Model, bool)> {
        if let Some(tag) = self.store.find_tag_by_name(name).await? {
            return Ok((tag, false));
        }

        let store = self.store.as_ref();
        let base = self.slugs.base_for_name(name);
        let created = self
            .slugs
            .claim(&base, |slug| {
                let tag = tags::Model {
                    id: 0,
                    name: name.to_string(),
                    slug,
                    created_at: Utc::now().naive_utc(),
                };
                async move { store.insert_tag(tag).await }
            })
            .await;

        match created {
            Ok(tag) => {
                log::info!("Created tag {:?} ({})", tag.name, tag.slug);
                Ok((tag, true))
            }
            // Someone else created the same name between our lookup and insert
            Err(Error::Store(StoreError::Duplicate(UniqueKey::Name))) => self
                .store
                .find_tag_by_name(name)
                .await?
                .map(|tag| (tag, false))
                .ok_or_else(|| Error::Conflict(format!("tag {:?} vanished during creation", name))),
            Err(e) => Err(e),
        }
    }

    pub async fn article_tags(&self, article_id: i32) -> Result<Vec<tags::Model>> {
        Ok(self.store.article_tags(article_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<tags::Model>> {
        Ok(self.store.list_tags().await?)
    }

    pub async fn by_slug(&self, slug: &str) -> Result<tags::Model> {
        self.store
            .find_tag_by_slug(slug)
            .await?
            .ok_or_else(|| Error::not_found(format!("tag {}", slug)))
    }
}
