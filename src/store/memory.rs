//! In-process content store.
//!
//! All tables live behind one `RwLock`, so every trait method is atomic with
//! respect to every other. Unique constraints mirror the database schema.

use super::{
    ArticleFilter, ArticleOrder, CommentFilter, ContentStore, EngagementKind, StoreError,
    UniqueKey,
};
use crate::orm::{articles, categories, comments, tags};
use crate::sensitive_words::SensitiveWordSource;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    next_id: i32,
    articles: BTreeMap<i32, articles::Model>,
    categories: BTreeMap<i32, categories::Model>,
    tags: BTreeMap<i32, tags::Model>,
    article_tags: BTreeSet<(i32, i32)>,
    comments: BTreeMap<i32, comments::Model>,
    likes: HashMap<(i32, i32), NaiveDateTime>,
    favorites: HashMap<(i32, i32), NaiveDateTime>,
    sensitive_words: Vec<(NaiveDateTime, String)>,
}

impl Tables {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn engagements(&mut self, kind: EngagementKind) -> &mut HashMap<(i32, i32), NaiveDateTime> {
        match kind {
            EngagementKind::Like => &mut self.likes,
            EngagementKind::Favorite => &mut self.favorites,
        }
    }

    fn article_has_any_tag(&self, article_id: i32, tag_ids: &[i32]) -> bool {
        tag_ids
            .iter()
            .any(|tag_id| self.article_tags.contains(&(article_id, *tag_id)))
    }

    fn filtered_articles(&self, filter: &ArticleFilter) -> Vec<articles::Model> {
        let mut rows: Vec<articles::Model> = self
            .articles
            .values()
            .filter(|a| filter.matches_row(a))
            .filter(|a| {
                filter.any_tag_ids.is_empty() || self.article_has_any_tag(a.id, &filter.any_tag_ids)
            })
            .cloned()
            .collect();

        match filter.order {
            ArticleOrder::CreatedDesc => {
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            ArticleOrder::PublishedDesc => {
                rows.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)))
            }
        }
        rows
    }

    /// Overwrite an article row. `view_count` is owned by
    /// `increment_views` and always keeps its stored value.
    fn update_article(&mut self, article: articles::Model) -> Result<articles::Model, StoreError> {
        let view_count = match self.articles.get(&article.id) {
            Some(stored) => stored.view_count,
            None => return Err(StoreError::NotFound),
        };
        if self
            .articles
            .values()
            .any(|a| a.id != article.id && a.slug == article.slug)
        {
            return Err(StoreError::Duplicate(UniqueKey::Slug));
        }
        let stored = articles::Model {
            view_count,
            ..article
        };
        self.articles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn check_tags_exist(&self, tag_ids: &[i32]) -> Result<(), StoreError> {
        if tag_ids.iter().any(|id| !self.tags.contains_key(id)) {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn replace_article_tags(&mut self, article_id: i32, tag_ids: &[i32]) {
        self.article_tags.retain(|(a, _)| *a != article_id);
        for tag_id in tag_ids {
            self.article_tags.insert((article_id, *tag_id));
        }
    }

    /// Ids of `root` and everything below it, parents before children.
    fn comment_subtree(&self, root: i32) -> Vec<i32> {
        let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
        for comment in self.comments.values() {
            if let Some(parent_id) = comment.parent_id {
                children.entry(parent_id).or_default().push(comment.id);
            }
        }

        let mut ids = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            ids.push(id);
            if let Some(kids) = children.get(&id) {
                stack.extend(kids.iter().copied());
            }
        }
        ids
    }
}

/// Process-local [`ContentStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// Number of upcoming write calls that fail with `Transient`.
    injected_failures: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` slug-claiming inserts, view increments and tag
    /// link writes fail with [`StoreError::Transient`], as a contended
    /// database would.
    pub fn inject_transient_failures(&self, count: u32) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> Result<(), StoreError> {
        let taken = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match taken {
            Ok(_) => Err(StoreError::Transient("injected failure".to_string())),
            Err(_) => Ok(()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn insert_article(
        &self,
        mut article: articles::Model,
    ) -> Result<articles::Model, StoreError> {
        self.take_injected_failure()?;
        let mut tables = self.write()?;
        if tables.articles.values().any(|a| a.slug == article.slug) {
            return Err(StoreError::Duplicate(UniqueKey::Slug));
        }
        article.id = tables.allocate_id();
        tables.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn update_article(
        &self,
        article: articles::Model,
    ) -> Result<articles::Model, StoreError> {
        self.write()?.update_article(article)
    }

    async fn update_article_with_tags(
        &self,
        article: articles::Model,
        tag_ids: &[i32],
    ) -> Result<articles::Model, StoreError> {
        self.take_injected_failure()?;
        let mut tables = self.write()?;
        tables.check_tags_exist(tag_ids)?;
        let article = tables.update_article(article)?;
        tables.replace_article_tags(article.id, tag_ids);
        Ok(article)
    }

    async fn find_article(&self, id: i32) -> Result<Option<articles::Model>, StoreError> {
        Ok(self.read()?.articles.get(&id).cloned())
    }

    async fn find_article_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<articles::Model>, StoreError> {
        Ok(self
            .read()?
            .articles
            .values()
            .find(|a| a.slug == slug)
            .cloned())
    }

    async fn find_articles(
        &self,
        filter: &ArticleFilter,
    ) -> Result<Vec<articles::Model>, StoreError> {
        let rows = self.read()?.filtered_articles(filter);
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(limit)
            .collect())
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64, StoreError> {
        Ok(self.read()?.filtered_articles(filter).len() as u64)
    }

    async fn delete_article(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.articles.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.article_id != id);
        tables.likes.retain(|(_, article_id), _| *article_id != id);
        tables.favorites.retain(|(_, article_id), _| *article_id != id);
        tables.article_tags.retain(|(article_id, _)| *article_id != id);
        Ok(true)
    }

    async fn increment_views(&self, id: i32) -> Result<i32, StoreError> {
        self.take_injected_failure()?;
        let mut tables = self.write()?;
        let article = tables.articles.get_mut(&id).ok_or(StoreError::NotFound)?;
        article.view_count += 1;
        Ok(article.view_count)
    }

    async fn insert_category(
        &self,
        mut category: categories::Model,
    ) -> Result<categories::Model, StoreError> {
        self.take_injected_failure()?;
        let mut tables = self.write()?;
        if tables.categories.values().any(|c| c.slug == category.slug) {
            return Err(StoreError::Duplicate(UniqueKey::Slug));
        }
        category.id = tables.allocate_id();
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn find_category(&self, id: i32) -> Result<Option<categories::Model>, StoreError> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<categories::Model>, StoreError> {
        Ok(self
            .read()?
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn list_categories(&self) -> Result<Vec<categories::Model>, StoreError> {
        let mut rows: Vec<_> = self.read()?.categories.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn delete_category(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for article in tables.articles.values_mut() {
            if article.category_id == Some(id) {
                article.category_id = None;
            }
        }
        Ok(true)
    }

    async fn insert_tag(&self, mut tag: tags::Model) -> Result<tags::Model, StoreError> {
        self.take_injected_failure()?;
        let mut tables = self.write()?;
        if tables.tags.values().any(|t| t.name == tag.name) {
            return Err(StoreError::Duplicate(UniqueKey::Name));
        }
        if tables.tags.values().any(|t| t.slug == tag.slug) {
            return Err(StoreError::Duplicate(UniqueKey::Slug));
        }
        tag.id = tables.allocate_id();
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<tags::Model>, StoreError> {
        Ok(self
            .read()?
            .tags
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<tags::Model>, StoreError> {
        Ok(self
            .read()?
            .tags
            .values()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn list_tags(&self) -> Result<Vec<tags::Model>, StoreError> {
        let mut rows: Vec<_> = self.read()?.tags.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn article_tags(&self, article_id: i32) -> Result<Vec<tags::Model>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .article_tags
            .iter()
            .filter(|(a, _)| *a == article_id)
            .filter_map(|(_, tag_id)| tables.tags.get(tag_id).cloned())
            .collect())
    }

    async fn set_article_tags(&self, article_id: i32, tag_ids: &[i32]) -> Result<(), StoreError> {
        self.take_injected_failure()?;
        let mut tables = self.write()?;
        if !tables.articles.contains_key(&article_id) {
            return Err(StoreError::NotFound);
        }
        tables.check_tags_exist(tag_ids)?;
        tables.replace_article_tags(article_id, tag_ids);
        Ok(())
    }

    async fn delete_unused_tags(&self, tag_ids: &[i32]) -> Result<u64, StoreError> {
        let mut tables = self.write()?;
        let used: HashSet<i32> = tables.article_tags.iter().map(|(_, t)| *t).collect();
        let mut deleted = 0;
        for tag_id in tag_ids {
            if !used.contains(tag_id) && tables.tags.remove(tag_id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn insert_comment(
        &self,
        mut comment: comments::Model,
    ) -> Result<comments::Model, StoreError> {
        let mut tables = self.write()?;
        if !tables.articles.contains_key(&comment.article_id) {
            return Err(StoreError::NotFound);
        }
        if let Some(parent_id) = comment.parent_id {
            if !tables.comments.contains_key(&parent_id) {
                return Err(StoreError::NotFound);
            }
        }
        comment.id = tables.allocate_id();
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &self,
        comment: comments::Model,
    ) -> Result<comments::Model, StoreError> {
        let mut tables = self.write()?;
        match tables.comments.get_mut(&comment.id) {
            Some(row) => {
                *row = comment.clone();
                Ok(comment)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_comment(&self, id: i32) -> Result<Option<comments::Model>, StoreError> {
        Ok(self.read()?.comments.get(&id).cloned())
    }

    async fn find_comments(
        &self,
        filter: &CommentFilter,
    ) -> Result<Vec<comments::Model>, StoreError> {
        let mut rows: Vec<_> = self
            .read()?
            .comments
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .comments
            .values()
            .filter(|c| filter.matches(c))
            .count() as u64)
    }

    async fn delete_comment(&self, id: i32) -> Result<u64, StoreError> {
        let mut tables = self.write()?;
        if !tables.comments.contains_key(&id) {
            return Ok(0);
        }
        let doomed: HashSet<i32> = tables.comment_subtree(id).into_iter().collect();
        tables.comments.retain(|comment_id, _| !doomed.contains(comment_id));
        Ok(doomed.len() as u64)
    }

    async fn insert_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.articles.contains_key(&article_id) {
            return Err(StoreError::NotFound);
        }
        let rows = tables.engagements(kind);
        if rows.contains_key(&(user_id, article_id)) {
            return Err(StoreError::Duplicate(UniqueKey::Membership));
        }
        rows.insert((user_id, article_id), Utc::now().naive_utc());
        Ok(())
    }

    async fn delete_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<bool, StoreError> {
        Ok(self
            .write()?
            .engagements(kind)
            .remove(&(user_id, article_id))
            .is_some())
    }

    async fn has_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<bool, StoreError> {
        let tables = self.read()?;
        let rows = match kind {
            EngagementKind::Like => &tables.likes,
            EngagementKind::Favorite => &tables.favorites,
        };
        Ok(rows.contains_key(&(user_id, article_id)))
    }

    async fn count_engagements(
        &self,
        kind: EngagementKind,
        article_id: i32,
    ) -> Result<u64, StoreError> {
        let tables = self.read()?;
        let rows = match kind {
            EngagementKind::Like => &tables.likes,
            EngagementKind::Favorite => &tables.favorites,
        };
        Ok(rows.keys().filter(|(_, a)| *a == article_id).count() as u64)
    }

    async fn insert_sensitive_word(&self, word: &str) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.sensitive_words.iter().any(|(_, w)| w == word) {
            return Err(StoreError::Duplicate(UniqueKey::Other));
        }
        tables
            .sensitive_words
            .push((Utc::now().naive_utc(), word.to_string()));
        Ok(())
    }

    async fn list_sensitive_words(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.read()?;
        let mut words: Vec<_> = tables.sensitive_words.iter().rev().collect();
        words.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(words.into_iter().map(|(_, w)| w.clone()).collect())
    }
}

#[async_trait]
impl SensitiveWordSource for MemoryStore {
    async fn list_all_words(&self) -> Result<Vec<String>, StoreError> {
        self.list_sensitive_words().await
    }
}
