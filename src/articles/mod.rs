//! Article lifecycle
//!
//! Articles move between `draft` and `published`; visibility is orthogonal.
//! `published_at` is stamped the first time an article is published and is
//! never cleared. The slug is assigned at creation and never changes.

pub mod query;
pub mod views;

use crate::app_config::ArticlesConfig;
use crate::constants::PENDING_SLUG_PREFIX;
use crate::error::{Error, Result};
use crate::notifications::{self, dispatcher, Notifier};
use crate::orm::articles::{self, ArticleStatus, Visibility};
use crate::slug::{slugify, SlugAllocator};
use crate::store::ContentStore;
use crate::tags::{TagInput, TagService};
use crate::viewer::Viewer;
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub use query::{ArticleDetail, ArticleListParams};
pub use views::ViewTracker;

/// Input for a new article.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewArticle {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: ArticleStatus,
    #[serde(default)]
    pub visibility: Visibility,
    pub category_id: Option<i32>,
    #[serde(default)]
    pub tags: TagInput,
}

/// Partial update. `None` leaves a field alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ArticleStatus>,
    pub visibility: Option<Visibility>,
    /// `Some(None)` clears the category
    pub category_id: Option<Option<i32>>,
    /// Replaces the whole tag set
    pub tags: Option<TagInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    AlreadyPublished,
}

/// Apply a status change. Returns true on a draft to published transition.
fn apply_status(article: &mut articles::Model, status: ArticleStatus, now: NaiveDateTime) -> bool {
    let was_published = article.status.is_published();
    article.status = status;
    if status.is_published() && article.published_at.is_none() {
        article.published_at = Some(now);
    }
    status.is_published() && !was_published
}

#[derive(Clone)]
pub struct ArticleService {
    store: Arc<dyn ContentStore>,
    slugs: SlugAllocator,
    tags: TagService,
    notifier: Arc<dyn Notifier>,
    config: ArticlesConfig,
}

impl ArticleService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        slugs: SlugAllocator,
        tags: TagService,
        notifier: Arc<dyn Notifier>,
        config: ArticlesConfig,
    ) -> Self {
        Self {
            store,
            slugs,
            tags,
            notifier,
            config,
        }
    }

    async fn require_category(&self, category_id: Option<i32>) -> Result<()> {
        if let Some(id) = category_id {
            if self.store.find_category(id).await?.is_none() {
                return Err(Error::not_found(format!("category {}", id)));
            }
        }
        Ok(())
    }

    /// Fetch an article for modification: invisible reads as not found,
    /// visible but not owned is forbidden.
    async fn load_for_modify(&self, viewer: &Viewer, id: i32) -> Result<articles::Model> {
        let article = self
            .store
            .find_article(id)
            .await?
            .filter(|a| viewer.can_read_article(a))
            .ok_or_else(|| Error::not_found(format!("article {}", id)))?;
        viewer.require_modify(&article)?;
        Ok(article)
    }

    pub async fn create(&self, viewer: &Viewer, form: NewArticle) -> Result<articles::Model> {
        let author_id = viewer.require_user()?;
        let form = NewArticle {
            title: form.title.trim().to_string(),
            ..form
        };
        form.validate()?;
        self.require_category(form.category_id).await?;
        let tags = self.tags.reconcile(&form.tags).await?;

        let now = Utc::now().naive_utc();
        let mut draft = articles::Model {
            id: 0,
            title: form.title.clone(),
            slug: String::new(),
            content: form.content.clone(),
            author_id,
            category_id: form.category_id,
            status: ArticleStatus::Draft,
            visibility: form.visibility,
            view_count: 0,
            created_at: now,
            updated_at: now,
            published_at: None,
        };
        let published = apply_status(&mut draft, form.status, now);

        let article = match self.insert_with_slug(draft).await {
            Ok(article) => article,
            Err(e) => {
                self.tags.discard(&tags.created).await;
                return Err(e);
            }
        };

        if let Err(e) = self.store.set_article_tags(article.id, &tags.ids()).await {
            self.store.delete_article(article.id).await?;
            self.tags.discard(&tags.created).await;
            return Err(e.into());
        }

        log::info!(
            "Article {} ({}) created by user {} as {}",
            article.id,
            article.slug,
            author_id,
            article.status.as_str()
        );
        if published {
            notifications::dispatch(
                self.notifier.as_ref(),
                dispatcher::article_published(&article),
            );
        }
        Ok(article)
    }

    /// Insert with a slug derived from the title, or with the id as slug
    /// when the title yields nothing usable.
    async fn insert_with_slug(&self, draft: articles::Model) -> Result<articles::Model> {
        let store = self.store.as_ref();
        let base = slugify(&draft.title);

        if !base.is_empty() {
            return self
                .slugs
                .claim(&base, |slug| {
                    let row = articles::Model {
                        slug,
                        ..draft.clone()
                    };
                    async move { store.insert_article(row).await }
                })
                .await;
        }

        let placeholder = format!("{}{}", PENDING_SLUG_PREFIX, uuid::Uuid::new_v4().simple());
        let inserted = self
            .slugs
            .claim(&placeholder, |slug| {
                let row = articles::Model {
                    slug,
                    ..draft.clone()
                };
                async move { store.insert_article(row).await }
            })
            .await?;

        let id_slug = inserted.id.to_string();
        let renamed = self
            .slugs
            .claim(&id_slug, |slug| {
                let row = articles::Model {
                    slug,
                    ..inserted.clone()
                };
                async move { store.update_article(row).await }
            })
            .await;

        match renamed {
            Ok(article) => Ok(article),
            Err(e) => {
                self.store.delete_article(inserted.id).await?;
                Err(e)
            }
        }
    }

    /// Apply `changes` as owner or staff. The slug never changes.
    pub async fn update(
        &self,
        viewer: &Viewer,
        id: i32,
        changes: ArticleChanges,
    ) -> Result<articles::Model> {
        let mut article = self.load_for_modify(viewer, id).await?;

        if let Some(title) = changes.title {
            let title = title.trim().to_string();
            if title.is_empty() || title.chars().count() as u64 > crate::constants::MAX_TITLE_LENGTH
            {
                return Err(Error::validation("title must be 1 to 200 characters"));
            }
            article.title = title;
        }
        if let Some(content) = changes.content {
            article.content = content;
        }
        if let Some(visibility) = changes.visibility {
            article.visibility = visibility;
        }
        if let Some(category_id) = changes.category_id {
            self.require_category(category_id).await?;
            article.category_id = category_id;
        }

        let tags = match &changes.tags {
            Some(input) => Some(self.tags.reconcile(input).await?),
            None => None,
        };

        let now = Utc::now().naive_utc();
        let published = match changes.status {
            Some(status) => apply_status(&mut article, status, now),
            None => false,
        };
        article.updated_at = now;

        let saved = match &tags {
            Some(tags) => {
                self.store
                    .update_article_with_tags(article, &tags.ids())
                    .await
            }
            None => self.store.update_article(article).await,
        };
        let article = match saved {
            Ok(article) => article,
            Err(e) => {
                if let Some(tags) = &tags {
                    self.tags.discard(&tags.created).await;
                }
                return Err(e.into());
            }
        };

        log::info!("Article {} updated", article.id);
        if published {
            log::info!("Article {} published", article.id);
            notifications::dispatch(
                self.notifier.as_ref(),
                dispatcher::article_published(&article),
            );
        }
        Ok(article)
    }

    /// Explicit publish. Publishing a published article changes nothing.
    pub async fn publish(&self, viewer: &Viewer, id: i32) -> Result<PublishOutcome> {
        let mut article = self.load_for_modify(viewer, id).await?;
        if article.status.is_published() {
            log::debug!("Article {} already published", id);
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let now = Utc::now().naive_utc();
        apply_status(&mut article, ArticleStatus::Published, now);
        article.updated_at = now;
        let article = self.store.update_article(article).await?;

        log::info!("Article {} published", article.id);
        notifications::dispatch(
            self.notifier.as_ref(),
            dispatcher::article_published(&article),
        );
        Ok(PublishOutcome::Published)
    }

    /// Back to draft; `published_at` is kept.
    pub async fn unpublish(&self, viewer: &Viewer, id: i32) -> Result<articles::Model> {
        let mut article = self.load_for_modify(viewer, id).await?;
        if !article.status.is_published() {
            return Ok(article);
        }

        let now = Utc::now().naive_utc();
        apply_status(&mut article, ArticleStatus::Draft, now);
        article.updated_at = now;
        let article = self.store.update_article(article).await?;
        log::info!("Article {} unpublished", article.id);
        Ok(article)
    }

    /// Delete with comments, likes and favorites.
    pub async fn delete(&self, viewer: &Viewer, id: i32) -> Result<()> {
        self.load_for_modify(viewer, id).await?;
        if !self.store.delete_article(id).await? {
            return Err(Error::not_found(format!("article {}", id)));
        }
        log::info!("Article {} deleted by user {:?}", id, viewer.get_id());
        Ok(())
    }

    /// Unconditional atomic `view_count + 1`. Returns the new count.
    ///
    /// Callers suppress repeat views themselves, see [`ViewTracker`].
    pub async fn increase_views(&self, id: i32) -> Result<i32> {
        let count = match self.store.increment_views(id).await {
            Err(e) if e.is_transient() => {
                log::debug!("Transient failure counting view of {}, retrying: {}", id, e);
                self.store.increment_views(id).await
            }
            other => other,
        }
        .map_err(|e| match e {
            crate::store::StoreError::NotFound => Error::not_found(format!("article {}", id)),
            e => e.into(),
        })?;

        log::debug!("Article {} view count now {}", id, count);
        Ok(count)
    }

    /// Count a view unless `session` already viewed the article recently.
    pub async fn record_view(
        &self,
        tracker: &ViewTracker,
        session: &str,
        id: i32,
    ) -> Result<Option<i32>> {
        if !tracker.first_view(session, id) {
            return Ok(None);
        }
        self.increase_views(id).await.map(Some)
    }

    pub fn config(&self) -> &ArticlesConfig {
        &self.config
    }
}
