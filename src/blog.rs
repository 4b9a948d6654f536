//! One handle over every blog service, sharing a single store.

use crate::app_config::AppConfig;
use crate::articles::{ArticleService, ViewTracker};
use crate::categories::CategoryService;
use crate::comments::CommentService;
use crate::engagement::EngagementService;
use crate::error::Result;
use crate::notifications::Notifier;
use crate::sensitive_words::{self, CachedWordSource, SensitiveWordSource};
use crate::slug::SlugAllocator;
use crate::stats::{self, SiteStats};
use crate::store::ContentStore;
use crate::tags::TagService;
use crate::viewer::Viewer;
use std::sync::Arc;
use std::time::Duration;

pub struct Blog {
    store: Arc<dyn ContentStore>,
    words: Arc<CachedWordSource>,
    views: ViewTracker,
    articles: ArticleService,
    categories: CategoryService,
    tags: TagService,
    comments: CommentService,
    engagement: EngagementService,
}

impl Blog {
    /// Wire services over `store`, screening comments against `words`.
    pub fn new(
        store: Arc<dyn ContentStore>,
        words: Arc<dyn SensitiveWordSource>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        let words = Arc::new(CachedWordSource::new(
            words,
            Duration::from_secs(config.moderation.word_cache_seconds),
        ));
        let slugs = SlugAllocator::new(config.slug.clone());
        let tags = TagService::new(store.clone(), slugs.clone());

        Self {
            articles: ArticleService::new(
                store.clone(),
                slugs.clone(),
                tags.clone(),
                notifier.clone(),
                config.articles.clone(),
            ),
            categories: CategoryService::new(store.clone(), slugs),
            comments: CommentService::new(
                store.clone(),
                words.clone(),
                notifier,
                config.comments.clone(),
            ),
            engagement: EngagementService::new(store.clone()),
            views: ViewTracker::new(&config.views),
            tags,
            words,
            store,
        }
    }

    /// Wire services over a store that also holds the sensitive word list.
    pub fn with_store<S>(store: Arc<S>, notifier: Arc<dyn Notifier>, config: &AppConfig) -> Self
    where
        S: ContentStore + SensitiveWordSource + 'static,
    {
        Self::new(store.clone(), store, notifier, config)
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn articles(&self) -> &ArticleService {
        &self.articles
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn tags(&self) -> &TagService {
        &self.tags
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn engagement(&self) -> &EngagementService {
        &self.engagement
    }

    pub fn view_tracker(&self) -> &ViewTracker {
        &self.views
    }

    /// Count a view of `article_id` from `session`, once per window.
    pub async fn view_article(&self, session: &str, article_id: i32) -> Result<Option<i32>> {
        self.articles
            .record_view(&self.views, session, article_id)
            .await
    }

    /// Staff: add a sensitive word. Takes effect for the next comment.
    pub async fn add_sensitive_word(&self, viewer: &Viewer, word: &str) -> Result<String> {
        viewer.require_staff()?;
        let word = sensitive_words::add_word(self.store.as_ref(), word).await?;
        self.words.invalidate();
        Ok(word)
    }

    pub async fn sensitive_words(&self, viewer: &Viewer) -> Result<Vec<String>> {
        viewer.require_staff()?;
        Ok(self.store.list_sensitive_words().await?)
    }

    /// Drop the cached word list after changing it outside this handle.
    pub fn invalidate_sensitive_words(&self) {
        self.words.invalidate();
    }

    pub async fn stats(&self) -> Result<SiteStats> {
        stats::collect(self.store.as_ref()).await
    }
}
