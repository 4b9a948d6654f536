//! Article read paths
//!
//! Every query starts from what the viewer may see: strangers get published
//! public articles, users additionally get their own, staff get everything.
//! An article the viewer may not see is reported as not found.

use super::ArticleService;
use crate::error::{Error, Result};
use crate::orm::articles::{self, ArticleStatus};
use crate::orm::{categories, tags};
use crate::pagination::{Page, PageWindow};
use crate::store::{ArticleFilter, ArticleOrder, VisibilityScope};
use crate::viewer::Viewer;
use serde::Deserialize;

/// Listing filters, as taken from a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleListParams {
    /// Category slug
    pub category: Option<String>,
    /// Tag slug
    pub tag: Option<String>,
    pub author_id: Option<i32>,
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub page: i64,
}

/// An article with its category and tags resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDetail {
    pub article: articles::Model,
    pub category: Option<categories::Model>,
    pub tags: Vec<tags::Model>,
}

pub fn scope_for(viewer: &Viewer) -> VisibilityScope {
    match viewer.get_id() {
        _ if viewer.is_staff => VisibilityScope::Everything,
        Some(user_id) => VisibilityScope::PublishedPublicOrAuthor(user_id),
        None => VisibilityScope::PublishedPublic,
    }
}

impl ArticleService {
    /// Paginated listing, newest created first.
    pub async fn list(
        &self,
        viewer: &Viewer,
        params: &ArticleListParams,
    ) -> Result<Page<articles::Model>> {
        let mut filter = ArticleFilter::new(scope_for(viewer));
        filter.status = params.status;
        filter.author_id = params.author_id;

        if let Some(slug) = &params.category {
            let category = self
                .store
                .find_category_by_slug(slug)
                .await?
                .ok_or_else(|| Error::not_found(format!("category {}", slug)))?;
            filter.category_id = Some(category.id);
        }
        if let Some(slug) = &params.tag {
            let tag = self
                .store
                .find_tag_by_slug(slug)
                .await?
                .ok_or_else(|| Error::not_found(format!("tag {}", slug)))?;
            filter.any_tag_ids = vec![tag.id];
        }

        let total = self.store.count_articles(&filter).await?;
        let window = PageWindow::new(params.page, self.config.per_page as u64, total);
        filter.offset = window.offset;
        filter.limit = Some(window.limit);

        let items = self.store.find_articles(&filter).await?;
        Ok(window.into_page(items, total))
    }

    /// Home feed: most recently published public articles.
    pub async fn latest(&self) -> Result<Vec<articles::Model>> {
        let filter = ArticleFilter {
            order: ArticleOrder::PublishedDesc,
            limit: Some(self.config.latest_limit as u64),
            ..ArticleFilter::new(VisibilityScope::PublishedPublic)
        };
        Ok(self.store.find_articles(&filter).await?)
    }

    /// Everything the viewer wrote, optionally narrowed by status.
    pub async fn my_articles(
        &self,
        viewer: &Viewer,
        status: Option<ArticleStatus>,
    ) -> Result<Vec<articles::Model>> {
        let user_id = viewer.require_user()?;
        let filter = ArticleFilter {
            author_id: Some(user_id),
            status,
            ..ArticleFilter::new(VisibilityScope::Everything)
        };
        Ok(self.store.find_articles(&filter).await?)
    }

    pub async fn get(&self, viewer: &Viewer, id: i32) -> Result<articles::Model> {
        self.store
            .find_article(id)
            .await?
            .filter(|a| viewer.can_read_article(a))
            .ok_or_else(|| Error::not_found(format!("article {}", id)))
    }

    pub async fn get_by_slug(&self, viewer: &Viewer, slug: &str) -> Result<articles::Model> {
        self.store
            .find_article_by_slug(slug)
            .await?
            .filter(|a| viewer.can_read_article(a))
            .ok_or_else(|| Error::not_found(format!("article {}", slug)))
    }

    /// Detail page data for a slug.
    pub async fn detail(&self, viewer: &Viewer, slug: &str) -> Result<ArticleDetail> {
        let article = self.get_by_slug(viewer, slug).await?;
        let category = match article.category_id {
            Some(id) => self.store.find_category(id).await?,
            None => None,
        };
        let tags = self.store.article_tags(article.id).await?;
        Ok(ArticleDetail {
            article,
            category,
            tags,
        })
    }

    /// Other public articles in the same category, or sharing a tag when
    /// the article has no category.
    pub async fn related(&self, article: &articles::Model) -> Result<Vec<articles::Model>> {
        if !article.is_publicly_visible() {
            return Ok(Vec::new());
        }

        let mut filter = ArticleFilter {
            exclude_id: Some(article.id),
            limit: Some(self.config.related_limit as u64),
            ..ArticleFilter::new(VisibilityScope::PublishedPublic)
        };

        match article.category_id {
            Some(category_id) => filter.category_id = Some(category_id),
            None => {
                let tag_ids: Vec<i32> = self
                    .store
                    .article_tags(article.id)
                    .await?
                    .into_iter()
                    .map(|t| t.id)
                    .collect();
                if tag_ids.is_empty() {
                    return Ok(Vec::new());
                }
                filter.any_tag_ids = tag_ids;
            }
        }

        Ok(self.store.find_articles(&filter).await?)
    }
}
