//! Site statistics snapshot.

use crate::error::Result;
use crate::orm::articles::ArticleStatus;
use crate::store::{ArticleFilter, CommentFilter, ContentStore, VisibilityScope};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteStats {
    pub article_count: u64,
    pub published_article_count: u64,
    pub comment_count: u64,
    pub approved_comment_count: u64,
    pub tag_count: u64,
    pub category_count: u64,
    pub generated_at: NaiveDateTime,
}

pub async fn collect(store: &dyn ContentStore) -> Result<SiteStats> {
    log::info!("Generating site statistics");
    let started = Instant::now();

    let all = ArticleFilter::new(VisibilityScope::Everything);
    let published = ArticleFilter {
        status: Some(ArticleStatus::Published),
        ..all.clone()
    };

    let stats = SiteStats {
        article_count: store.count_articles(&all).await?,
        published_article_count: store.count_articles(&published).await?,
        comment_count: store.count_comments(&CommentFilter::default()).await?,
        approved_comment_count: store
            .count_comments(&CommentFilter {
                is_approved: Some(true),
                ..Default::default()
            })
            .await?,
        tag_count: store.list_tags().await?.len() as u64,
        category_count: store.list_categories().await?.len() as u64,
        generated_at: Utc::now().naive_utc(),
    };

    log::info!(
        "Site statistics generated in {:.2}s",
        started.elapsed().as_secs_f64()
    );
    Ok(stats)
}
