//! Likes and favorites
//!
//! A membership row per (user, article) is the whole state. Toggling tries
//! the insert and lets the unique constraint decide: a rejected insert means
//! the row already existed, so it is removed instead.

use crate::error::{Error, Result};
use crate::store::{ContentStore, EngagementKind, StoreError, UniqueKey};
use crate::viewer::Viewer;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleResult {
    pub kind: EngagementKind,
    /// Membership state after the toggle
    pub active: bool,
    /// Total memberships of this kind on the article
    pub count: u64,
}

impl ToggleResult {
    pub fn state(&self) -> &'static str {
        match (self.kind, self.active) {
            (EngagementKind::Like, true) => "liked",
            (EngagementKind::Like, false) => "unliked",
            (EngagementKind::Favorite, true) => "favorited",
            (EngagementKind::Favorite, false) => "unfavorited",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngagementSummary {
    pub likes: u64,
    pub favorites: u64,
    pub liked: bool,
    pub favorited: bool,
}

#[derive(Clone)]
pub struct EngagementService {
    store: Arc<dyn ContentStore>,
}

impl EngagementService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    async fn require_visible(&self, viewer: &Viewer, article_id: i32) -> Result<()> {
        self.store
            .find_article(article_id)
            .await?
            .filter(|a| viewer.can_read_article(a))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("article {}", article_id)))
    }

    pub async fn toggle(
        &self,
        viewer: &Viewer,
        kind: EngagementKind,
        article_id: i32,
    ) -> Result<ToggleResult> {
        let user_id = viewer.require_user()?;
        self.require_visible(viewer, article_id).await?;

        let active = match self.store.insert_engagement(kind, user_id, article_id).await {
            Ok(()) => true,
            Err(StoreError::Duplicate(UniqueKey::Membership)) => {
                self.store
                    .delete_engagement(kind, user_id, article_id)
                    .await?;
                false
            }
            Err(StoreError::NotFound) => {
                return Err(Error::not_found(format!("article {}", article_id)))
            }
            Err(e) => return Err(e.into()),
        };

        let count = self.store.count_engagements(kind, article_id).await?;
        let result = ToggleResult {
            kind,
            active,
            count,
        };
        log::debug!(
            "User {} {} article {} (count {})",
            user_id,
            result.state(),
            article_id,
            count
        );
        Ok(result)
    }

    pub async fn like(&self, viewer: &Viewer, article_id: i32) -> Result<ToggleResult> {
        self.toggle(viewer, EngagementKind::Like, article_id).await
    }

    pub async fn favorite(&self, viewer: &Viewer, article_id: i32) -> Result<ToggleResult> {
        self.toggle(viewer, EngagementKind::Favorite, article_id)
            .await
    }

    /// Counts for an article plus the viewer's own state.
    pub async fn summary(&self, viewer: &Viewer, article_id: i32) -> Result<EngagementSummary> {
        self.require_visible(viewer, article_id).await?;

        let mut summary = EngagementSummary {
            likes: self
                .store
                .count_engagements(EngagementKind::Like, article_id)
                .await?,
            favorites: self
                .store
                .count_engagements(EngagementKind::Favorite, article_id)
                .await?,
            ..Default::default()
        };
        if let Some(user_id) = viewer.get_id() {
            summary.liked = self
                .store
                .has_engagement(EngagementKind::Like, user_id, article_id)
                .await?;
            summary.favorited = self
                .store
                .has_engagement(EngagementKind::Favorite, user_id, article_id)
                .await?;
        }
        Ok(summary)
    }
}
