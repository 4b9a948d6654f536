//! Comment moderation
//!
//! A comment is `pending` (not approved) or `approved`. Whether a new comment
//! starts approved depends only on the sensitive word screen, whoever the
//! author is. Rejecting deletes; there is no rejected state.

pub mod tree;

use crate::app_config::CommentsConfig;
use crate::error::{Error, Result};
use crate::notifications::{self, dispatcher, Notifier};
use crate::orm::{articles, comments};
use crate::sensitive_words::{find_sensitive, SensitiveWordSource};
use crate::store::{CommentFilter, ContentStore};
use crate::viewer::Viewer;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

pub use tree::{build_tree, CommentNode};

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub article_id: i32,
    pub content: String,
    pub parent_id: Option<i32>,
}

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn ContentStore>,
    words: Arc<dyn SensitiveWordSource>,
    notifier: Arc<dyn Notifier>,
    config: CommentsConfig,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        words: Arc<dyn SensitiveWordSource>,
        notifier: Arc<dyn Notifier>,
        config: CommentsConfig,
    ) -> Self {
        Self {
            store,
            words,
            notifier,
            config,
        }
    }

    async fn visible_article(&self, viewer: &Viewer, id: i32) -> Result<articles::Model> {
        self.store
            .find_article(id)
            .await?
            .filter(|a| viewer.can_read_article(a))
            .ok_or_else(|| Error::not_found(format!("article {}", id)))
    }

    async fn load(&self, id: i32) -> Result<comments::Model> {
        self.store
            .find_comment(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("comment {}", id)))
    }

    fn check_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::validation("comment must not be empty"));
        }
        if content.chars().count() > self.config.max_length {
            return Err(Error::validation(format!(
                "comment exceeds {} characters",
                self.config.max_length
            )));
        }
        Ok(())
    }

    /// True when `content` passes the sensitive word screen.
    async fn screen(&self, content: &str) -> Result<bool> {
        let words = self.words.list_all_words().await?;
        match find_sensitive(content, &words) {
            Some(word) => {
                log::info!("Comment held for review, matched {:?}", word);
                Ok(false)
            }
            None => Ok(true),
        }
    }

    pub async fn create(&self, viewer: &Viewer, form: NewComment) -> Result<comments::Model> {
        let author_id = viewer.require_user()?;
        let article = self.visible_article(viewer, form.article_id).await?;
        self.check_content(&form.content)?;

        let parent = match form.parent_id {
            Some(parent_id) => {
                let parent = self.load(parent_id).await?;
                if parent.article_id != article.id {
                    return Err(Error::validation(
                        "reply parent belongs to a different article",
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let is_approved = self.screen(&form.content).await?;

        let now = Utc::now().naive_utc();
        let comment = self
            .store
            .insert_comment(comments::Model {
                id: 0,
                article_id: article.id,
                author_id,
                parent_id: parent.as_ref().map(|p| p.id),
                content: form.content,
                is_approved,
                created_at: now,
                updated_at: now,
            })
            .await?;

        log::info!(
            "Comment {} on article {} by user {} ({})",
            comment.id,
            article.id,
            author_id,
            if is_approved { "approved" } else { "pending" }
        );
        if let Some(event) = dispatcher::comment_created(&article, &comment, parent.as_ref()) {
            notifications::dispatch(self.notifier.as_ref(), event);
        }
        Ok(comment)
    }

    /// Staff: pending to approved. No re-screening.
    pub async fn approve(&self, viewer: &Viewer, id: i32) -> Result<comments::Model> {
        viewer.require_staff()?;
        let mut comment = self.load(id).await?;
        if comment.is_approved {
            return Ok(comment);
        }

        comment.is_approved = true;
        comment.updated_at = Utc::now().naive_utc();
        let comment = self.store.update_comment(comment).await?;
        log::info!("Comment {} approved by user {:?}", id, viewer.get_id());
        Ok(comment)
    }

    /// Staff: delete the comment and its replies. Returns rows removed.
    pub async fn reject(&self, viewer: &Viewer, id: i32) -> Result<u64> {
        viewer.require_staff()?;
        self.load(id).await?;
        let removed = self.store.delete_comment(id).await?;
        log::info!("Comment {} rejected, {} rows removed", id, removed);
        Ok(removed)
    }

    /// Author or staff: delete the comment and its replies. Returns rows removed.
    pub async fn delete(&self, viewer: &Viewer, id: i32) -> Result<u64> {
        let comment = self.load(id).await?;
        viewer.require_modify(&comment)?;
        let removed = self.store.delete_comment(id).await?;
        log::info!(
            "Comment {} deleted by user {:?}, {} rows removed",
            id,
            viewer.get_id(),
            removed
        );
        Ok(removed)
    }

    /// Author only. New content is screened again; a hit sends the comment
    /// back to pending.
    pub async fn edit(&self, viewer: &Viewer, id: i32, content: String) -> Result<comments::Model> {
        let mut comment = self.load(id).await?;
        viewer.require_ownership(&comment)?;
        self.check_content(&content)?;

        if !self.screen(&content).await? {
            comment.is_approved = false;
        }
        comment.content = content;
        comment.updated_at = Utc::now().naive_utc();

        let comment = self.store.update_comment(comment).await?;
        log::info!("Comment {} edited", id);
        Ok(comment)
    }

    /// Comment tree for an article as `viewer` sees it, newest first.
    ///
    /// Approved comments are shown to everyone, pending ones to their author
    /// and to staff.
    pub async fn list_for_article(
        &self,
        viewer: &Viewer,
        article_id: i32,
    ) -> Result<Vec<CommentNode>> {
        self.visible_article(viewer, article_id).await?;

        let rows = self
            .store
            .find_comments(&CommentFilter {
                article_id: Some(article_id),
                ..Default::default()
            })
            .await?;

        let visible = rows
            .into_iter()
            .filter(|c| c.is_approved || viewer.can_modify(c))
            .collect();
        Ok(build_tree(visible))
    }

    /// Staff moderation queue, newest first.
    pub async fn pending(&self, viewer: &Viewer) -> Result<Vec<comments::Model>> {
        viewer.require_staff()?;
        Ok(self
            .store
            .find_comments(&CommentFilter {
                is_approved: Some(false),
                ..Default::default()
            })
            .await?)
    }
}
