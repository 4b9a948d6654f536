//! Builds events from content changes
//!
//! Nobody is told about their own activity: commenting on your own article
//! or replying to your own comment produces no event.

use super::ContentEvent;
use crate::orm::{articles, comments};

pub fn article_published(article: &articles::Model) -> ContentEvent {
    ContentEvent::ArticlePublished {
        article_id: article.id,
        slug: article.slug.clone(),
        title: article.title.clone(),
        author_id: article.author_id,
    }
}

/// Event for a newly stored comment, addressed to the article author for a
/// top-level comment or to the parent's author for a reply.
pub fn comment_created(
    article: &articles::Model,
    comment: &comments::Model,
    parent: Option<&comments::Model>,
) -> Option<ContentEvent> {
    match parent {
        Some(parent) => {
            // Don't notify yourself
            if parent.author_id == comment.author_id {
                return None;
            }
            Some(ContentEvent::ReplyPosted {
                article_id: article.id,
                comment_id: comment.id,
                parent_id: parent.id,
                replier_id: comment.author_id,
                recipient_id: parent.author_id,
                is_approved: comment.is_approved,
            })
        }
        None => {
            if article.author_id == comment.author_id {
                return None;
            }
            Some(ContentEvent::CommentPosted {
                article_id: article.id,
                comment_id: comment.id,
                commenter_id: comment.author_id,
                recipient_id: article.author_id,
                is_approved: comment.is_approved,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::articles::{ArticleStatus, Visibility};
    use chrono::Utc;

    fn article(author_id: i32) -> articles::Model {
        let now = Utc::now().naive_utc();
        articles::Model {
            id: 10,
            title: "T".to_string(),
            slug: "t".to_string(),
            content: String::new(),
            author_id,
            category_id: None,
            status: ArticleStatus::Published,
            visibility: Visibility::Public,
            view_count: 0,
            created_at: now,
            updated_at: now,
            published_at: Some(now),
        }
    }

    fn comment(id: i32, author_id: i32, parent_id: Option<i32>) -> comments::Model {
        let now = Utc::now().naive_utc();
        comments::Model {
            id,
            article_id: 10,
            author_id,
            parent_id,
            content: "c".to_string(),
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_comment_on_own_article_is_silent() {
        assert!(comment_created(&article(1), &comment(2, 1, None), None).is_none());
    }

    #[test]
    fn test_comment_notifies_article_author() {
        let event = comment_created(&article(1), &comment(2, 3, None), None).unwrap();
        assert_eq!(event.as_str(), "comment_posted");
        assert_eq!(event.recipient_id(), 1);
    }

    #[test]
    fn test_reply_notifies_parent_author_only() {
        let parent = comment(2, 3, None);
        let reply = comment(4, 5, Some(2));
        let event = comment_created(&article(1), &reply, Some(&parent)).unwrap();
        assert_eq!(event.as_str(), "reply_posted");
        assert_eq!(event.recipient_id(), 3);

        let self_reply = comment(6, 3, Some(2));
        assert!(comment_created(&article(1), &self_reply, Some(&parent)).is_none());
    }
}
