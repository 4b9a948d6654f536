//! Notification event definitions

use serde::{Deserialize, Serialize};

/// Outbound event describing a content change someone may want to hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentEvent {
    /// An article went from draft to published; tells its author
    ArticlePublished {
        article_id: i32,
        slug: String,
        title: String,
        author_id: i32,
    },
    /// A top-level comment landed on someone else's article
    CommentPosted {
        article_id: i32,
        comment_id: i32,
        commenter_id: i32,
        recipient_id: i32,
        is_approved: bool,
    },
    /// A reply landed under someone else's comment
    ReplyPosted {
        article_id: i32,
        comment_id: i32,
        parent_id: i32,
        replier_id: i32,
        recipient_id: i32,
        is_approved: bool,
    },
}

impl ContentEvent {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ArticlePublished { .. } => "article_published",
            Self::CommentPosted { .. } => "comment_posted",
            Self::ReplyPosted { .. } => "reply_posted",
        }
    }

    /// User the event is addressed to.
    pub fn recipient_id(&self) -> i32 {
        match self {
            Self::ArticlePublished { author_id, .. } => *author_id,
            Self::CommentPosted { recipient_id, .. } => *recipient_id,
            Self::ReplyPosted { recipient_id, .. } => *recipient_id,
        }
    }
}
