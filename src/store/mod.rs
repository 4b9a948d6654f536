//! Content store abstraction.
//!
//! Every read and write the engine performs goes through [`ContentStore`].
//! Supports multiple backends:
//! - `memory`: a process-local store, used by tests and single-process tools
//! - `database`: sea-orm backed store (PostgreSQL, MySQL, SQLite)
//!
//! Each method is a single atomic unit at the store level. Uniqueness
//! (slugs, tag names, per-user engagement rows) is enforced here and
//! reported as [`StoreError::Duplicate`], never checked-then-acted by the
//! caller.

pub mod database;
pub mod memory;

use crate::orm::articles::{ArticleStatus, Visibility};
use crate::orm::{articles, categories, comments, tags};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use database::DatabaseStore;
pub use memory::MemoryStore;

/// Which unique constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Slug,
    Name,
    Membership,
    Other,
}

/// Store operation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A unique constraint rejected the write
    Duplicate(UniqueKey),
    /// The row being updated does not exist
    NotFound,
    /// Lock contention or a busy backend; safe to retry
    Transient(String),
    /// Any other backend failure
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    pub fn is_duplicate(&self, key: UniqueKey) -> bool {
        matches!(self, StoreError::Duplicate(k) if *k == key)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Duplicate(key) => write!(f, "Duplicate value for unique {:?}", key),
            StoreError::NotFound => write!(f, "Record not found"),
            StoreError::Transient(msg) => write!(f, "Transient store failure: {}", msg),
            StoreError::Backend(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        match e {
            sea_orm::DbErr::RecordNotFound(_) => StoreError::NotFound,
            other => classify_db_message(&other.to_string()),
        }
    }
}

/// Map a backend error message onto the store taxonomy.
///
/// PostgreSQL reports the violated index name, SQLite and MySQL report the
/// column list; index names in `db::create_schema` are chosen so both
/// spellings classify the same way. Only the key part of the message is
/// inspected, never the offending value.
fn classify_db_message(message: &str) -> StoreError {
    let lower = message.to_lowercase();
    let is_unique = lower.contains("unique constraint")
        || lower.contains("duplicate key")
        || lower.contains("duplicate entry");

    if is_unique {
        let key_part = violated_key(&lower);
        let key = if key_part.contains("slug") {
            UniqueKey::Slug
        } else if key_part.contains("user_id") || key_part.contains("user_article") {
            UniqueKey::Membership
        } else if key_part.contains("name") {
            UniqueKey::Name
        } else {
            UniqueKey::Other
        };
        return StoreError::Duplicate(key);
    }

    if lower.contains("database is locked")
        || lower.contains("deadlock")
        || lower.contains("could not serialize")
        || lower.contains("lock wait timeout")
    {
        return StoreError::Transient(message.to_string());
    }

    StoreError::Backend(message.to_string())
}

/// The index or column list named by a unique violation message.
fn violated_key(lower: &str) -> &str {
    let tail = match lower.rfind("for key") {
        Some(at) => &lower[at..],
        None => match lower.find("unique constraint") {
            Some(at) => &lower[at..],
            None => lower,
        },
    };
    tail.lines().next().unwrap_or(tail)
}

/// Like or Favorite membership table selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    Like,
    Favorite,
}

impl EngagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Favorite => "favorite",
        }
    }
}

/// Which articles a query may return, before any other predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityScope {
    /// No restriction (staff)
    Everything,
    /// status = published AND visibility = public
    #[default]
    PublishedPublic,
    /// Published and public, or authored by the given user
    PublishedPublicOrAuthor(i32),
}

impl VisibilityScope {
    pub fn admits(&self, article: &articles::Model) -> bool {
        match self {
            VisibilityScope::Everything => true,
            VisibilityScope::PublishedPublic => article.is_publicly_visible(),
            VisibilityScope::PublishedPublicOrAuthor(user_id) => {
                article.is_publicly_visible() || article.author_id == *user_id
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleOrder {
    /// Newest created first
    #[default]
    CreatedDesc,
    /// Most recently published first
    PublishedDesc,
}

/// Predicates for article lookups. All set predicates must hold.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub scope: VisibilityScope,
    pub status: Option<ArticleStatus>,
    pub visibility: Option<Visibility>,
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
    /// Matches articles carrying at least one of these tags
    pub any_tag_ids: Vec<i32>,
    pub exclude_id: Option<i32>,
    pub order: ArticleOrder,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl ArticleFilter {
    pub fn new(scope: VisibilityScope) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }

    /// Row-level predicate, excluding tags, ordering and paging.
    pub fn matches_row(&self, article: &articles::Model) -> bool {
        self.scope.admits(article)
            && self.status.map_or(true, |s| article.status == s)
            && self.visibility.map_or(true, |v| article.visibility == v)
            && self.author_id.map_or(true, |a| article.author_id == a)
            && self
                .category_id
                .map_or(true, |c| article.category_id == Some(c))
            && self.exclude_id.map_or(true, |id| article.id != id)
    }
}

/// Predicates for comment lookups. Results are always newest-first.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub article_id: Option<i32>,
    pub author_id: Option<i32>,
    pub is_approved: Option<bool>,
}

impl CommentFilter {
    pub fn matches(&self, comment: &comments::Model) -> bool {
        self.article_id.map_or(true, |a| comment.article_id == a)
            && self.author_id.map_or(true, |a| comment.author_id == a)
            && self.is_approved.map_or(true, |a| comment.is_approved == a)
    }
}

/// Trait for content store backends.
///
/// Insert methods ignore the `id` of the model they are given and return
/// the stored row with its assigned id.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert_article(&self, article: articles::Model)
        -> Result<articles::Model, StoreError>;

    /// Overwrite the columns of an existing article, returning the stored
    /// row. `view_count` is never written here; only `increment_views`
    /// changes it.
    async fn update_article(&self, article: articles::Model)
        -> Result<articles::Model, StoreError>;

    /// `update_article` and `set_article_tags` as one unit: either both
    /// land or neither does.
    async fn update_article_with_tags(
        &self,
        article: articles::Model,
        tag_ids: &[i32],
    ) -> Result<articles::Model, StoreError>;

    async fn find_article(&self, id: i32) -> Result<Option<articles::Model>, StoreError>;

    async fn find_article_by_slug(&self, slug: &str)
        -> Result<Option<articles::Model>, StoreError>;

    async fn find_articles(&self, filter: &ArticleFilter)
        -> Result<Vec<articles::Model>, StoreError>;

    /// Count rows matching `filter`, ignoring its offset and limit.
    async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64, StoreError>;

    /// Delete an article with its comments, likes, favorites and tag links.
    async fn delete_article(&self, id: i32) -> Result<bool, StoreError>;

    /// Atomically add one to `view_count`, returning the new value.
    async fn increment_views(&self, id: i32) -> Result<i32, StoreError>;

    async fn insert_category(
        &self,
        category: categories::Model,
    ) -> Result<categories::Model, StoreError>;

    async fn find_category(&self, id: i32) -> Result<Option<categories::Model>, StoreError>;

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<categories::Model>, StoreError>;

    async fn list_categories(&self) -> Result<Vec<categories::Model>, StoreError>;

    /// Delete a category; articles in it keep existing with no category.
    async fn delete_category(&self, id: i32) -> Result<bool, StoreError>;

    async fn insert_tag(&self, tag: tags::Model) -> Result<tags::Model, StoreError>;

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<tags::Model>, StoreError>;

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<tags::Model>, StoreError>;

    async fn list_tags(&self) -> Result<Vec<tags::Model>, StoreError>;

    async fn article_tags(&self, article_id: i32) -> Result<Vec<tags::Model>, StoreError>;

    /// Replace an article's tag links with exactly `tag_ids`, atomically.
    async fn set_article_tags(&self, article_id: i32, tag_ids: &[i32]) -> Result<(), StoreError>;

    /// Delete those of `tag_ids` no article links to, returning rows removed.
    async fn delete_unused_tags(&self, tag_ids: &[i32]) -> Result<u64, StoreError>;

    async fn insert_comment(&self, comment: comments::Model)
        -> Result<comments::Model, StoreError>;

    async fn update_comment(&self, comment: comments::Model)
        -> Result<comments::Model, StoreError>;

    async fn find_comment(&self, id: i32) -> Result<Option<comments::Model>, StoreError>;

    /// Matching comments, newest first.
    async fn find_comments(&self, filter: &CommentFilter)
        -> Result<Vec<comments::Model>, StoreError>;

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64, StoreError>;

    /// Delete a comment and all of its descendants, returning rows removed.
    async fn delete_comment(&self, id: i32) -> Result<u64, StoreError>;

    /// Uniqueness-constrained insert of a membership row.
    ///
    /// Fails with `Duplicate(UniqueKey::Membership)` when the row exists.
    async fn insert_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<(), StoreError>;

    async fn delete_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<bool, StoreError>;

    async fn has_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<bool, StoreError>;

    async fn count_engagements(
        &self,
        kind: EngagementKind,
        article_id: i32,
    ) -> Result<u64, StoreError>;

    /// Store a sensitive word; duplicates fail with `Duplicate(Other)`.
    async fn insert_sensitive_word(&self, word: &str) -> Result<(), StoreError>;

    async fn list_sensitive_words(&self) -> Result<Vec<String>, StoreError>;
}
