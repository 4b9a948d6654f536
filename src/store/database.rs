//! sea-orm backed content store.

use super::{
    ArticleFilter, ArticleOrder, CommentFilter, ContentStore, EngagementKind, StoreError,
    UniqueKey, VisibilityScope,
};
use crate::orm::{
    article_tags, articles, categories, comments, favorites, likes, sensitive_words, tags,
};
use crate::sensitive_words::SensitiveWordSource;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveValue::NotSet, Condition, ConnectionTrait, DatabaseConnection, QueryOrder, QuerySelect,
    Select, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

/// [`ContentStore`] over a sea-orm connection.
#[derive(Clone)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// `view_count` is only written on insert; updates leave it to
/// `increment_views`.
fn article_active_model(article: articles::Model, with_id: bool) -> articles::ActiveModel {
    articles::ActiveModel {
        id: if with_id { Set(article.id) } else { NotSet },
        title: Set(article.title),
        slug: Set(article.slug),
        content: Set(article.content),
        author_id: Set(article.author_id),
        category_id: Set(article.category_id),
        status: Set(article.status),
        visibility: Set(article.visibility),
        view_count: if with_id { NotSet } else { Set(article.view_count) },
        created_at: Set(article.created_at),
        updated_at: Set(article.updated_at),
        published_at: Set(article.published_at),
    }
}

/// Make `tag_ids` the complete set of links for `article_id`.
async fn replace_article_tags<C: ConnectionTrait>(
    conn: &C,
    article_id: i32,
    tag_ids: &[i32],
) -> Result<(), StoreError> {
    let wanted: HashSet<i32> = tag_ids.iter().copied().collect();
    if !wanted.is_empty() {
        let known = tags::Entity::find()
            .filter(tags::Column::Id.is_in(wanted.iter().copied().collect::<Vec<_>>()))
            .count(conn)
            .await?;
        if known != wanted.len() {
            return Err(StoreError::NotFound);
        }
    }

    article_tags::Entity::delete_many()
        .filter(article_tags::Column::ArticleId.eq(article_id))
        .exec(conn)
        .await?;

    let mut seen = HashSet::new();
    for tag_id in tag_ids {
        if !seen.insert(*tag_id) {
            continue;
        }
        article_tags::ActiveModel {
            article_id: Set(article_id),
            tag_id: Set(*tag_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

fn scope_condition(scope: VisibilityScope) -> Condition {
    let public = Condition::all()
        .add(articles::Column::Status.eq(articles::ArticleStatus::Published))
        .add(articles::Column::Visibility.eq(articles::Visibility::Public));

    match scope {
        VisibilityScope::Everything => Condition::all(),
        VisibilityScope::PublishedPublic => public,
        VisibilityScope::PublishedPublicOrAuthor(user_id) => Condition::any()
            .add(public)
            .add(articles::Column::AuthorId.eq(user_id)),
    }
}

fn article_select(filter: &ArticleFilter) -> Select<articles::Entity> {
    let mut cond = Condition::all().add(scope_condition(filter.scope));

    if let Some(status) = filter.status {
        cond = cond.add(articles::Column::Status.eq(status));
    }
    if let Some(visibility) = filter.visibility {
        cond = cond.add(articles::Column::Visibility.eq(visibility));
    }
    if let Some(author_id) = filter.author_id {
        cond = cond.add(articles::Column::AuthorId.eq(author_id));
    }
    if let Some(category_id) = filter.category_id {
        cond = cond.add(articles::Column::CategoryId.eq(category_id));
    }
    if let Some(id) = filter.exclude_id {
        cond = cond.add(articles::Column::Id.ne(id));
    }
    if !filter.any_tag_ids.is_empty() {
        cond = cond.add(
            articles::Column::Id.in_subquery(
                Query::select()
                    .column(article_tags::Column::ArticleId)
                    .from(article_tags::Entity)
                    .and_where(article_tags::Column::TagId.is_in(filter.any_tag_ids.clone()))
                    .to_owned(),
            ),
        );
    }

    articles::Entity::find().filter(cond)
}

fn comment_condition(filter: &CommentFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(article_id) = filter.article_id {
        cond = cond.add(comments::Column::ArticleId.eq(article_id));
    }
    if let Some(author_id) = filter.author_id {
        cond = cond.add(comments::Column::AuthorId.eq(author_id));
    }
    if let Some(is_approved) = filter.is_approved {
        cond = cond.add(comments::Column::IsApproved.eq(is_approved));
    }
    cond
}

/// Ids of `root` and every comment below it.
fn comment_subtree(rows: &[comments::Model], root: i32) -> Vec<i32> {
    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
    for row in rows {
        if let Some(parent_id) = row.parent_id {
            children.entry(parent_id).or_default().push(row.id);
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

#[async_trait]
impl ContentStore for DatabaseStore {
    async fn insert_article(
        &self,
        article: articles::Model,
    ) -> Result<articles::Model, StoreError> {
        Ok(article_active_model(article, false).insert(&self.db).await?)
    }

    async fn update_article(
        &self,
        article: articles::Model,
    ) -> Result<articles::Model, StoreError> {
        Ok(article_active_model(article, true).update(&self.db).await?)
    }

    async fn update_article_with_tags(
        &self,
        article: articles::Model,
        tag_ids: &[i32],
    ) -> Result<articles::Model, StoreError> {
        let txn = self.db.begin().await?;
        let updated = article_active_model(article, true).update(&txn).await?;
        replace_article_tags(&txn, updated.id, tag_ids).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn find_article(&self, id: i32) -> Result<Option<articles::Model>, StoreError> {
        Ok(articles::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_article_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<articles::Model>, StoreError> {
        Ok(articles::Entity::find()
            .filter(articles::Column::Slug.eq(slug))
            .one(&self.db)
            .await?)
    }

    async fn find_articles(
        &self,
        filter: &ArticleFilter,
    ) -> Result<Vec<articles::Model>, StoreError> {
        let mut select = article_select(filter);
        select = match filter.order {
            ArticleOrder::CreatedDesc => select.order_by_desc(articles::Column::CreatedAt),
            ArticleOrder::PublishedDesc => select.order_by_desc(articles::Column::PublishedAt),
        };
        select = select.order_by_desc(articles::Column::Id);

        if filter.offset > 0 {
            select = select.offset(filter.offset);
        }
        if let Some(limit) = filter.limit {
            select = select.limit(limit);
        }

        Ok(select.all(&self.db).await?)
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64, StoreError> {
        Ok(article_select(filter).count(&self.db).await? as u64)
    }

    async fn delete_article(&self, id: i32) -> Result<bool, StoreError> {
        let txn = self.db.begin().await?;

        comments::Entity::delete_many()
            .filter(comments::Column::ArticleId.eq(id))
            .exec(&txn)
            .await?;
        likes::Entity::delete_many()
            .filter(likes::Column::ArticleId.eq(id))
            .exec(&txn)
            .await?;
        favorites::Entity::delete_many()
            .filter(favorites::Column::ArticleId.eq(id))
            .exec(&txn)
            .await?;
        article_tags::Entity::delete_many()
            .filter(article_tags::Column::ArticleId.eq(id))
            .exec(&txn)
            .await?;
        let res = articles::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    async fn increment_views(&self, id: i32) -> Result<i32, StoreError> {
        let res = articles::Entity::update_many()
            .col_expr(articles::Column::ViewCount, Expr::cust("view_count + 1"))
            .filter(articles::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }

        let article = articles::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(article.view_count)
    }

    async fn insert_category(
        &self,
        category: categories::Model,
    ) -> Result<categories::Model, StoreError> {
        let model = categories::ActiveModel {
            name: Set(category.name),
            slug: Set(category.slug),
            description: Set(category.description),
            created_at: Set(category.created_at),
            updated_at: Set(category.updated_at),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn find_category(&self, id: i32) -> Result<Option<categories::Model>, StoreError> {
        Ok(categories::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<categories::Model>, StoreError> {
        Ok(categories::Entity::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(&self.db)
            .await?)
    }

    async fn list_categories(&self) -> Result<Vec<categories::Model>, StoreError> {
        Ok(categories::Entity::find()
            .order_by_desc(categories::Column::CreatedAt)
            .order_by_desc(categories::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn delete_category(&self, id: i32) -> Result<bool, StoreError> {
        let txn = self.db.begin().await?;

        articles::Entity::update_many()
            .col_expr(articles::Column::CategoryId, Expr::value(Option::<i32>::None))
            .filter(articles::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        let res = categories::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    async fn insert_tag(&self, tag: tags::Model) -> Result<tags::Model, StoreError> {
        let model = tags::ActiveModel {
            name: Set(tag.name),
            slug: Set(tag.slug),
            created_at: Set(tag.created_at),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<tags::Model>, StoreError> {
        Ok(tags::Entity::find()
            .filter(tags::Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<tags::Model>, StoreError> {
        Ok(tags::Entity::find()
            .filter(tags::Column::Slug.eq(slug))
            .one(&self.db)
            .await?)
    }

    async fn list_tags(&self) -> Result<Vec<tags::Model>, StoreError> {
        Ok(tags::Entity::find()
            .order_by_desc(tags::Column::CreatedAt)
            .order_by_desc(tags::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn article_tags(&self, article_id: i32) -> Result<Vec<tags::Model>, StoreError> {
        let tag_ids: Vec<i32> = article_tags::Entity::find()
            .filter(article_tags::Column::ArticleId.eq(article_id))
            .order_by_asc(article_tags::Column::TagId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| link.tag_id)
            .collect();

        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(tags::Entity::find()
            .filter(tags::Column::Id.is_in(tag_ids))
            .order_by_asc(tags::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn set_article_tags(&self, article_id: i32, tag_ids: &[i32]) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        if articles::Entity::find_by_id(article_id).one(&txn).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        replace_article_tags(&txn, article_id, tag_ids).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete_unused_tags(&self, tag_ids: &[i32]) -> Result<u64, StoreError> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        let linked = Query::select()
            .column(article_tags::Column::TagId)
            .from(article_tags::Entity)
            .to_owned();
        let res = tags::Entity::delete_many()
            .filter(tags::Column::Id.is_in(tag_ids.to_vec()))
            .filter(tags::Column::Id.not_in_subquery(linked))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn insert_comment(
        &self,
        comment: comments::Model,
    ) -> Result<comments::Model, StoreError> {
        if articles::Entity::find_by_id(comment.article_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(StoreError::NotFound);
        }
        if let Some(parent_id) = comment.parent_id {
            if comments::Entity::find_by_id(parent_id)
                .one(&self.db)
                .await?
                .is_none()
            {
                return Err(StoreError::NotFound);
            }
        }

        let model = comments::ActiveModel {
            article_id: Set(comment.article_id),
            author_id: Set(comment.author_id),
            parent_id: Set(comment.parent_id),
            content: Set(comment.content),
            is_approved: Set(comment.is_approved),
            created_at: Set(comment.created_at),
            updated_at: Set(comment.updated_at),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn update_comment(
        &self,
        comment: comments::Model,
    ) -> Result<comments::Model, StoreError> {
        let model = comments::ActiveModel {
            id: Set(comment.id),
            article_id: Set(comment.article_id),
            author_id: Set(comment.author_id),
            parent_id: Set(comment.parent_id),
            content: Set(comment.content),
            is_approved: Set(comment.is_approved),
            created_at: Set(comment.created_at),
            updated_at: Set(comment.updated_at),
        };
        Ok(model.update(&self.db).await?)
    }

    async fn find_comment(&self, id: i32) -> Result<Option<comments::Model>, StoreError> {
        Ok(comments::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_comments(
        &self,
        filter: &CommentFilter,
    ) -> Result<Vec<comments::Model>, StoreError> {
        Ok(comments::Entity::find()
            .filter(comment_condition(filter))
            .order_by_desc(comments::Column::CreatedAt)
            .order_by_desc(comments::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64, StoreError> {
        Ok(comments::Entity::find()
            .filter(comment_condition(filter))
            .count(&self.db)
            .await? as u64)
    }

    async fn delete_comment(&self, id: i32) -> Result<u64, StoreError> {
        let txn = self.db.begin().await?;

        let root = match comments::Entity::find_by_id(id).one(&txn).await? {
            Some(root) => root,
            None => return Ok(0),
        };
        let siblings = comments::Entity::find()
            .filter(comments::Column::ArticleId.eq(root.article_id))
            .all(&txn)
            .await?;
        let doomed = comment_subtree(&siblings, root.id);

        let res = comments::Entity::delete_many()
            .filter(comments::Column::Id.is_in(doomed))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(res.rows_affected)
    }

    async fn insert_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<(), StoreError> {
        if articles::Entity::find_by_id(article_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(StoreError::NotFound);
        }

        let now = Utc::now().naive_utc();
        match kind {
            EngagementKind::Like => {
                likes::ActiveModel {
                    user_id: Set(user_id),
                    article_id: Set(article_id),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?;
            }
            EngagementKind::Favorite => {
                favorites::ActiveModel {
                    user_id: Set(user_id),
                    article_id: Set(article_id),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?;
            }
        }
        Ok(())
    }

    async fn delete_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<bool, StoreError> {
        let res = match kind {
            EngagementKind::Like => {
                likes::Entity::delete_many()
                    .filter(likes::Column::UserId.eq(user_id))
                    .filter(likes::Column::ArticleId.eq(article_id))
                    .exec(&self.db)
                    .await?
            }
            EngagementKind::Favorite => {
                favorites::Entity::delete_many()
                    .filter(favorites::Column::UserId.eq(user_id))
                    .filter(favorites::Column::ArticleId.eq(article_id))
                    .exec(&self.db)
                    .await?
            }
        };
        Ok(res.rows_affected > 0)
    }

    async fn has_engagement(
        &self,
        kind: EngagementKind,
        user_id: i32,
        article_id: i32,
    ) -> Result<bool, StoreError> {
        let count = match kind {
            EngagementKind::Like => {
                likes::Entity::find()
                    .filter(likes::Column::UserId.eq(user_id))
                    .filter(likes::Column::ArticleId.eq(article_id))
                    .count(&self.db)
                    .await?
            }
            EngagementKind::Favorite => {
                favorites::Entity::find()
                    .filter(favorites::Column::UserId.eq(user_id))
                    .filter(favorites::Column::ArticleId.eq(article_id))
                    .count(&self.db)
                    .await?
            }
        };
        Ok(count > 0)
    }

    async fn count_engagements(
        &self,
        kind: EngagementKind,
        article_id: i32,
    ) -> Result<u64, StoreError> {
        let count = match kind {
            EngagementKind::Like => {
                likes::Entity::find()
                    .filter(likes::Column::ArticleId.eq(article_id))
                    .count(&self.db)
                    .await?
            }
            EngagementKind::Favorite => {
                favorites::Entity::find()
                    .filter(favorites::Column::ArticleId.eq(article_id))
                    .count(&self.db)
                    .await?
            }
        };
        Ok(count as u64)
    }

    async fn insert_sensitive_word(&self, word: &str) -> Result<(), StoreError> {
        let res = sensitive_words::ActiveModel {
            word: Set(word.to_string()),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) => match StoreError::from(e) {
                StoreError::Duplicate(_) => Err(StoreError::Duplicate(UniqueKey::Other)),
                other => Err(other),
            },
        }
    }

    async fn list_sensitive_words(&self) -> Result<Vec<String>, StoreError> {
        Ok(sensitive_words::Entity::find()
            .order_by_desc(sensitive_words::Column::CreatedAt)
            .order_by_desc(sensitive_words::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.word)
            .collect())
    }
}

#[async_trait]
impl SensitiveWordSource for DatabaseStore {
    async fn list_all_words(&self) -> Result<Vec<String>, StoreError> {
        self.list_sensitive_words().await
    }
}
