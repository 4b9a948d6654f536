//! Database connection and schema bootstrap.

use crate::orm::{
    article_tags, articles, categories, comments, favorites, likes, sensitive_words, tags,
};
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbErr, EntityName, EntityTrait, Schema,
};

pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    log::info!("Connecting to database");
    Database::connect(url).await
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let table = entity.table_name().to_string();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    log::debug!("Ensured table {}", table);
    Ok(())
}

async fn create_index(db: &DatabaseConnection, stmt: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    match db.execute(backend.build(&stmt)).await {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains("already exists") => Ok(()),
        Err(e) => Err(e),
    }
}

/// Create every table and composite unique index that is missing.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    // Parents before children
    create_table(db, &schema, categories::Entity).await?;
    create_table(db, &schema, articles::Entity).await?;
    create_table(db, &schema, tags::Entity).await?;
    create_table(db, &schema, article_tags::Entity).await?;
    create_table(db, &schema, comments::Entity).await?;
    create_table(db, &schema, likes::Entity).await?;
    create_table(db, &schema, favorites::Entity).await?;
    create_table(db, &schema, sensitive_words::Entity).await?;

    // Index names must keep "user_article" so duplicate rows classify as
    // membership conflicts on every backend.
    create_index(
        db,
        Index::create()
            .name("idx_likes_user_article")
            .table(likes::Entity)
            .col(likes::Column::UserId)
            .col(likes::Column::ArticleId)
            .unique()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_favorites_user_article")
            .table(favorites::Entity)
            .col(favorites::Column::UserId)
            .col(favorites::Column::ArticleId)
            .unique()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_article_tags_article_tag")
            .table(article_tags::Entity)
            .col(article_tags::Column::ArticleId)
            .col(article_tags::Column::TagId)
            .unique()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_comments_article")
            .table(comments::Entity)
            .col(comments::Column::ArticleId)
            .to_owned(),
    )
    .await?;

    log::info!("Database schema ready");
    Ok(())
}
