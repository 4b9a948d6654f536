//! SeaORM entities for every persisted table.

pub mod article_tags;
pub mod articles;
pub mod categories;
pub mod comments;
pub mod favorites;
pub mod likes;
pub mod sensitive_words;
pub mod tags;
