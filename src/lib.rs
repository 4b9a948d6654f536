//! Blog content engine: articles, tags, categories, moderated comments and
//! likes/favorites over a pluggable content store.

pub mod app_config;
pub mod articles;
pub mod blog;
pub mod categories;
pub mod comments;
pub mod constants;
pub mod db;
pub mod engagement;
pub mod error;
pub mod notifications;
pub mod orm;
pub mod pagination;
pub mod sensitive_words;
pub mod slug;
pub mod stats;
pub mod store;
pub mod tags;
pub mod viewer;

pub use blog::Blog;
pub use error::{Error, Result};
pub use viewer::Viewer;
