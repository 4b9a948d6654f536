//! Shared test data

use blogos::articles::NewArticle;
use blogos::categories::NewCategory;
use blogos::orm::articles::{self, ArticleStatus, Visibility};
use blogos::orm::categories;
use blogos::{Blog, Viewer};

pub const ALICE: i32 = 1;
pub const BOB: i32 = 2;
pub const CAROL: i32 = 3;
pub const ADMIN: i32 = 100;

pub fn alice() -> Viewer {
    Viewer::user(ALICE)
}

pub fn bob() -> Viewer {
    Viewer::user(BOB)
}

pub fn carol() -> Viewer {
    Viewer::user(CAROL)
}

pub fn admin() -> Viewer {
    Viewer::staff(ADMIN)
}

pub fn article_form(title: &str, status: ArticleStatus) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        content: format!("Content of {}", title),
        status,
        ..Default::default()
    }
}

/// Create a published public article.
pub async fn create_published(blog: &Blog, author: &Viewer, title: &str) -> articles::Model {
    blog.articles()
        .create(author, article_form(title, ArticleStatus::Published))
        .await
        .expect("Failed to create article")
}

pub async fn create_draft(blog: &Blog, author: &Viewer, title: &str) -> articles::Model {
    blog.articles()
        .create(author, article_form(title, ArticleStatus::Draft))
        .await
        .expect("Failed to create article")
}

pub async fn create_private(blog: &Blog, author: &Viewer, title: &str) -> articles::Model {
    let form = NewArticle {
        visibility: Visibility::Private,
        ..article_form(title, ArticleStatus::Published)
    };
    blog.articles()
        .create(author, form)
        .await
        .expect("Failed to create article")
}

/// Create a published article in a category with tags.
pub async fn create_filed(
    blog: &Blog,
    author: &Viewer,
    title: &str,
    category_id: Option<i32>,
    tags: &str,
) -> articles::Model {
    let form = NewArticle {
        category_id,
        tags: tags.into(),
        ..article_form(title, ArticleStatus::Published)
    };
    blog.articles()
        .create(author, form)
        .await
        .expect("Failed to create article")
}

pub async fn create_category(blog: &Blog, name: &str) -> categories::Model {
    blog.categories()
        .create(
            &admin(),
            NewCategory {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to create category")
}

pub async fn add_words(blog: &Blog, words: &[&str]) {
    for word in words {
        blog.add_sensitive_word(&admin(), word)
            .await
            .expect("Failed to add sensitive word");
    }
}
