mod common;

use blogos::articles::ArticleChanges;
use blogos::tags::{TagInput, TagName};
use blogos::store::ContentStore;
use blogos::Error;
use blogos::app_config::AppConfig;
use common::database::{setup_memory_blog, setup_memory_blog_with};
use common::fixtures::*;

fn names(tags: &[blogos::orm::tags::Model]) -> Vec<String> {
    let mut names: Vec<String> = tags.iter().map(|t| t.name.clone()).collect();
    names.sort();
    names
}

#[actix_rt::test]
async fn test_duplicate_names_collapse() {
    let t = setup_memory_blog();
    let article = create_filed(&t.blog, &alice(), "Web", None, "python, python, Django").await;

    let tags = t.blog.tags().article_tags(article.id).await.unwrap();
    assert_eq!(names(&tags), vec!["Django", "python"]);
    assert_eq!(t.store.list_tags().await.unwrap().len(), 2);
}

#[actix_rt::test]
async fn test_existing_tags_are_reused() {
    let t = setup_memory_blog();
    let first = create_filed(&t.blog, &alice(), "One", None, "rust").await;
    let second = create_filed(&t.blog, &bob(), "Two", None, "rust，async").await;

    let tags = t.store.list_tags().await.unwrap();
    assert_eq!(tags.len(), 2);

    let first_tags = t.blog.tags().article_tags(first.id).await.unwrap();
    let second_tags = t.blog.tags().article_tags(second.id).await.unwrap();
    let shared = second_tags.iter().find(|t| t.name == "rust").unwrap();
    assert_eq!(first_tags[0].id, shared.id);
}

#[actix_rt::test]
async fn test_names_are_case_sensitive() {
    let t = setup_memory_blog();
    create_filed(&t.blog, &alice(), "Case", None, "Rust, rust").await;

    let tags = t.store.list_tags().await.unwrap();
    assert_eq!(tags.len(), 2);
    let mut slugs: Vec<String> = tags.into_iter().map(|t| t.slug).collect();
    slugs.sort();
    assert_eq!(slugs, vec!["rust", "rust-1"]);
}

#[actix_rt::test]
async fn test_symbol_names_get_distinct_slugs() {
    let t = setup_memory_blog();
    create_filed(&t.blog, &alice(), "Langs", None, "C++, C#").await;

    let cpp = t.store.find_tag_by_name("C++").await.unwrap().unwrap();
    let cs = t.store.find_tag_by_name("C#").await.unwrap().unwrap();
    assert_ne!(cpp.slug, cs.slug);
    assert!(t.blog.tags().by_slug(&cpp.slug).await.is_ok());
}

#[actix_rt::test]
async fn test_structured_input() {
    let t = setup_memory_blog();
    let form = blogos::articles::NewArticle {
        tags: TagInput::Names(vec![
            TagName {
                name: " serde ".to_string(),
            },
            TagName {
                name: "".to_string(),
            },
            TagName {
                name: "serde".to_string(),
            },
        ]),
        ..article_form("Structured", blogos::orm::articles::ArticleStatus::Published)
    };
    let article = t.blog.articles().create(&alice(), form).await.unwrap();

    let tags = t.blog.tags().article_tags(article.id).await.unwrap();
    assert_eq!(names(&tags), vec!["serde"]);
}

#[actix_rt::test]
async fn test_update_replaces_tag_set() {
    let t = setup_memory_blog();
    let article = create_filed(&t.blog, &alice(), "Retag", None, "a, b").await;

    t.blog
        .articles()
        .update(
            &alice(),
            article.id,
            ArticleChanges {
                tags: Some("b, c".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let tags = t.blog.tags().article_tags(article.id).await.unwrap();
    assert_eq!(names(&tags), vec!["b", "c"]);

    t.blog
        .articles()
        .update(
            &alice(),
            article.id,
            ArticleChanges {
                tags: Some("".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(t.blog.tags().article_tags(article.id).await.unwrap().is_empty());

    // Tag rows themselves survive
    assert_eq!(t.store.list_tags().await.unwrap().len(), 3);
}

#[actix_rt::test]
async fn test_update_without_tags_keeps_them() {
    let t = setup_memory_blog();
    let article = create_filed(&t.blog, &alice(), "Keep", None, "x").await;

    t.blog
        .articles()
        .update(
            &alice(),
            article.id,
            ArticleChanges {
                content: Some("new body".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(t.blog.tags().article_tags(article.id).await.unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_slug_conflict_on_create_leaves_no_new_tags() {
    let mut config = AppConfig::default();
    config.slug.max_attempts = 1;
    let t = setup_memory_blog_with(config);
    create_filed(&t.blog, &alice(), "Taken", None, "rust").await;
    create_published(&t.blog, &alice(), "Taken").await;

    let form = blogos::articles::NewArticle {
        tags: "rust, fresh".into(),
        ..article_form("Taken", blogos::orm::articles::ArticleStatus::Published)
    };
    let err = t.blog.articles().create(&bob(), form).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    assert!(t.store.find_tag_by_name("fresh").await.unwrap().is_none());
    assert!(t.store.find_tag_by_name("rust").await.unwrap().is_some());
}

#[actix_rt::test]
async fn test_failed_update_keeps_article_and_tags() {
    let t = setup_memory_blog();
    let article = create_filed(&t.blog, &alice(), "Steady", None, "a, b").await;
    create_filed(&t.blog, &bob(), "Other", None, "c").await;

    t.store.inject_transient_failures(1);
    let err = t
        .blog
        .articles()
        .update(
            &alice(),
            article.id,
            ArticleChanges {
                title: Some("Shaky".to_string()),
                tags: Some("c".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(ref e) if e.is_transient()));

    let stored = t.store.find_article(article.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Steady");
    let tags = t.blog.tags().article_tags(article.id).await.unwrap();
    assert_eq!(names(&tags), vec!["a", "b"]);
}

#[actix_rt::test]
async fn test_overlong_tag_name_rejected() {
    let t = setup_memory_blog();
    let long = "t".repeat(101);
    let form = blogos::articles::NewArticle {
        tags: long.as_str().into(),
        ..article_form("Too Long", blogos::orm::articles::ArticleStatus::Draft)
    };

    let err = t.blog.articles().create(&alice(), form).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(t.store.list_tags().await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_unknown_tag_slug() {
    let t = setup_memory_blog();
    assert!(matches!(
        t.blog.tags().by_slug("nope").await,
        Err(Error::NotFound(_))
    ));
}
