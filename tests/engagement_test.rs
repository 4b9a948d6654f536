mod common;

use blogos::store::EngagementKind;
use blogos::{Error, Viewer};
use common::database::setup_memory_blog;
use common::fixtures::*;

#[actix_rt::test]
async fn test_like_toggle_scenario() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Likeable").await;
    let engagement = t.blog.engagement();

    let first = engagement.like(&alice(), article.id).await.unwrap();
    assert!(first.active);
    assert_eq!(first.count, 1);
    assert_eq!(first.state(), "liked");

    let second = engagement.like(&alice(), article.id).await.unwrap();
    assert!(!second.active);
    assert_eq!(second.count, 0);
    assert_eq!(second.state(), "unliked");

    let by_bob = engagement.like(&bob(), article.id).await.unwrap();
    assert!(by_bob.active);
    assert_eq!(by_bob.count, 1);

    let summary = engagement.summary(&alice(), article.id).await.unwrap();
    assert_eq!(summary.likes, 1);
    assert!(!summary.liked);
    let summary = engagement.summary(&bob(), article.id).await.unwrap();
    assert!(summary.liked);
}

#[actix_rt::test]
async fn test_likes_and_favorites_are_independent() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Keep").await;
    let engagement = t.blog.engagement();

    let fav = engagement.favorite(&bob(), article.id).await.unwrap();
    assert_eq!(fav.kind, EngagementKind::Favorite);
    assert_eq!(fav.state(), "favorited");

    let summary = engagement.summary(&bob(), article.id).await.unwrap();
    assert_eq!(summary.favorites, 1);
    assert_eq!(summary.likes, 0);
    assert!(summary.favorited);
    assert!(!summary.liked);

    let unfav = engagement.favorite(&bob(), article.id).await.unwrap();
    assert_eq!(unfav.state(), "unfavorited");
    assert_eq!(unfav.count, 0);
}

#[actix_rt::test]
async fn test_anonymous_cannot_toggle() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Public").await;

    let err = t
        .blog
        .engagement()
        .like(&Viewer::anonymous(), article.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));

    // Counts are still readable
    let summary = t
        .blog
        .engagement()
        .summary(&Viewer::anonymous(), article.id)
        .await
        .unwrap();
    assert_eq!(summary.likes, 0);
    assert!(!summary.liked);
}

#[actix_rt::test]
async fn test_toggle_on_missing_or_hidden_article() {
    let t = setup_memory_blog();
    let draft = create_draft(&t.blog, &alice(), "Hidden").await;

    assert!(matches!(
        t.blog.engagement().like(&bob(), 999).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        t.blog.engagement().like(&bob(), draft.id).await,
        Err(Error::NotFound(_))
    ));
    assert!(t.blog.engagement().like(&alice(), draft.id).await.is_ok());
}

#[actix_rt::test]
async fn test_concurrent_toggles_by_distinct_users() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Crowd").await;

    let viewers: Vec<Viewer> = (10..30).map(Viewer::user).collect();
    let calls = viewers
        .iter()
        .map(|v| t.blog.engagement().like(v, article.id));
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(|r| matches!(r, Ok(r) if r.active)));

    let summary = t
        .blog
        .engagement()
        .summary(&Viewer::anonymous(), article.id)
        .await
        .unwrap();
    assert_eq!(summary.likes, 20);
}

#[actix_rt::test]
async fn test_concurrent_toggles_by_same_user() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Double Click").await;

    let reader = bob();
    let (first, second) = futures::join!(
        t.blog.engagement().like(&reader, article.id),
        t.blog.engagement().like(&reader, article.id)
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_ne!(first.active, second.active);

    let summary = t
        .blog
        .engagement()
        .summary(&reader, article.id)
        .await
        .unwrap();
    assert_eq!(summary.likes, 0);
    assert!(!summary.liked);
}
