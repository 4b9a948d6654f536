//! Comment moderation integration tests

mod common;

use blogos::comments::NewComment;
use blogos::notifications::ContentEvent;
use blogos::orm::comments;
use blogos::store::{CommentFilter, ContentStore};
use blogos::{Blog, Error, Viewer};
use common::database::setup_memory_blog;
use common::fixtures::*;

fn form(article_id: i32, content: &str, parent_id: Option<i32>) -> NewComment {
    NewComment {
        article_id,
        content: content.to_string(),
        parent_id,
    }
}

async fn comment(
    blog: &Blog,
    viewer: &Viewer,
    article_id: i32,
    content: &str,
    parent_id: Option<i32>,
) -> comments::Model {
    blog.comments()
        .create(viewer, form(article_id, content, parent_id))
        .await
        .expect("Failed to create comment")
}

#[actix_rt::test]
async fn test_clean_comment_is_approved() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;

    let c = comment(&t.blog, &bob(), article.id, "Great post", None).await;
    assert!(c.is_approved);
}

#[actix_rt::test]
async fn test_sensitive_word_holds_comment() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam", "scam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;

    let c = comment(&t.blog, &bob(), article.id, "buy cheap scam now", None).await;
    assert!(!c.is_approved);

    // Matching is case-sensitive
    let c = comment(&t.blog, &bob(), article.id, "SPAM in capitals", None).await;
    assert!(c.is_approved);
}

#[actix_rt::test]
async fn test_word_added_later_applies_to_next_comment() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Post").await;

    let c = comment(&t.blog, &bob(), article.id, "casino bonus", None).await;
    assert!(c.is_approved);

    add_words(&t.blog, &["casino"]).await;
    let c = comment(&t.blog, &bob(), article.id, "casino bonus", None).await;
    assert!(!c.is_approved);
}

#[actix_rt::test]
async fn test_staff_comments_are_screened_like_anyone() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;

    let clean = comment(&t.blog, &admin(), article.id, "Welcome", None).await;
    assert!(clean.is_approved);

    // No staff bypass of the screen
    let flagged = comment(&t.blog, &admin(), article.id, "spam example", None).await;
    assert!(!flagged.is_approved);
}

#[actix_rt::test]
async fn test_comment_validation() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Post").await;

    let err = t
        .blog
        .comments()
        .create(&Viewer::anonymous(), form(article.id, "hi", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));

    let err = t
        .blog
        .comments()
        .create(&bob(), form(article.id, "   ", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = t
        .blog
        .comments()
        .create(&bob(), form(999, "hi", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = t
        .blog
        .comments()
        .create(&bob(), form(article.id, "hi", Some(999)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[actix_rt::test]
async fn test_comment_length_limit() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Post").await;

    let long = "x".repeat(5001);
    let err = t
        .blog
        .comments()
        .create(&bob(), form(article.id, &long, None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let exact = "x".repeat(5000);
    assert!(t
        .blog
        .comments()
        .create(&bob(), form(article.id, &exact, None))
        .await
        .is_ok());
}

#[actix_rt::test]
async fn test_reply_parent_must_share_article() {
    let t = setup_memory_blog();
    let first = create_published(&t.blog, &alice(), "First").await;
    let second = create_published(&t.blog, &alice(), "Second").await;
    let parent = comment(&t.blog, &bob(), first.id, "On first", None).await;

    let err = t
        .blog
        .comments()
        .create(&carol(), form(second.id, "Wrong thread", Some(parent.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let on_second = t
        .store
        .count_comments(&CommentFilter {
            article_id: Some(second.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(on_second, 0);
}

#[actix_rt::test]
async fn test_comment_on_hidden_article_not_found() {
    let t = setup_memory_blog();
    let draft = create_draft(&t.blog, &alice(), "Unfinished").await;

    let err = t
        .blog
        .comments()
        .create(&bob(), form(draft.id, "early", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // The author may comment on their own draft
    assert!(t
        .blog
        .comments()
        .create(&alice(), form(draft.id, "note to self", None))
        .await
        .is_ok());
}

#[actix_rt::test]
async fn test_deleting_parent_removes_pending_reply() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;

    let c1 = comment(&t.blog, &bob(), article.id, "Approved root", None).await;
    let c2 = comment(&t.blog, &carol(), article.id, "spam reply", Some(c1.id)).await;
    assert!(c1.is_approved);
    assert!(!c2.is_approved);

    let removed = t.blog.comments().delete(&bob(), c1.id).await.unwrap();
    assert_eq!(removed, 2);
    assert!(t.store.find_comment(c1.id).await.unwrap().is_none());
    assert!(t.store.find_comment(c2.id).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_delete_removes_whole_subtree() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Post").await;

    let root = comment(&t.blog, &bob(), article.id, "root", None).await;
    let mut parent = root.id;
    for depth in 0..4 {
        parent = comment(&t.blog, &carol(), article.id, &format!("d{}", depth), Some(parent))
            .await
            .id;
    }
    let sibling = comment(&t.blog, &carol(), article.id, "sibling", None).await;

    let removed = t.blog.comments().delete(&admin(), root.id).await.unwrap();
    assert_eq!(removed, 5);
    assert!(t.store.find_comment(sibling.id).await.unwrap().is_some());
}

#[actix_rt::test]
async fn test_deep_reply_chain_lists_and_deletes() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Long Thread").await;

    let depth = 5_000;
    let root = comment(&t.blog, &bob(), article.id, "root", None).await;
    let mut parent = root.id;
    for _ in 1..depth {
        parent = comment(&t.blog, &carol(), article.id, "again", Some(parent))
            .await
            .id;
    }

    let tree = t
        .blog
        .comments()
        .list_for_article(&Viewer::anonymous(), article.id)
        .await
        .unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].subtree_len(), depth);
    drop(tree);

    let removed = t.blog.comments().delete(&bob(), root.id).await.unwrap();
    assert_eq!(removed, depth as u64);
}

#[actix_rt::test]
async fn test_delete_permissions() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Post").await;
    let c = comment(&t.blog, &bob(), article.id, "mine", None).await;

    // The article author does not own the comment
    let err = t.blog.comments().delete(&alice(), c.id).await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
    assert!(t.store.find_comment(c.id).await.unwrap().is_some());

    assert_eq!(t.blog.comments().delete(&bob(), c.id).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_approve_and_reject_are_staff_only() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;
    let held = comment(&t.blog, &bob(), article.id, "spam one", None).await;
    let other = comment(&t.blog, &bob(), article.id, "spam two", None).await;

    for viewer in [alice(), bob(), Viewer::anonymous()] {
        assert!(t.blog.comments().approve(&viewer, held.id).await.is_err());
        assert!(t.blog.comments().reject(&viewer, held.id).await.is_err());
    }

    let approved = t.blog.comments().approve(&admin(), held.id).await.unwrap();
    assert!(approved.is_approved);
    // Approval does not re-screen
    assert_eq!(approved.content, "spam one");

    assert_eq!(t.blog.comments().reject(&admin(), other.id).await.unwrap(), 1);
    assert!(t.store.find_comment(other.id).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_pending_queue() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;
    comment(&t.blog, &bob(), article.id, "fine", None).await;
    let held = comment(&t.blog, &bob(), article.id, "spam", None).await;

    assert!(t.blog.comments().pending(&bob()).await.is_err());
    let queue = t.blog.comments().pending(&admin()).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, held.id);
}

#[actix_rt::test]
async fn test_edit_rescreens_content() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;
    let c = comment(&t.blog, &bob(), article.id, "hello", None).await;
    assert!(c.is_approved);

    let edited = t
        .blog
        .comments()
        .edit(&bob(), c.id, "now with spam".to_string())
        .await
        .unwrap();
    assert!(!edited.is_approved);

    // A clean edit does not approve a held comment
    let edited = t
        .blog
        .comments()
        .edit(&bob(), c.id, "cleaned up".to_string())
        .await
        .unwrap();
    assert!(!edited.is_approved);
    assert_eq!(edited.content, "cleaned up");

    // Staff may not rewrite someone else's words
    let err = t
        .blog
        .comments()
        .edit(&admin(), c.id, "staff text".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
}

#[actix_rt::test]
async fn test_list_visibility_by_viewer() {
    let t = setup_memory_blog();
    add_words(&t.blog, &["spam"]).await;
    let article = create_published(&t.blog, &alice(), "Post").await;

    let approved = comment(&t.blog, &bob(), article.id, "approved root", None).await;
    let reply = comment(&t.blog, &carol(), article.id, "approved reply", Some(approved.id)).await;
    comment(&t.blog, &carol(), article.id, "spam reply", Some(approved.id)).await;
    comment(&t.blog, &bob(), article.id, "spam root", None).await;

    let anon = t
        .blog
        .comments()
        .list_for_article(&Viewer::anonymous(), article.id)
        .await
        .unwrap();
    assert_eq!(anon.len(), 1);
    assert_eq!(anon[0].comment.id, approved.id);
    assert_eq!(anon[0].replies.len(), 1);
    assert_eq!(anon[0].replies[0].comment.id, reply.id);

    // Bob sees his own held root comment
    let as_bob = t
        .blog
        .comments()
        .list_for_article(&bob(), article.id)
        .await
        .unwrap();
    assert_eq!(as_bob.len(), 2);
    assert_eq!(as_bob.iter().map(|n| n.subtree_len()).sum::<usize>(), 3);

    let as_staff = t
        .blog
        .comments()
        .list_for_article(&admin(), article.id)
        .await
        .unwrap();
    assert_eq!(as_staff.iter().map(|n| n.subtree_len()).sum::<usize>(), 4);
}

#[actix_rt::test]
async fn test_list_is_newest_first() {
    let t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Post").await;
    let older = comment(&t.blog, &bob(), article.id, "older", None).await;
    let newer = comment(&t.blog, &bob(), article.id, "newer", None).await;

    let roots = t
        .blog
        .comments()
        .list_for_article(&Viewer::anonymous(), article.id)
        .await
        .unwrap();
    let ids: Vec<i32> = roots.iter().map(|n| n.comment.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[actix_rt::test]
async fn test_comment_notifications() {
    let mut t = setup_memory_blog();
    let article = create_published(&t.blog, &alice(), "Post").await;
    t.drain_events();

    // Commenting on your own article notifies nobody
    let own = comment(&t.blog, &alice(), article.id, "author note", None).await;
    assert!(t.drain_events().is_empty());

    let top = comment(&t.blog, &bob(), article.id, "hi", None).await;
    let events = t.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ContentEvent::CommentPosted { comment_id, recipient_id, .. }
            if *comment_id == top.id && *recipient_id == ALICE
    ));

    // Replies go to the parent's author, not the article's
    let reply = comment(&t.blog, &carol(), article.id, "re", Some(top.id)).await;
    let events = t.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].recipient_id(), BOB);
    assert!(matches!(
        &events[0],
        ContentEvent::ReplyPosted { comment_id, parent_id, .. }
            if *comment_id == reply.id && *parent_id == top.id
    ));

    comment(&t.blog, &alice(), article.id, "self reply", Some(own.id)).await;
    assert!(t.drain_events().is_empty());
}

#[actix_rt::test]
async fn test_sensitive_word_admin() {
    let t = setup_memory_blog();

    assert!(t.blog.add_sensitive_word(&bob(), "spam").await.is_err());
    assert_eq!(
        t.blog.add_sensitive_word(&admin(), "  spam ").await.unwrap(),
        "spam"
    );
    assert!(matches!(
        t.blog.add_sensitive_word(&admin(), "spam").await,
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        t.blog.add_sensitive_word(&admin(), "   ").await,
        Err(Error::Validation(_))
    ));
    assert_eq!(
        t.blog.sensitive_words(&admin()).await.unwrap(),
        vec!["spam".to_string()]
    );
    assert!(t.blog.sensitive_words(&bob()).await.is_err());
}
