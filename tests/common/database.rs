//! Test store setup

use blogos::app_config::AppConfig;
use blogos::notifications::{ChannelNotifier, ContentEvent};
use blogos::store::{DatabaseStore, MemoryStore};
use blogos::Blog;
use futures::channel::mpsc::UnboundedReceiver;
use std::sync::Arc;

/// A blog over a fresh in-memory store, with its event stream.
pub struct TestBlog {
    pub blog: Blog,
    pub store: Arc<MemoryStore>,
    pub events: UnboundedReceiver<ContentEvent>,
}

impl TestBlog {
    /// Events emitted so far, without waiting for more.
    pub fn drain_events(&mut self) -> Vec<ContentEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.events.try_next() {
            events.push(event);
        }
        events
    }
}

pub fn setup_memory_blog() -> TestBlog {
    setup_memory_blog_with(AppConfig::default())
}

pub fn setup_memory_blog_with(config: AppConfig) -> TestBlog {
    let store = Arc::new(MemoryStore::new());
    let (notifier, events) = ChannelNotifier::new();
    let blog = Blog::with_store(store.clone(), Arc::new(notifier), &config);
    TestBlog {
        blog,
        store,
        events,
    }
}

/// A blog over a SQLite file in a temporary directory.
///
/// The directory is removed when the returned guard is dropped.
pub async fn setup_sqlite_blog() -> (Blog, Arc<DatabaseStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("blog.db").display());

    let db = blogos::db::connect(&url)
        .await
        .expect("Failed to connect to test database");
    blogos::db::create_schema(&db)
        .await
        .expect("Failed to create schema");

    let store = Arc::new(DatabaseStore::new(db));
    let blog = Blog::with_store(
        store.clone(),
        Arc::new(blogos::notifications::NullNotifier),
        &AppConfig::default(),
    );
    (blog, store, dir)
}
