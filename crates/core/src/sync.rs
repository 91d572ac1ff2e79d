//! Merging fetched feed items into storage.
//!
//! [`sync_items`] inserts each item under the key `(user, feed, guid)` and
//! relies on the store's unique constraint to spot items it already has.
//! There is no read-before-write and no lock: two syncs of the same feed
//! racing each other both succeed, and whichever insert loses is counted as
//! existing. Counts are therefore exact per call but not linearizable across
//! concurrent calls; delivery is at-least-once and idempotent by constraint.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::feed::FeedItem;

/// Persistence boundary for feed items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Inserts an unread item.
    ///
    /// Must return [`StoreError::Duplicate`] when `(user_id, feed_id, item.guid)`
    /// already exists.
    async fn insert_item(&self, user_id: &str, feed_id: &str, item: &FeedItem) -> Result<(), StoreError>;

    /// Number of unread items per feed for `user_id`. Feeds with none are absent.
    async fn unread_counts(&self, user_id: &str) -> Result<HashMap<String, u64>, StoreError>;
}

/// Outcome of one sync call.
///
/// `added + existing + errors.len()` always equals the batch size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub added: usize,
    pub existing: usize,
    pub errors: Vec<String>,
}

/// Inserts `items` for `(user_id, feed_id)`.
///
/// Duplicates count as existing; any other failure is recorded by item title
/// and the batch continues.
pub async fn sync_items(store: &dyn ItemStore, user_id: &str, feed_id: &str, items: &[FeedItem]) -> SyncResult {
    let mut result = SyncResult::default();

    for item in items {
        let mut item = item.clone();
        if !item.ensure_guid() {
            tracing::warn!(feed_id, "item has no guid, link or title");
            result.errors.push(describe(&item));
            continue;
        }

        match store.insert_item(user_id, feed_id, &item).await {
            Ok(()) => result.added += 1,
            Err(StoreError::Duplicate) => result.existing += 1,
            Err(e) => {
                tracing::warn!(feed_id, guid = %item.guid, error = %e, "failed to store feed item");
                result.errors.push(describe(&item));
            }
        }
    }

    tracing::debug!(
        user_id,
        feed_id,
        added = result.added,
        existing = result.existing,
        errors = result.errors.len(),
        "sync finished"
    );
    result
}

/// Per-feed unread counts for `user_id`.
pub async fn unread_counts(store: &dyn ItemStore, user_id: &str) -> Result<HashMap<String, u64>, StoreError> {
    store.unread_counts(user_id).await
}

fn describe(item: &FeedItem) -> String {
    if item.title.trim().is_empty() { "(untitled)".to_string() } else { item.title.clone() }
}

#[derive(Debug, Clone)]
struct StoredItem {
    user_id: String,
    feed_id: String,
    item: FeedItem,
    is_read: bool,
}

/// In-process [`ItemStore`] with the same uniqueness rule as the SQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one item read. Returns whether it was found.
    pub fn mark_read(&self, user_id: &str, feed_id: &str, guid: &str) -> bool {
        let Ok(mut rows) = self.rows.lock() else {
            return false;
        };
        match rows
            .iter_mut()
            .find(|r| r.user_id == user_id && r.feed_id == feed_id && r.item.guid == guid)
        {
            Some(row) => {
                row.is_read = true;
                true
            }
            None => false,
        }
    }

    /// Stored items for one feed, in insertion order.
    pub fn items(&self, user_id: &str, feed_id: &str) -> Vec<FeedItem> {
        self.rows
            .lock()
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.user_id == user_id && r.feed_id == feed_id)
                    .map(|r| r.item.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert_item(&self, user_id: &str, feed_id: &str, item: &FeedItem) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().map_err(|e| StoreError::Backend(e.to_string()))?;
        let duplicate = rows
            .iter()
            .any(|r| r.user_id == user_id && r.feed_id == feed_id && r.item.guid == item.guid);
        if duplicate {
            return Err(StoreError::Duplicate);
        }

        rows.push(StoredItem {
            user_id: user_id.to_string(),
            feed_id: feed_id.to_string(),
            item: item.clone(),
            is_read: false,
        });
        Ok(())
    }

    async fn unread_counts(&self, user_id: &str) -> Result<HashMap<String, u64>, StoreError> {
        let rows = self.rows.lock().map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut counts = HashMap::new();
        for row in rows.iter().filter(|r| r.user_id == user_id && !r.is_read) {
            *counts.entry(row.feed_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(guid: &str, title: &str) -> FeedItem {
        FeedItem {
            guid: guid.to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{guid}"),
            ..Default::default()
        }
    }

    fn batch() -> Vec<FeedItem> {
        vec![item("a", "A"), item("b", "B"), item("c", "C")]
    }

    /// Fails every insert whose title starts with "fail".
    struct FlakyStore(MemoryStore);

    #[async_trait]
    impl ItemStore for FlakyStore {
        async fn insert_item(&self, user_id: &str, feed_id: &str, item: &FeedItem) -> Result<(), StoreError> {
            if item.title.starts_with("fail") {
                return Err(StoreError::Backend("connection reset".to_string()));
            }
            self.0.insert_item(user_id, feed_id, item).await
        }

        async fn unread_counts(&self, user_id: &str) -> Result<HashMap<String, u64>, StoreError> {
            self.0.unread_counts(user_id).await
        }
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let store = MemoryStore::new();

        let first = sync_items(&store, "u1", "f1", &batch()).await;
        assert_eq!(first, SyncResult { added: 3, existing: 0, errors: vec![] });

        let second = sync_items(&store, "u1", "f1", &batch()).await;
        assert_eq!(second, SyncResult { added: 0, existing: 3, errors: vec![] });

        assert_eq!(store.items("u1", "f1").len(), 3);
    }

    #[tokio::test]
    async fn test_dedup_key_includes_user_and_feed() {
        let store = MemoryStore::new();
        sync_items(&store, "u1", "f1", &batch()).await;

        let other_feed = sync_items(&store, "u1", "f2", &batch()).await;
        let other_user = sync_items(&store, "u2", "f1", &batch()).await;

        assert_eq!(other_feed.added, 3);
        assert_eq!(other_user.added, 3);
    }

    #[tokio::test]
    async fn test_errors_recorded_by_title() {
        let store = FlakyStore(MemoryStore::new());
        let items = vec![item("a", "A"), item("x", "fail whale"), item("b", "B")];

        let result = sync_items(&store, "u1", "f1", &items).await;

        assert_eq!(result.added, 2);
        assert_eq!(result.existing, 0);
        assert_eq!(result.errors, vec!["fail whale"]);
        assert_eq!(result.added + result.existing + result.errors.len(), items.len());
    }

    #[tokio::test]
    async fn test_guid_fallback_applied_before_insert() {
        let store = MemoryStore::new();
        let items = vec![FeedItem { link: "https://x.com/a".to_string(), ..Default::default() }, FeedItem::default()];

        let result = sync_items(&store, "u1", "f1", &items).await;

        assert_eq!(result.added, 1);
        assert_eq!(result.errors, vec!["(untitled)"]);
        assert_eq!(store.items("u1", "f1")[0].guid, "https://x.com/a");
    }

    #[tokio::test]
    async fn test_unread_counts() {
        let store = MemoryStore::new();
        sync_items(&store, "u1", "f1", &batch()).await;
        sync_items(&store, "u1", "f2", &[item("z", "Z")]).await;
        sync_items(&store, "u2", "f1", &batch()).await;

        assert!(store.mark_read("u1", "f1", "b"));
        assert!(!store.mark_read("u1", "f1", "missing"));

        let counts = unread_counts(&store, "u1").await.unwrap();
        assert_eq!(counts.get("f1"), Some(&2));
        assert_eq!(counts.get("f2"), Some(&1));
        assert_eq!(counts.len(), 2);

        sync_items(&store, "u3", "f9", &[]).await;
        assert!(unread_counts(&store, "u3").await.unwrap().is_empty());
    }
}
