//! Postgres-backed [`ItemStore`].
//!
//! Deduplication is the `UNIQUE (user_id, feed_id, guid)` constraint on
//! `feed_items`; an insert that hits it reports [`StoreError::Duplicate`].

use std::collections::HashMap;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use quire_core::{FeedItem, ItemStore, StoreError};
use tokio_postgres::NoTls;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

const MIGRATIONS: &[(&str, &str)] = &[("001_feed_items", include_str!("../migrations/001_feed_items.sql"))];

const INSERT_ITEM: &str = "INSERT INTO feed_items \
     (id, user_id, feed_id, guid, title, link, pub_date, author, content, content_snippet, image_url) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
     ON CONFLICT (user_id, feed_id, guid) DO NOTHING";

const UNREAD_COUNTS: &str = "SELECT feed_id, COUNT(*) FROM feed_items \
     WHERE user_id = $1 AND NOT is_read GROUP BY feed_id";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn connect(database_url: &str) -> anyhow::Result<Self> {
        let mut config = Config::new();
        config.url = Some(database_url.to_string());
        config.manager = Some(ManagerConfig { recycling_method: RecyclingMethod::Fast });

        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;
        Ok(Self { pool })
    }

    /// Applies every schema migration. Each script is idempotent.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        for (name, sql) in MIGRATIONS {
            tracing::info!(migration = name, "applying migration");
            client.batch_execute(sql).await?;
        }
        Ok(())
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, StoreError> {
        self.pool.get().await.map_err(|e| StoreError::Backend(e.to_string()))
    }
}

fn backend(e: tokio_postgres::Error) -> StoreError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        StoreError::Duplicate
    } else {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn insert_item(&self, user_id: &str, feed_id: &str, item: &FeedItem) -> Result<(), StoreError> {
        let client = self.client().await?;
        let inserted = client
            .execute(
                INSERT_ITEM,
                &[
                    &Uuid::new_v4(),
                    &user_id,
                    &feed_id,
                    &item.guid,
                    &item.title,
                    &item.link,
                    &item.pub_date,
                    &item.author,
                    &item.content,
                    &item.content_snippet,
                    &item.image_url,
                ],
            )
            .await
            .map_err(backend)?;

        if inserted == 0 { Err(StoreError::Duplicate) } else { Ok(()) }
    }

    async fn unread_counts(&self, user_id: &str) -> Result<HashMap<String, u64>, StoreError> {
        let client = self.client().await?;
        let rows = client.query(UNREAD_COUNTS, &[&user_id]).await.map_err(backend)?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let feed_id: String = row.try_get(0).map_err(backend)?;
            let count: i64 = row.try_get(1).map_err(backend)?;
            counts.insert(feed_id, count.max(0) as u64);
        }
        Ok(counts)
    }
}
