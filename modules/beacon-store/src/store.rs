use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreError;
use crate::row::RecordRow;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    parsed_at  TEXT NOT NULL,
    feed_name  TEXT NOT NULL,
    uid        TEXT NOT NULL,
    hashsum    TEXT NOT NULL,
    class_name TEXT NOT NULL,
    as_json    TEXT NOT NULL,
    PRIMARY KEY(uid, hashsum)
)
"#;

/// Content-addressed SQL record store backing [`beacon-monitor`]'s dedup
/// and priming logic. One store per monitor/view, as the spec prescribes;
/// callers decide whether that maps to one file per entity or a shared file
/// with `feed_name` discriminating rows.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// `path` may be `:memory:` (ephemeral) or a filesystem path; parent
    /// directories are created if missing.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StoreError::CreateDir(parent.display().to_string(), e))?;
                }
            }
            format!("sqlite://{path}?mode=rwc")
        };

        let pool = SqlitePoolOptions::new().max_connections(1).connect(&url).await?;
        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// `INSERT OR IGNORE` on `(uid, hashsum)` — re-storing an already-known
    /// version is a no-op, satisfying the store's idempotency invariant.
    pub async fn store(&self, row: &RecordRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO records (parsed_at, feed_name, uid, hashsum, class_name, as_json) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(row.parsed_at.to_rfc3339())
        .bind(&row.feed_name)
        .bind(&row.uid)
        .bind(&row.hashsum)
        .bind(&row.class_name)
        .bind(row.as_json.to_string())
        .execute(&self.pool)
        .await?;
        debug!(uid = %row.uid, hashsum = %row.hashsum, "stored record row");
        Ok(())
    }

    /// True iff any version of the logical record identified by `uid` was
    /// ever stored.
    pub async fn row_exists(&self, uid: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE uid = ?")
            .bind(uid)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// True iff this exact (uid, hashsum) version was ever stored.
    pub async fn row_exists_with_hash(&self, uid: &str, hashsum: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE uid = ? AND hashsum = ?")
            .bind(uid)
            .bind(hashsum)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Newest matching row by `parsed_at`, optionally narrowed to a specific
    /// hashsum.
    pub async fn fetch_row(&self, uid: &str, hashsum: Option<&str>) -> Result<Option<RecordRow>, StoreError> {
        let row = match hashsum {
            Some(h) => {
                sqlx::query_as::<_, RecordRow>(
                    "SELECT * FROM records WHERE uid = ? AND hashsum = ? ORDER BY parsed_at DESC LIMIT 1",
                )
                .bind(uid)
                .bind(h)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RecordRow>(
                    "SELECT * FROM records WHERE uid = ? ORDER BY parsed_at DESC LIMIT 1",
                )
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(row)
    }

    pub async fn row_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Row count scoped to one entity — used to decide whether a feed
    /// entity is seeing its first-ever poll (priming, §4.5/I9).
    pub async fn row_count_for_feed(&self, feed_name: &str) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE feed_name = ?")
            .bind(feed_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reinsert_of_same_uid_hashsum_is_idempotent() {
        let store = RecordStore::connect(":memory:").await.unwrap();
        let row = RecordRow::new("feed", "feed:1", "abc", "rss_entry", json!({"a":1}));

        store.store(&row).await.unwrap();
        store.store(&row).await.unwrap();

        assert_eq!(store.row_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn row_exists_tracks_any_version_while_hash_variant_tracks_exact() {
        let store = RecordStore::connect(":memory:").await.unwrap();
        let first = RecordRow::new("feed", "feed:1", "hash-a", "rss_entry", json!({"a":1}));
        store.store(&first).await.unwrap();

        assert!(store.row_exists("feed:1").await.unwrap());
        assert!(store.row_exists_with_hash("feed:1", "hash-a").await.unwrap());
        assert!(!store.row_exists_with_hash("feed:1", "hash-b").await.unwrap());

        let updated = RecordRow::new("feed", "feed:1", "hash-b", "rss_entry", json!({"a":2}));
        store.store(&updated).await.unwrap();

        assert!(store.row_exists_with_hash("feed:1", "hash-b").await.unwrap());
        assert_eq!(store.row_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn fetch_row_returns_newest_by_parsed_at() {
        let store = RecordStore::connect(":memory:").await.unwrap();
        let first = RecordRow::new("feed", "feed:1", "hash-a", "rss_entry", json!({"v":1}));
        store.store(&first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = RecordRow::new("feed", "feed:1", "hash-b", "rss_entry", json!({"v":2}));
        store.store(&second).await.unwrap();

        let newest = store.fetch_row("feed:1", None).await.unwrap().unwrap();
        assert_eq!(newest.hashsum, "hash-b");
    }
}
