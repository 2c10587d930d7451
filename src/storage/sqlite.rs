// SQLite 键值存储实现

use super::KvStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

/// SQLite 键值存储
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 创建新的 SQLite 连接并初始化表结构
    pub async fn new(db_path: &str) -> Result<Self> {
        info!("初始化 SQLite 本地存储: {}", db_path);

        // 确保数据库文件的目录存在
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .min_connections(1)
            .idle_timeout(std::time::Duration::from_secs(180))
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await?;

        let store = Self { pool };
        store.initialize_tables().await?;
        Ok(store)
    }

    async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get::<String, _>("value")?),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn store_type(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_upsert_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("kv.db");
        let store = SqliteStore::new(path.to_str().unwrap()).await.unwrap();

        assert!(store.get("community_posts").await.unwrap().is_none());

        store.set("community_posts", "[]").await.unwrap();
        store.set("community_posts", "[1]").await.unwrap();
        assert_eq!(
            store.get("community_posts").await.unwrap().as_deref(),
            Some("[1]")
        );

        store.remove("community_posts").await.unwrap();
        assert!(store.get("community_posts").await.unwrap().is_none());
    }
}
