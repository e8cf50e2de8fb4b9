use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use crate::db::Database;
use crate::error::Result;

/// Key under which a session token maps to its user id
pub fn auth_key(token: &str) -> String {
    format!("auth_{}", token)
}

/// Expiring key-value store for session tokens
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Value for `key`, or `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    fn is_alive(&self) -> bool;

    async fn close(&self);
}

/// SQLite-backed session store
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, expires_at FROM sessions WHERE key = ?")
                .bind(key)
                .fetch_optional(self.db.pool())
                .await?;

        match row {
            Some((value, expires_at)) if expires_at > Utc::now().timestamp() => Ok(Some(value)),
            Some(_) => {
                sqlx::query("DELETE FROM sessions WHERE key = ? AND expires_at <= ?")
                    .bind(key)
                    .bind(Utc::now().timestamp())
                    .execute(self.db.pool())
                    .await?;
                tracing::debug!("Dropped expired session key {}", key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl);

        sqlx::query(
            r#"
            INSERT INTO sessions (key, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.db.is_alive()
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
