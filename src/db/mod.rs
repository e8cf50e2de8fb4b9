pub mod document;

pub use document::*;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::time::Duration;

use crate::error::Result;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database at `path`; `:memory:` opens a private in-memory database
    pub async fn new(path: &str) -> Result<Self> {
        let pool = if path == ":memory:" {
            // Every connection would get its own empty database, so keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect("sqlite::memory:")
                .await?
        } else {
            let url = format!("sqlite:{}?mode=rwc", path);
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?
        };

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn is_alive(&self) -> bool {
        !self.pool.is_closed()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                is_public INTEGER NOT NULL DEFAULT 0,
                parent_id TEXT NOT NULL DEFAULT '0',
                local_path TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_user_parent ON files(user_id, parent_id)")
            .execute(&self.pool)
            .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_database() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.run_migrations().await.unwrap();
    db
}
