use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

/// SQLite store of URL hashes already reported per account.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (creating if needed) the database and run migrations.
    ///
    /// `":memory:"` gives a private in-memory database shared by the pool.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another run holds the lock
    /// (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN), `DatabaseError::Migration`
    /// if the schema could not be applied.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(path);
            if !db_path.exists() {
                // Create owner-only before SQLite touches it; failures resurface at connect
                let _ = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path);
            }
        }

        // busy_timeout on every pooled connection: wait up to 5s for a lock
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // One sequential job; a couple of connections is plenty
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let message = e.to_string();
            if DatabaseError::is_lock_message(&message) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(message)
            }
        })?;
        Ok(db)
    }

    /// Apply the schema in one transaction. Idempotent.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_urls (
                account TEXT NOT NULL,
                url_hash TEXT NOT NULL,
                pub_date TEXT,
                seen_at TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at TEXT NOT NULL,
                PRIMARY KEY (account, url_hash)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Eviction scans by expiry
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_seen_urls_expires ON seen_urls(expires_at)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Close the pool, flushing the WAL for on-disk databases.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
