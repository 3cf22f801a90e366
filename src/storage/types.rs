use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database errors surfaced when opening the store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another run holds the database lock
    #[error("Another account-brief run appears to hold the database. Wait for it to finish and try again.")]
    InstanceLocked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, mapping lock conditions to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if Self::is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }

    /// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages.
    pub(crate) fn is_lock_message(message: &str) -> bool {
        let message = message.to_lowercase();
        message.contains("database is locked")
            || message.contains("database table is locked")
            || message.contains("sqlite_busy")
            || message.contains("sqlite_locked")
            || message.contains("unable to open database file")
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// One remembered article for an account.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SeenEntry {
    pub account: String,
    pub url_hash: String,
    pub pub_date: Option<String>,
    pub seen_at: String,
    pub expires_at: String,
}
