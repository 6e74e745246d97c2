use thiserror::Error;

/// Errors that may occur while interacting with enrichment storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying SQLite call failed.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// No read connection could be taken from the pool.
    #[error(transparent)]
    Pool(#[from] r2d2::Error),

    /// A stored JSON document could not be (de)serialized.
    #[error("invalid record data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The writer lock was poisoned by a panicking holder.
    #[error("lock poisoned")]
    LockPoisoned,

    /// The database path could not be prepared.
    #[error("failed to prepare database directory: {0}")]
    DatabaseInit(#[from] std::io::Error),
}

impl PartialEq for StorageError {
    fn eq(&self, other: &Self) -> bool {
        use StorageError::*;
        match (self, other) {
            (Sqlite(a), Sqlite(b)) => a == b,
            (LockPoisoned, LockPoisoned) => true,
            (Pool(a), Pool(b)) => a.to_string() == b.to_string(),
            (Serialization(a), Serialization(b)) => a.to_string() == b.to_string(),
            (DatabaseInit(a), DatabaseInit(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}

impl Eq for StorageError {}
