use crate::{BacklogStats, InsertOutcome, PendingResolution, ResolvedRecord, StorageError};
use chrono::{DateTime, Utc};
use std::{fmt::Debug, time::Duration};

/// Read access to the backlog of unresolved keys.
pub trait BacklogReader: Debug {
    /// Gets the backlog row for `key`, if the key is still pending.
    fn get_pending(&self, key: &str) -> Result<Option<PendingResolution>, StorageError>;

    /// Selects entries due for an automatic attempt.
    ///
    /// An entry is due when `attempts < max_attempts` and it either never failed or its last
    /// failure is at least `cooldown` older than `now`. Oldest `created_at` first.
    ///
    /// # Arguments
    /// * `now` - Reference time for the cooldown window.
    /// * `cooldown` - Minimum age of the last failed attempt.
    /// * `max_attempts` - Attempt ceiling; entries at or above it are skipped.
    /// * `limit` - Maximum number of entries returned.
    fn select_due(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
        max_attempts: u32,
        limit: usize,
    ) -> Result<Vec<PendingResolution>, StorageError>;

    /// Lists backlog rows oldest first, regardless of attempts.
    fn list_pending(&self, limit: usize) -> Result<Vec<PendingResolution>, StorageError>;

    /// Lists rows that reached `max_attempts` and are excluded from automatic retry.
    fn list_exhausted(
        &self,
        max_attempts: u32,
        limit: usize,
    ) -> Result<Vec<PendingResolution>, StorageError>;

    /// Counts pending, exhausted and resolved keys.
    fn backlog_stats(&self, max_attempts: u32) -> Result<BacklogStats, StorageError>;
}

/// Write access to the backlog of unresolved keys.
pub trait BacklogWriter: Debug {
    /// Inserts `key` into the backlog.
    ///
    /// The resolved check, the duplicate check and the insert happen in one transaction. A key
    /// that already has a resolved record is not inserted.
    ///
    /// # Returns
    /// * `Ok(InsertOutcome)` describing what happened.
    /// * `Err(StorageError)` if the store could not be written.
    fn insert_pending(&self, key: &str) -> Result<InsertOutcome, StorageError>;

    /// Records a failed attempt: increments `attempts`, stores `error` and stamps `last_attempt`.
    ///
    /// # Returns
    /// * `Ok(Some(attempts))` with the new attempt count.
    /// * `Ok(None)` if `key` is not in the backlog.
    fn record_failure(&self, key: &str, error: &str) -> Result<Option<u32>, StorageError>;

    /// Upserts `record` and removes its key from the backlog in one transaction.
    fn complete_resolution(&self, record: &ResolvedRecord) -> Result<(), StorageError>;
}

/// Read access to resolved records.
pub trait ResolvedReader: Debug {
    /// Whether `key` has a resolved record.
    fn is_resolved(&self, key: &str) -> Result<bool, StorageError>;

    /// Gets the resolved record for `key`.
    fn get_resolved(&self, key: &str) -> Result<Option<ResolvedRecord>, StorageError>;
}

/// Write access to resolved records.
pub trait ResolvedWriter: Debug {
    /// Upserts `record`.
    ///
    /// `kind` and `data` are last-writer-wins. `provenance` is fill-if-null: a stored value is
    /// kept when the incoming record has none.
    fn upsert_resolved(&self, record: &ResolvedRecord) -> Result<(), StorageError>;
}

/// Combined backlog access.
pub trait BacklogStorage: BacklogReader + BacklogWriter {}

impl<T: BacklogReader + BacklogWriter> BacklogStorage for T {}

/// Combined resolved-record access.
pub trait ResolvedStorage: ResolvedReader + ResolvedWriter {}

impl<T: ResolvedReader + ResolvedWriter> ResolvedStorage for T {}

/// Everything the enrichment pipeline needs from its store.
pub trait EnrichmentStorage: BacklogStorage + ResolvedStorage + Send + Sync {}

impl<T: BacklogStorage + ResolvedStorage + Send + Sync> EnrichmentStorage for T {}
