//! Rows stored by [`EnrichmentDb`](crate::EnrichmentDb).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A key waiting for enrichment.
///
/// `attempts` only ever grows. Rows whose attempts reached the configured ceiling stay in the
/// table for inspection but are no longer selected by sweeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResolution {
    /// Unique enrichment key, e.g. `ibc/<HASH>`.
    pub key: String,
    /// When the key was first seen unresolved.
    pub created_at: DateTime<Utc>,
    /// When the last resolution attempt failed, if any.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Number of failed attempts so far.
    pub attempts: u32,
    /// Message of the most recent failure.
    pub error: Option<String>,
}

/// Enrichment output for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    /// The key this record resolves.
    pub key: String,
    /// Resolver that produced the record (`denom_trace`, `tx`, `params`).
    pub kind: String,
    /// Resolved payload. Last writer wins.
    pub data: Value,
    /// Where the data originated, if known. Once set it is never cleared by a later upsert.
    pub provenance: Option<String>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl ResolvedRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        key: impl Into<String>,
        kind: impl Into<String>,
        data: Value,
        provenance: Option<String>,
    ) -> Self {
        Self { key: key.into(), kind: kind.into(), data, provenance, updated_at: Utc::now() }
    }
}

/// Result of inserting a key into the backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    /// A new backlog row was created.
    Inserted,
    /// The key was already in the backlog.
    AlreadyPending,
    /// The key already has a resolved record; nothing was inserted.
    AlreadyResolved,
}

impl InsertOutcome {
    /// Whether a new row was written.
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Backlog counts for operators and gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogStats {
    /// Rows still eligible for automatic retry.
    pub pending: u64,
    /// Rows that reached the attempt ceiling.
    pub exhausted: u64,
    /// Resolved records.
    pub resolved: u64,
}
