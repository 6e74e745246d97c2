//! Persistent storage for chainlens enrichment.
//!
//! Two tables back the enrichment pipeline:
//! - `pending_resolutions`: the backlog of keys discovered during normalization that still need
//!   data from a live node, with attempt bookkeeping.
//! - `resolved_records`: the enrichment output, upserted once a key resolves.
//!
//! The store is a SQLite file in WAL mode. Writes go through one dedicated connection; reads use
//! a small connection pool so inspection never waits on the writer.
//!
//! ## Capabilities
//!
//! - Deduplicated backlog inserts, consistent with the resolved table
//! - Due-entry selection honoring an attempt ceiling and a retry cooldown
//! - Atomic completion (upsert record + delete backlog row) and failure stamping
//! - Operator inspection of pending and exhausted entries

mod db;
pub use db::EnrichmentDb;

mod error;
pub use error::StorageError;

mod metrics;
pub(crate) use metrics::Metrics;

pub mod models;
pub use models::{BacklogStats, InsertOutcome, PendingResolution, ResolvedRecord};

mod traits;
pub use traits::{
    BacklogReader, BacklogStorage, BacklogWriter, EnrichmentStorage, ResolvedReader,
    ResolvedStorage, ResolvedWriter,
};
