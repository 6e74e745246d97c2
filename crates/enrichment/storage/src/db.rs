use crate::{
    BacklogReader, BacklogStats, BacklogWriter, InsertOutcome, Metrics, PendingResolution,
    ResolvedReader, ResolvedRecord, ResolvedWriter, StorageError,
};
use chainlens_metrics::{MetricsReporter, observe_metrics_for_result};
use chrono::{DateTime, Utc};
use metrics::gauge;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{
    Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior, params, types::Type,
};
use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
    time::Duration,
};
use tracing::{debug, info, warn};

/// Number of pooled read connections.
const READ_POOL_SIZE: u32 = 4;

const PENDING_COLUMNS: &str = "key, created_at, last_attempt, attempts, error";

/// SQLite-backed enrichment store.
///
/// A dedicated writer connection serializes writes; a pool of read-only connections serves
/// lookups and inspection. WAL mode lets both proceed concurrently.
#[derive(Debug)]
pub struct EnrichmentDb {
    read_pool: Pool<SqliteConnectionManager>,
    writer: Mutex<Connection>,
    metrics_enabled: bool,
    max_attempts: u32,
}

fn configure_writer(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA busy_timeout=5000;",
    )
}

fn configure_reader(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA busy_timeout=5000;")
}

impl EnrichmentDb {
    /// Creates or opens the store at `path`, creating parent directories as needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer = Connection::open(path)?;
        configure_writer(&writer)?;
        init_schema(&writer)?;

        let manager = SqliteConnectionManager::file(path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_init(|conn| configure_reader(conn));
        let read_pool = Pool::builder().max_size(READ_POOL_SIZE).build(manager)?;

        info!(target: "enrichment::storage", path = %path.display(), "Opened enrichment store");
        Ok(Self { read_pool, writer: Mutex::new(writer), metrics_enabled: false, max_attempts: 0 })
    }

    /// Enables request metrics and backlog gauges.
    ///
    /// `max_attempts` splits the backlog gauge into pending and exhausted entries.
    pub fn with_metrics(mut self, max_attempts: u32) -> Self {
        self.metrics_enabled = true;
        self.max_attempts = max_attempts;
        Metrics::init();
        self
    }

    fn read_conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        Ok(self.read_pool.get()?)
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.writer.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn observe_call<T, F: FnOnce() -> Result<T, StorageError>>(
        &self,
        name: &'static str,
        f: F,
    ) -> Result<T, StorageError> {
        if self.metrics_enabled {
            observe_metrics_for_result!(
                Metrics::STORAGE_REQUESTS_SUCCESS_TOTAL,
                Metrics::STORAGE_REQUESTS_ERROR_TOTAL,
                Metrics::STORAGE_REQUEST_DURATION_SECONDS,
                name,
                f()
            )
        } else {
            f()
        }
    }

    fn query_pending(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<PendingResolution>, StorageError> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, pending_from_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pending_resolutions (
             key TEXT PRIMARY KEY,
             created_at INTEGER NOT NULL,
             last_attempt INTEGER,
             attempts INTEGER NOT NULL DEFAULT 0,
             error TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_pending_due
             ON pending_resolutions(attempts, last_attempt);
         CREATE INDEX IF NOT EXISTS idx_pending_created ON pending_resolutions(created_at);

         CREATE TABLE IF NOT EXISTS resolved_records (
             key TEXT PRIMARY KEY,
             kind TEXT NOT NULL,
             data TEXT NOT NULL,
             provenance TEXT,
             updated_at INTEGER NOT NULL
         );",
    )
}

fn upsert(conn: &Connection, record: &ResolvedRecord) -> Result<(), StorageError> {
    let data = serde_json::to_string(&record.data)?;
    conn.execute(
        "INSERT INTO resolved_records (key, kind, data, provenance, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(key) DO UPDATE SET
             kind = excluded.kind,
             data = excluded.data,
             provenance = COALESCE(resolved_records.provenance, excluded.provenance),
             updated_at = excluded.updated_at",
        params![
            record.key,
            record.kind,
            data,
            record.provenance,
            record.updated_at.timestamp_millis()
        ],
    )?;
    Ok(())
}

fn timestamp(millis: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

fn pending_from_row(row: &Row<'_>) -> rusqlite::Result<PendingResolution> {
    let last_attempt: Option<i64> = row.get(2)?;
    Ok(PendingResolution {
        key: row.get(0)?,
        created_at: timestamp(row.get(1)?, 1)?,
        last_attempt: last_attempt.map(|ms| timestamp(ms, 2)).transpose()?,
        attempts: row.get(3)?,
        error: row.get(4)?,
    })
}

fn resolved_from_row(row: &Row<'_>) -> rusqlite::Result<ResolvedRecord> {
    let data: String = row.get(2)?;
    let data = serde_json::from_str(&data)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    Ok(ResolvedRecord {
        key: row.get(0)?,
        kind: row.get(1)?,
        data,
        provenance: row.get(3)?,
        updated_at: timestamp(row.get(4)?, 4)?,
    })
}

impl BacklogReader for EnrichmentDb {
    fn get_pending(&self, key: &str) -> Result<Option<PendingResolution>, StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_GET_PENDING, || {
            let conn = self.read_conn()?;
            Ok(conn
                .query_row(
                    &format!("SELECT {PENDING_COLUMNS} FROM pending_resolutions WHERE key = ?1"),
                    [key],
                    pending_from_row,
                )
                .optional()?)
        })
    }

    fn select_due(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
        max_attempts: u32,
        limit: usize,
    ) -> Result<Vec<PendingResolution>, StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_SELECT_DUE, || {
            let cooldown_ms = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);
            let threshold = now.timestamp_millis().saturating_sub(cooldown_ms);
            self.query_pending(
                &format!(
                    "SELECT {PENDING_COLUMNS} FROM pending_resolutions
                     WHERE attempts < ?1 AND (last_attempt IS NULL OR last_attempt <= ?2)
                     ORDER BY created_at, rowid
                     LIMIT ?3"
                ),
                params![max_attempts, threshold, limit as i64],
            )
        })
    }

    fn list_pending(&self, limit: usize) -> Result<Vec<PendingResolution>, StorageError> {
        self.query_pending(
            &format!(
                "SELECT {PENDING_COLUMNS} FROM pending_resolutions
                 ORDER BY created_at, rowid LIMIT ?1"
            ),
            params![limit as i64],
        )
    }

    fn list_exhausted(
        &self,
        max_attempts: u32,
        limit: usize,
    ) -> Result<Vec<PendingResolution>, StorageError> {
        self.query_pending(
            &format!(
                "SELECT {PENDING_COLUMNS} FROM pending_resolutions
                 WHERE attempts >= ?1
                 ORDER BY created_at, rowid LIMIT ?2"
            ),
            params![max_attempts, limit as i64],
        )
    }

    fn backlog_stats(&self, max_attempts: u32) -> Result<BacklogStats, StorageError> {
        let conn = self.read_conn()?;
        let (pending, exhausted, resolved): (i64, i64, i64) = conn.query_row(
            "SELECT
                 (SELECT COUNT(*) FROM pending_resolutions WHERE attempts < ?1),
                 (SELECT COUNT(*) FROM pending_resolutions WHERE attempts >= ?1),
                 (SELECT COUNT(*) FROM resolved_records)",
            [max_attempts],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(BacklogStats {
            pending: pending.unsigned_abs(),
            exhausted: exhausted.unsigned_abs(),
            resolved: resolved.unsigned_abs(),
        })
    }
}

impl BacklogWriter for EnrichmentDb {
    fn insert_pending(&self, key: &str) -> Result<InsertOutcome, StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_INSERT_PENDING, || {
            let mut conn = self.writer()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let resolved: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM resolved_records WHERE key = ?1)",
                [key],
                |row| row.get(0),
            )?;
            if resolved {
                return Ok(InsertOutcome::AlreadyResolved);
            }

            let inserted = tx.execute(
                "INSERT INTO pending_resolutions (key, created_at, attempts)
                 VALUES (?1, ?2, 0)
                 ON CONFLICT(key) DO NOTHING",
                params![key, Utc::now().timestamp_millis()],
            )?;
            tx.commit()?;

            if inserted == 0 {
                return Ok(InsertOutcome::AlreadyPending);
            }
            debug!(target: "enrichment::storage", key, "Inserted backlog entry");
            Ok(InsertOutcome::Inserted)
        })
    }

    fn record_failure(&self, key: &str, error: &str) -> Result<Option<u32>, StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_RECORD_FAILURE, || {
            let conn = self.writer()?;
            Ok(conn
                .query_row(
                    "UPDATE pending_resolutions
                     SET attempts = attempts + 1, error = ?2, last_attempt = ?3
                     WHERE key = ?1
                     RETURNING attempts",
                    params![key, error, Utc::now().timestamp_millis()],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    fn complete_resolution(&self, record: &ResolvedRecord) -> Result<(), StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_COMPLETE_RESOLUTION, || {
            let mut conn = self.writer()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            upsert(&tx, record)?;
            tx.execute("DELETE FROM pending_resolutions WHERE key = ?1", [&record.key])?;
            tx.commit()?;
            Ok(())
        })
    }
}

impl ResolvedReader for EnrichmentDb {
    fn is_resolved(&self, key: &str) -> Result<bool, StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_IS_RESOLVED, || {
            let conn = self.read_conn()?;
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM resolved_records WHERE key = ?1)",
                [key],
                |row| row.get(0),
            )?)
        })
    }

    fn get_resolved(&self, key: &str) -> Result<Option<ResolvedRecord>, StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_GET_RESOLVED, || {
            let conn = self.read_conn()?;
            Ok(conn
                .query_row(
                    "SELECT key, kind, data, provenance, updated_at
                     FROM resolved_records WHERE key = ?1",
                    [key],
                    resolved_from_row,
                )
                .optional()?)
        })
    }
}

impl ResolvedWriter for EnrichmentDb {
    fn upsert_resolved(&self, record: &ResolvedRecord) -> Result<(), StorageError> {
        self.observe_call(Metrics::STORAGE_METHOD_UPSERT_RESOLVED, || {
            let conn = self.writer()?;
            upsert(&conn, record)
        })
    }
}

impl MetricsReporter for EnrichmentDb {
    fn report_metrics(&self) {
        match self.backlog_stats(self.max_attempts) {
            Ok(stats) => {
                gauge!(Metrics::BACKLOG_ENTRIES, "state" => "pending").set(stats.pending as f64);
                gauge!(Metrics::BACKLOG_ENTRIES, "state" => "exhausted")
                    .set(stats.exhausted as f64);
                gauge!(Metrics::BACKLOG_ENTRIES, "state" => "resolved").set(stats.resolved as f64);
            }
            Err(err) => {
                warn!(target: "enrichment::storage", %err, "Failed to collect backlog metrics");
            }
        }
    }
}
