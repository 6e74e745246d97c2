use crate::{Outcome, ProcessorError, QueueConfig, ResolutionProcessor, Resolver, Trigger};
use chainlens_enrichment_storage::EnrichmentStorage;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Entries selected as due.
    pub selected: usize,
    /// Entries resolved.
    pub resolved: usize,
    /// Entries that failed again.
    pub failed: usize,
    /// Entries skipped, typically because a notification got to them first.
    pub skipped: usize,
}

/// Periodically retries due backlog entries.
#[derive(Debug)]
pub struct SweepJob<S, R> {
    processor: Arc<ResolutionProcessor<S, R>>,
    config: QueueConfig,
    cancel_token: CancellationToken,
}

impl<S, R> SweepJob<S, R>
where
    S: EnrichmentStorage,
    R: Resolver,
{
    /// Creates a sweep over `processor`'s store.
    pub const fn new(
        processor: Arc<ResolutionProcessor<S, R>>,
        config: QueueConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self { processor, config, cancel_token }
    }

    /// Sweeps every `poll_interval` until cancelled. The first sweep runs immediately.
    pub async fn run(self) {
        info!(
            target: "enrichment::sweep",
            interval = ?self.config.poll_interval,
            batch_size = self.config.batch_size,
            "Starting sweep"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(target: "enrichment::sweep", "Sweep cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(summary) if summary.selected > 0 => {
                            info!(target: "enrichment::sweep", ?summary, "Sweep finished");
                        }
                        Ok(_) => debug!(target: "enrichment::sweep", "Nothing due"),
                        Err(err) => error!(target: "enrichment::sweep", %err, "Sweep failed"),
                    }
                }
            }
        }
    }

    /// Processes up to `batch_size` due entries, one at a time.
    ///
    /// Stops early, between entries, when cancelled.
    pub async fn sweep(&self) -> Result<SweepSummary, ProcessorError> {
        let due = self.processor.store().select_due(
            Utc::now(),
            self.config.retry_cooldown,
            self.config.max_attempts,
            self.config.batch_size,
        )?;

        let mut summary = SweepSummary { selected: due.len(), ..Default::default() };
        for entry in due {
            if self.cancel_token.is_cancelled() {
                break;
            }
            match self.processor.process(&entry.key, Trigger::Sweep).await? {
                Outcome::Resolved => summary.resolved += 1,
                Outcome::Failed { .. } => summary.failed += 1,
                Outcome::Skipped(_) => summary.skipped += 1,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResolveError, resolver::MockResolver};
    use chainlens_enrichment_storage::{BacklogReader, BacklogWriter, EnrichmentDb, ResolvedRecord};
    use chainlens_grpc_dynamic::{InvokeError, TransportError};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store() -> (TempDir, Arc<EnrichmentDb>) {
        let dir = TempDir::new().expect("create temp dir");
        let db = EnrichmentDb::new(dir.path().join("store.db")).expect("create db");
        (dir, Arc::new(db))
    }

    fn config() -> QueueConfig {
        QueueConfig { retry_cooldown: Duration::ZERO, ..Default::default() }
    }

    #[tokio::test]
    async fn test_failing_entry_is_dropped_from_sweeps_after_ceiling() {
        let (_dir, store) = store();
        store.insert_pending("ibc/BADHASH").unwrap();

        let mut resolver = MockResolver::new();
        resolver.expect_resolve().times(5).returning(|_| {
            Err(ResolveError::Invoke(InvokeError::Transport(TransportError::new(
                TransportError::UNAVAILABLE,
                "node unreachable",
            ))))
        });

        let processor = Arc::new(ResolutionProcessor::new(store.clone(), resolver, 5));
        let job = SweepJob::new(processor, config(), CancellationToken::new());

        for _ in 0..5 {
            let summary = job.sweep().await.unwrap();
            assert_eq!(summary, SweepSummary { selected: 1, failed: 1, ..Default::default() });
        }
        assert_eq!(job.sweep().await.unwrap(), SweepSummary::default());

        let row = store.get_pending("ibc/BADHASH").unwrap().expect("row kept");
        assert_eq!(row.attempts, 5);
        assert_eq!(row.error.as_deref(), Some("transport error (code 14): node unreachable"));
    }

    #[tokio::test]
    async fn test_sweep_processes_oldest_first_within_batch() {
        let (_dir, store) = store();
        for key in ["k/1", "k/2", "k/3"] {
            store.insert_pending(key).unwrap();
        }

        let mut seq = mockall::Sequence::new();
        let mut resolver = MockResolver::new();
        for expected in ["k/1", "k/2"] {
            resolver
                .expect_resolve()
                .withf(move |key| key == expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|key| Ok(ResolvedRecord::new(key, "params", json!({}), None)));
        }

        let processor = Arc::new(ResolutionProcessor::new(store.clone(), resolver, 5));
        let job = SweepJob::new(
            processor,
            QueueConfig { batch_size: 2, ..config() },
            CancellationToken::new(),
        );

        assert_eq!(
            job.sweep().await.unwrap(),
            SweepSummary { selected: 2, resolved: 2, ..Default::default() }
        );
        assert!(store.get_pending("k/3").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (_dir, store) = store();
        let resolver = MockResolver::new();
        let processor = Arc::new(ResolutionProcessor::new(store, resolver, 5));
        let cancel_token = CancellationToken::new();
        let job = SweepJob::new(processor, config(), cancel_token.clone());

        let handle = tokio::spawn(job.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
