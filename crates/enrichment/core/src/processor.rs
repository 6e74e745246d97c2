use crate::{Metrics, ProcessorError, Resolver};
use chainlens_enrichment_storage::EnrichmentStorage;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};
use tracing::{debug, info, trace, warn};

/// What caused an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The periodic sweep selected the entry.
    Sweep,
    /// The entry was just enqueued. Cooldown is ignored, the attempt ceiling is not.
    NewWork,
    /// A reader escalated the entry. Cooldown and the attempt ceiling are both ignored.
    Escalation,
}

impl Trigger {
    /// Label used in logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sweep => "sweep",
            Self::NewWork => "new_work",
            Self::Escalation => "escalation",
        }
    }

    const fn bypasses_ceiling(&self) -> bool {
        matches!(self, Self::Escalation)
    }
}

/// Why an attempt did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another task is already resolving the key.
    InFlight,
    /// The key is no longer in the backlog.
    NotPending,
    /// The entry reached the attempt ceiling.
    Exhausted,
}

/// Result of one [`ResolutionProcessor::process`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The record was stored and the backlog row removed.
    Resolved,
    /// The resolver failed; the failure was recorded on the row.
    Failed {
        /// Attempt count after this failure.
        attempts: u32,
        /// The recorded failure message.
        error: String,
    },
    /// Nothing was attempted.
    Skipped(SkipReason),
}

impl Outcome {
    /// Label used in metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Failed { .. } => "failed",
            Self::Skipped(_) => "skipped",
        }
    }
}

/// Attempts the resolution of single backlog entries.
///
/// Shared by the sweep and the notification listener. A key is attempted by at most one task at
/// a time; a concurrent request for the same key is skipped rather than queued.
#[derive(Debug)]
pub struct ResolutionProcessor<S, R> {
    store: Arc<S>,
    resolver: R,
    max_attempts: u32,
    in_flight: Mutex<HashSet<String>>,
}

impl<S, R> ResolutionProcessor<S, R>
where
    S: EnrichmentStorage,
    R: Resolver,
{
    /// Creates a processor writing outcomes to `store`.
    pub fn new(store: Arc<S>, resolver: R, max_attempts: u32) -> Self {
        Metrics::init_processor();
        Self { store, resolver, max_attempts, in_flight: Mutex::new(HashSet::new()) }
    }

    /// The store outcomes are written to.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Attempts `key` once.
    ///
    /// Resolver failures are recorded on the backlog row and reported as [`Outcome::Failed`];
    /// only storage failures are errors.
    pub async fn process(&self, key: &str, trigger: Trigger) -> Result<Outcome, ProcessorError> {
        let outcome = self.attempt(key, trigger).await?;
        metrics::counter!(
            Metrics::RESOLUTIONS_TOTAL,
            "trigger" => trigger.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        Ok(outcome)
    }

    async fn attempt(&self, key: &str, trigger: Trigger) -> Result<Outcome, ProcessorError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, key) else {
            trace!(target: "enrichment::processor", key, trigger = trigger.as_str(), "Already in flight");
            return Ok(Outcome::Skipped(SkipReason::InFlight));
        };

        let Some(entry) = self.store.get_pending(key)? else {
            trace!(target: "enrichment::processor", key, "Key no longer pending");
            return Ok(Outcome::Skipped(SkipReason::NotPending));
        };
        if !trigger.bypasses_ceiling() && entry.attempts >= self.max_attempts {
            debug!(
                target: "enrichment::processor",
                key,
                attempts = entry.attempts,
                "Entry exhausted, not retrying automatically"
            );
            return Ok(Outcome::Skipped(SkipReason::Exhausted));
        }

        let start = Instant::now();
        let result = self.resolver.resolve(key).await;
        metrics::histogram!(Metrics::RESOLUTION_DURATION_SECONDS, "trigger" => trigger.as_str())
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(record) => {
                self.store.complete_resolution(&record)?;
                info!(
                    target: "enrichment::processor",
                    key,
                    kind = %record.kind,
                    trigger = trigger.as_str(),
                    "Resolved key"
                );
                Ok(Outcome::Resolved)
            }
            Err(err) => {
                let error = err.to_string();
                match self.store.record_failure(key, &error)? {
                    Some(attempts) => {
                        warn!(
                            target: "enrichment::processor",
                            key,
                            attempts,
                            trigger = trigger.as_str(),
                            %err,
                            "Resolution failed"
                        );
                        Ok(Outcome::Failed { attempts, error })
                    }
                    None => Ok(Outcome::Skipped(SkipReason::NotPending)),
                }
            }
        }
    }
}

/// Marks a key as in flight until dropped.
#[derive(Debug)]
struct InFlightGuard<'a> {
    keys: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(keys: &'a Mutex<HashSet<String>>, key: &str) -> Option<Self> {
        lock(keys).insert(key.to_string()).then(|| Self { keys, key: key.to_string() })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.keys).remove(&self.key);
    }
}

fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    keys.lock().unwrap_or_else(PoisonError::into_inner)
}
