use crate::{Notifier, QueueError};
use chainlens_enrichment_storage::{EnrichmentStorage, InsertOutcome, PendingResolution};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of [`JobQueue::escalate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    /// The key is pending; workers were told to process it now.
    Requested,
    /// The key already has a resolved record.
    AlreadyResolved,
    /// The key is neither pending nor resolved.
    NotFound,
}

/// Entry point for collaborators of the enrichment backlog.
///
/// Normalization calls [`enqueue`](Self::enqueue) and [`resolved`](Self::resolved); the read path
/// calls [`escalate`](Self::escalate). None of these wait for a resolution.
#[derive(Debug)]
pub struct JobQueue<S> {
    store: Arc<S>,
    notifier: Notifier,
}

impl<S> Clone for JobQueue<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), notifier: self.notifier.clone() }
    }
}

impl<S> JobQueue<S>
where
    S: EnrichmentStorage,
{
    /// Creates a queue over `store` publishing on `notifier`.
    pub const fn new(store: Arc<S>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// The notifier workers subscribe to.
    pub const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Adds `key` to the backlog unless it is already pending or resolved.
    ///
    /// A new-work notification is published only when a row was inserted.
    pub fn enqueue(&self, key: &str) -> Result<InsertOutcome, QueueError> {
        let key = checked(key)?;
        let outcome = self.store.insert_pending(key)?;
        if outcome.is_inserted() {
            debug!(target: "enrichment::queue", key, "Enqueued key");
            self.notifier.notify_new_work(key);
        }
        Ok(outcome)
    }

    /// Whether `key` already has a resolved record.
    pub fn resolved(&self, key: &str) -> Result<bool, QueueError> {
        Ok(self.store.is_resolved(checked(key)?)?)
    }

    /// The backlog row for `key`, if pending.
    pub fn pending(&self, key: &str) -> Result<Option<PendingResolution>, QueueError> {
        Ok(self.store.get_pending(checked(key)?)?)
    }

    /// Asks the workers to process a pending `key` immediately.
    ///
    /// The backlog row is not touched. Absent and resolved keys are reported, not errors.
    pub fn escalate(&self, key: &str) -> Result<EscalationStatus, QueueError> {
        let key = checked(key)?;
        if self.store.get_pending(key)?.is_some() {
            info!(target: "enrichment::queue", key, "Escalation requested");
            self.notifier.notify_escalate(key);
            return Ok(EscalationStatus::Requested);
        }

        if self.store.is_resolved(key)? {
            Ok(EscalationStatus::AlreadyResolved)
        } else {
            Ok(EscalationStatus::NotFound)
        }
    }
}

fn checked(key: &str) -> Result<&str, QueueError> {
    let key = key.trim();
    if key.is_empty() { Err(QueueError::EmptyKey) } else { Ok(key) }
}
