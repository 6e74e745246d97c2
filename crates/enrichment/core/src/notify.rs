//! In-process notification bus between the job queue and the workers.
//!
//! Two broadcast channels: `new_work` carries keys freshly inserted into the backlog,
//! `escalate` carries keys a reader wants processed right away. Subscribers always drain
//! `escalate` first.

use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError};
use tracing::{trace, warn};

/// A notification delivered to a [`Subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A key was inserted into the backlog.
    NewWork(String),
    /// A pending key should be processed immediately.
    Escalate(String),
}

/// Publishing side of the bus. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    new_work: Sender<String>,
    escalate: Sender<String>,
}

impl Notifier {
    /// Creates a bus whose channels each buffer `capacity` keys per subscriber.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (new_work, _) = broadcast::channel(capacity);
        let (escalate, _) = broadcast::channel(capacity);
        Self { new_work, escalate }
    }

    /// Publishes `key` on the low-priority channel.
    pub fn notify_new_work(&self, key: &str) {
        if self.new_work.send(key.to_string()).is_err() {
            trace!(target: "enrichment::notify", key, "No listener for new work");
        }
    }

    /// Publishes `key` on the high-priority channel.
    pub fn notify_escalate(&self, key: &str) {
        if self.escalate.send(key.to_string()).is_err() {
            trace!(target: "enrichment::notify", key, "No listener for escalation");
        }
    }

    /// Subscribes to both channels. Only notifications sent after this call are received.
    pub fn subscribe(&self) -> Subscription {
        Subscription { new_work: self.new_work.subscribe(), escalate: self.escalate.subscribe() }
    }
}

/// Receiving side of the bus.
#[derive(Debug)]
pub struct Subscription {
    new_work: Receiver<String>,
    escalate: Receiver<String>,
}

impl Subscription {
    /// Waits for the next notification, preferring escalations.
    ///
    /// Returns `None` once the [`Notifier`] is gone. Notifications lost to lag are logged and
    /// skipped; the periodic sweep picks those keys up.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            tokio::select! {
                biased;
                received = self.escalate.recv() => match received {
                    Ok(key) => return Some(Notification::Escalate(key)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(target: "enrichment::notify", skipped, "Escalation receiver lagged");
                    }
                    Err(RecvError::Closed) => return None,
                },
                received = self.new_work.recv() => match received {
                    Ok(key) => return Some(Notification::NewWork(key)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(target: "enrichment::notify", skipped, "New work receiver lagged");
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    }
}
