use crate::{Notification, ResolutionProcessor, Resolver, Subscription, Trigger};
use chainlens_enrichment_storage::EnrichmentStorage;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Attempts keys as soon as they are announced on the notification bus.
///
/// Escalations run immediately; new work runs after `notify_delay`. Each notification gets its
/// own task so a slow node does not hold up escalations behind it. At most
/// `max_concurrent_attempts` tasks exist at once; once they are all busy the listener stops
/// reading the bus until one finishes. Tasks still running at cancellation are allowed to finish.
#[derive(Debug)]
pub struct NotificationListener<S, R> {
    processor: Arc<ResolutionProcessor<S, R>>,
    subscription: Subscription,
    notify_delay: Duration,
    permits: Arc<Semaphore>,
    cancel_token: CancellationToken,
}

impl<S, R> NotificationListener<S, R>
where
    S: EnrichmentStorage + 'static,
    R: Resolver + 'static,
{
    /// Creates a listener draining `subscription`. A zero `max_concurrent_attempts` is treated
    /// as one.
    pub fn new(
        processor: Arc<ResolutionProcessor<S, R>>,
        subscription: Subscription,
        notify_delay: Duration,
        max_concurrent_attempts: usize,
        cancel_token: CancellationToken,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(max_concurrent_attempts.max(1)));
        Self { processor, subscription, notify_delay, permits, cancel_token }
    }

    /// Listens until cancelled or until the bus closes, then waits for spawned attempts.
    pub async fn run(mut self) {
        info!(
            target: "enrichment::listener",
            delay = ?self.notify_delay,
            max_concurrent = self.permits.available_permits(),
            "Starting notification listener"
        );
        let mut tasks = JoinSet::new();

        loop {
            // Wait for a free slot before reading, so a burst stays buffered on the bus.
            let permit = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!(target: "enrichment::listener", "Notification listener cancelled");
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join(joined);
                    continue;
                }
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!(target: "enrichment::listener", "Notification listener cancelled");
                    break;
                }
                notification = self.subscription.recv() => match notification {
                    Some(notification) => self.dispatch(&mut tasks, notification, permit),
                    None => {
                        warn!(target: "enrichment::listener", "Notification bus closed");
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_join(joined),
            }
        }

        if !tasks.is_empty() {
            info!(target: "enrichment::listener", remaining = tasks.len(), "Waiting for in-flight attempts");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
    }

    fn dispatch(
        &self,
        tasks: &mut JoinSet<()>,
        notification: Notification,
        permit: OwnedSemaphorePermit,
    ) {
        let (key, trigger, delay) = match notification {
            Notification::Escalate(key) => (key, Trigger::Escalation, Duration::ZERO),
            Notification::NewWork(key) => (key, Trigger::NewWork, self.notify_delay),
        };
        debug!(target: "enrichment::listener", key, trigger = trigger.as_str(), "Dispatching");

        let processor = self.processor.clone();
        tasks.spawn(async move {
            let _permit = permit;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match processor.process(&key, trigger).await {
                Ok(outcome) => {
                    debug!(target: "enrichment::listener", key, ?outcome, "Attempt finished");
                }
                Err(err) => {
                    error!(target: "enrichment::listener", key, %err, "Attempt failed to persist");
                }
            }
        });
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        error!(target: "enrichment::listener", %err, "Attempt task panicked");
    }
}
