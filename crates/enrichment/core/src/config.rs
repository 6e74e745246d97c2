//! Tuning knobs for the enrichment queue and its workers.

use std::time::Duration;

/// Configuration shared by the job queue, the sweep and the notification listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Failed attempts after which an entry is no longer retried automatically.
    pub max_attempts: u32,
    /// Minimum time between two automatic attempts of the same entry.
    pub retry_cooldown: Duration,
    /// Entries processed per sweep.
    pub batch_size: usize,
    /// Time between sweeps.
    pub poll_interval: Duration,
    /// Delay before reacting to a new-work notification, so the triggering write is visible.
    pub notify_delay: Duration,
    /// Buffer size of each notification channel.
    pub channel_capacity: usize,
    /// Attempts the notification listener runs at once. Further notifications wait for a slot.
    pub max_concurrent_attempts: usize,
}

impl QueueConfig {
    /// Default attempt ceiling.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    /// Default retry cooldown.
    pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(300);
    /// Default sweep batch.
    pub const DEFAULT_BATCH_SIZE: usize = 50;
    /// Default sweep interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
    /// Default new-work delay.
    pub const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_secs(1);
    /// Default notification buffer.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
    /// Default listener concurrency.
    pub const DEFAULT_MAX_CONCURRENT_ATTEMPTS: usize = 16;
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_cooldown: Self::DEFAULT_RETRY_COOLDOWN,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            notify_delay: Self::DEFAULT_NOTIFY_DELAY,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            max_concurrent_attempts: Self::DEFAULT_MAX_CONCURRENT_ATTEMPTS,
        }
    }
}
