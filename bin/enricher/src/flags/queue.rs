use chainlens_enrichment_core::QueueConfig;
use clap::Args;
use std::time::Duration;

/// Retry policy and worker cadence of the job queue.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct QueueArgs {
    /// Failed attempts after which an entry is left to operators.
    #[arg(
        long = "queue.max-attempts",
        default_value_t = QueueConfig::DEFAULT_MAX_ATTEMPTS,
        env = "CHAINLENS_QUEUE_MAX_ATTEMPTS"
    )]
    pub max_attempts: u32,

    /// Seconds to wait after a failure before the sweep retries an entry.
    #[arg(
        long = "queue.retry-cooldown",
        default_value_t = QueueConfig::DEFAULT_RETRY_COOLDOWN.as_secs(),
        env = "CHAINLENS_QUEUE_RETRY_COOLDOWN"
    )]
    pub retry_cooldown_secs: u64,

    /// Entries attempted per sweep.
    #[arg(
        long = "queue.batch-size",
        default_value_t = QueueConfig::DEFAULT_BATCH_SIZE,
        env = "CHAINLENS_QUEUE_BATCH_SIZE"
    )]
    pub batch_size: usize,

    /// Seconds between sweeps.
    #[arg(
        long = "queue.poll-interval",
        default_value_t = QueueConfig::DEFAULT_POLL_INTERVAL.as_secs(),
        env = "CHAINLENS_QUEUE_POLL_INTERVAL"
    )]
    pub poll_interval_secs: u64,

    /// Milliseconds between a new-work notification and its attempt.
    #[arg(
        long = "queue.notify-delay",
        default_value_t = QueueConfig::DEFAULT_NOTIFY_DELAY.as_millis() as u64,
        env = "CHAINLENS_QUEUE_NOTIFY_DELAY"
    )]
    pub notify_delay_ms: u64,

    /// Buffered notifications per channel before slow listeners lag.
    #[arg(
        long = "queue.channel-capacity",
        default_value_t = QueueConfig::DEFAULT_CHANNEL_CAPACITY,
        env = "CHAINLENS_QUEUE_CHANNEL_CAPACITY"
    )]
    pub channel_capacity: usize,

    /// Attempts the notification listener runs at once.
    #[arg(
        long = "queue.max-concurrent",
        default_value_t = QueueConfig::DEFAULT_MAX_CONCURRENT_ATTEMPTS,
        env = "CHAINLENS_QUEUE_MAX_CONCURRENT"
    )]
    pub max_concurrent_attempts: usize,
}

impl QueueArgs {
    /// The queue configuration these flags describe.
    pub const fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_attempts: self.max_attempts,
            retry_cooldown: Duration::from_secs(self.retry_cooldown_secs),
            batch_size: self.batch_size,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            notify_delay: Duration::from_millis(self.notify_delay_ms),
            channel_capacity: self.channel_capacity,
            max_concurrent_attempts: self.max_concurrent_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct MockCommand {
        #[clap(flatten)]
        queue: QueueArgs,
    }

    #[test]
    fn test_queue_defaults_match_config() {
        let args = MockCommand::parse_from(["test"]);
        assert_eq!(args.queue.queue_config(), QueueConfig::default());
    }

    #[test]
    fn test_queue_flags() {
        let args = MockCommand::parse_from([
            "test",
            "--queue.max-attempts",
            "3",
            "--queue.retry-cooldown",
            "60",
            "--queue.notify-delay",
            "250",
            "--queue.max-concurrent",
            "4",
        ]);
        let config = args.queue.queue_config();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_cooldown, Duration::from_secs(60));
        assert_eq!(config.notify_delay, Duration::from_millis(250));
        assert_eq!(config.max_concurrent_attempts, 4);
        assert_eq!(config.batch_size, QueueConfig::DEFAULT_BATCH_SIZE);
    }
}
