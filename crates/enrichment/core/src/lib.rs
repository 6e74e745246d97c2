//! Deferred-resolution enrichment pipeline.
//!
//! Normalization discovers references it cannot fill from chain payloads alone (IBC denom
//! traces, transaction call data, module parameters) and hands their keys to the [`JobQueue`].
//! The queue persists them in the backlog and announces them on the [`Notifier`]; two workers
//! drain the backlog through a shared [`ResolutionProcessor`]:
//!
//! - [`SweepJob`] retries due entries on a fixed interval, oldest first.
//! - [`NotificationListener`] attempts announced keys right away, escalations first.
//!
//! Failures are recorded on the backlog row and retried after a cooldown until an attempt
//! ceiling is reached. Exhausted rows stay visible for operators and can still be escalated.

mod config;
pub use config::QueueConfig;

mod error;
pub use error::{ProcessorError, QueueError, ResolveError};

mod metrics;
pub(crate) use metrics::Metrics;

mod notify;
pub use notify::{Notification, Notifier, Subscription};

mod processor;
pub use processor::{Outcome, ResolutionProcessor, SkipReason, Trigger};

mod queue;
pub use queue::{EscalationStatus, JobQueue};

pub mod resolver;
pub use resolver::{DenomTraceResolver, KeyRouter, ParamsResolver, Resolver, TxResolver};

pub mod rpc;

mod worker;
pub use worker::{NotificationListener, SweepJob, SweepSummary};
