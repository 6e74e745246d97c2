//! Background loops draining the backlog.
//!
//! Both loops hand keys to the same [`ResolutionProcessor`](crate::ResolutionProcessor):
//! - [`SweepJob`]: periodic, selects due entries oldest first.
//! - [`NotificationListener`]: reacts to new-work and escalation notifications.

mod listener;
pub use listener::NotificationListener;

mod sweep;
pub use sweep::{SweepJob, SweepSummary};
