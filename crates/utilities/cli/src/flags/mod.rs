//! Flags shared by chainlens binaries.

mod log;
pub use log::LogArgs;

mod metrics;
pub use metrics::{MetricsArgs, MetricsInitError};
