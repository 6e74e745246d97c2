//! Shared CLI utilities for chainlens binaries: log and metrics flags, tracing setup and the
//! common clap styling.

mod flags;
pub use flags::{LogArgs, MetricsArgs, MetricsInitError};

mod log;
pub use log::{FileLogConfig, LogConfig, LogRotation, StdoutLogConfig};

mod styles;
pub use styles::cli_styles;

mod tracing;
pub use tracing::LogFormat;
