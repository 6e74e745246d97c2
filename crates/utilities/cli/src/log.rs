//! Resolved logging configuration.

use crate::{LogArgs, LogFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// How often file logs roll over.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum LogRotation {
    /// Every minute.
    Minutely,
    /// Every hour.
    Hourly,
    /// Every day.
    Daily,
    /// A single file.
    #[default]
    Never,
}

/// Stdout logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdoutLogConfig {
    /// Line format.
    pub format: LogFormat,
}

/// Rolling file logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogConfig {
    /// Directory the log files are written to.
    pub directory_path: PathBuf,
    /// Line format.
    pub format: LogFormat,
    /// Rollover period.
    pub rotation: LogRotation,
}

/// Logging configuration consumed by
/// [`init_tracing_subscriber`](LogConfig::init_tracing_subscriber).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Most verbose level emitted.
    pub global_level: LevelFilter,
    /// Stdout logs, if enabled.
    pub stdout_logs: Option<StdoutLogConfig>,
    /// File logs, if enabled.
    pub file_logs: Option<FileLogConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global_level: LevelFilter::INFO,
            stdout_logs: Some(StdoutLogConfig::default()),
            file_logs: None,
        }
    }
}

impl LogConfig {
    /// Builds the configuration from CLI flags.
    pub fn new(args: LogArgs) -> Self {
        let global_level = match args.verbosity {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        let stdout_logs =
            (!args.stdout_quiet).then_some(StdoutLogConfig { format: args.stdout_format });
        let file_logs = args.file_directory.map(|directory_path| FileLogConfig {
            directory_path,
            format: args.file_format,
            rotation: args.file_rotation,
        });
        Self { global_level, stdout_logs, file_logs }
    }
}
